use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tweetgate_runtime::{ReactionSpec, ServiceDefinition, ValidatorSpec};
use tweetgate_twitter::Credential;

pub(crate) const SERVICE_CONFIG_SCHEMA_VERSION: u32 = 1;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServiceConfigFile {
    pub(crate) schema_version: u32,
    #[serde(default)]
    pub(crate) services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServiceConfig {
    pub(crate) name: String,
    #[serde(default = "default_enabled")]
    pub(crate) enabled: bool,
    pub(crate) keywords: String,
    #[serde(default)]
    pub(crate) language: String,
    #[serde(default)]
    pub(crate) validator: ValidatorSpec,
    #[serde(default)]
    pub(crate) reaction: ReactionSpec,
    #[serde(default)]
    pub(crate) accounts: Vec<Credential>,
}

impl ServiceConfig {
    pub(crate) fn to_definition(&self) -> ServiceDefinition {
        ServiceDefinition {
            name: self.name.clone(),
            keywords: self.keywords.clone(),
            language: self.language.clone(),
            validator: self.validator.build(),
            reaction: self.reaction.build(),
            credentials: self.accounts.clone(),
        }
    }
}

impl ServiceConfigFile {
    /// Definitions for every enabled service, in file order.
    pub(crate) fn enabled_definitions(&self) -> Vec<ServiceDefinition> {
        self.services
            .iter()
            .filter(|service| service.enabled)
            .map(ServiceConfig::to_definition)
            .collect()
    }
}

pub(crate) fn load_service_config(path: &Path) -> Result<ServiceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read service config {}", path.display()))?;
    parse_service_config(&raw)
        .with_context(|| format!("invalid service config {}", path.display()))
}

pub(crate) fn parse_service_config(raw: &str) -> Result<ServiceConfigFile> {
    let config = serde_json::from_str::<ServiceConfigFile>(raw)
        .context("failed to parse service config json")?;
    validate_service_config(&config)?;
    Ok(config)
}

fn validate_service_config(config: &ServiceConfigFile) -> Result<()> {
    if config.schema_version != SERVICE_CONFIG_SCHEMA_VERSION {
        bail!(
            "unsupported service config schema: expected {}, found {}",
            SERVICE_CONFIG_SCHEMA_VERSION,
            config.schema_version
        );
    }
    if config.services.is_empty() {
        bail!("service config must define at least one service");
    }

    let mut names = HashSet::new();
    for service in &config.services {
        let name = service.name.trim();
        if name.is_empty() {
            bail!("service name cannot be empty");
        }
        if !names.insert(name.to_string()) {
            bail!("duplicate service name '{name}'");
        }
        if service.keywords.trim().is_empty() {
            bail!("service '{name}' must define keywords");
        }
        if service.accounts.is_empty() {
            bail!("service '{name}' must define at least one account");
        }
        if let ValidatorSpec::TextContains { needles } = &service.validator {
            if needles.iter().all(|needle| needle.trim().is_empty()) {
                bail!("service '{name}' text_contains validator needs at least one needle");
            }
        }
    }
    Ok(())
}
