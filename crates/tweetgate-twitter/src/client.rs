//! REST client for the account-scoped v1.1 endpoints tweetgate calls.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::TwitterConfig;
use crate::credentials::Credential;
use crate::error::{TwitterError, TwitterResult};
use crate::oauth::{encode, OAuthSigner};
use crate::types::{ApiErrorBody, StreamTweet, TwitterUser};

/// Stateless REST client; every call is signed with the credential passed in.
#[derive(Debug, Clone)]
pub struct TwitterRestClient {
    http: Client,
    stream_http: Client,
    config: TwitterConfig,
}

impl TwitterRestClient {
    pub fn new(config: TwitterConfig) -> TwitterResult<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        let stream_http = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            stream_http,
            config,
        })
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    pub(crate) fn stream_http(&self) -> &Client {
        &self.stream_http
    }

    pub async fn verify_credentials(&self, credential: &Credential) -> TwitterResult<TwitterUser> {
        let params = vec![
            ("include_entities".to_string(), "false".to_string()),
            ("skip_status".to_string(), "true".to_string()),
        ];
        self.signed_json(
            Method::GET,
            &self.config.api_url("/1.1/account/verify_credentials.json"),
            credential,
            &params,
        )
        .await
    }

    pub async fn mentions_timeline(
        &self,
        credential: &Credential,
        count: u32,
    ) -> TwitterResult<Vec<StreamTweet>> {
        let params = vec![("count".to_string(), count.max(1).to_string())];
        let raw: Vec<Value> = self
            .signed_json(
                Method::GET,
                &self.config.api_url("/1.1/statuses/mentions_timeline.json"),
                credential,
                &params,
            )
            .await?;
        // Skip entries we cannot interpret rather than failing the whole page.
        Ok(raw
            .into_iter()
            .filter_map(|value| serde_json::from_value::<StreamTweet>(value).ok())
            .collect())
    }

    pub async fn retweet(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        let url = self
            .config
            .api_url(&format!("/1.1/statuses/retweet/{}.json", encode(tweet_id)));
        let _: Value = self
            .signed_json(Method::POST, &url, credential, &[])
            .await?;
        Ok(())
    }

    pub async fn favorite(&self, credential: &Credential, tweet_id: &str) -> TwitterResult<()> {
        let params = vec![("id".to_string(), tweet_id.to_string())];
        let _: Value = self
            .signed_json(
                Method::POST,
                &self.config.api_url("/1.1/favorites/create.json"),
                credential,
                &params,
            )
            .await?;
        Ok(())
    }

    /// Sends a signed request. GET parameters travel in the query string,
    /// POST parameters as a form body; both are part of the signature.
    pub(crate) async fn send_signed(
        &self,
        http: &Client,
        method: Method,
        url: &str,
        credential: &Credential,
        params: &[(String, String)],
    ) -> TwitterResult<Response> {
        let authorization =
            OAuthSigner::new(credential).authorization_header(method.as_str(), url, params)?;
        debug!(method = %method, url, "sending signed twitter request");

        let request = if method == Method::GET {
            http.get(url).query(params)
        } else {
            http.request(method, url).form(params)
        };
        let response = request
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn signed_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        credential: &Credential,
        params: &[(String, String)],
    ) -> TwitterResult<T> {
        let response = self
            .send_signed(&self.http, method, url, credential, params)
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Converts a non-success response into `TwitterError::Api`.
pub(crate) async fn ensure_success(response: Response) -> TwitterResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error_from_body(status.as_u16(), &body))
}

fn api_error_from_body(status: u16, body: &str) -> TwitterError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let first = parsed
        .as_ref()
        .and_then(|parsed| parsed.errors.first().cloned());
    let code = first.as_ref().and_then(|entry| entry.code);
    let message = first
        .and_then(|entry| entry.message)
        .or_else(|| parsed.and_then(|parsed| parsed.error))
        .unwrap_or_else(|| body.trim().to_string());
    TwitterError::Api {
        status,
        code,
        message,
    }
}
