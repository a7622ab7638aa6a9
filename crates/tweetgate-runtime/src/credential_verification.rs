use tracing::{info, warn};
use tweetgate_twitter::{Credential, TwitterPlatform, VerifiedCredential};

/// Verifies `credentials` one after another, keeping configuration order.
/// Credentials the platform rejects are dropped with a warning.
pub async fn verify_service_credentials(
    platform: &dyn TwitterPlatform,
    service: &str,
    credentials: &[Credential],
) -> Vec<VerifiedCredential> {
    let mut verified = Vec::with_capacity(credentials.len());
    for (index, credential) in credentials.iter().enumerate() {
        if credential.has_blank_field() {
            warn!(service, index, "credential has blank fields; skipping");
            continue;
        }
        match platform.verify_credentials(credential).await {
            Ok(user) => {
                info!(service, index, screen_name = %user.screen_name, "credential verified");
                verified.push(VerifiedCredential::new(credential.clone(), user.screen_name));
            }
            Err(error) => {
                warn!(service, index, error = %error, "credential verification failed; dropping");
            }
        }
    }
    verified
}
