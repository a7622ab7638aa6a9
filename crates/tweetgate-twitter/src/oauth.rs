//! OAuth 1.0a HMAC-SHA1 request signing.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use sha1::Sha1;

use crate::credentials::Credential;
use crate::error::{TwitterError, TwitterResult};

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

/// Signs requests on behalf of a single credential.
pub struct OAuthSigner<'a> {
    credential: &'a Credential,
}

impl<'a> OAuthSigner<'a> {
    pub fn new(credential: &'a Credential) -> Self {
        Self { credential }
    }

    /// Builds the `Authorization` header for `method url` with the given
    /// query/form parameters, using a fresh nonce and the current time.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> TwitterResult<String> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|error| TwitterError::OAuth(format!("system clock error: {error}")))?
            .as_secs();
        self.authorization_header_at(method, url, params, &generate_nonce(), timestamp)
    }

    pub(crate) fn authorization_header_at(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: u64,
    ) -> TwitterResult<String> {
        let mut oauth_params = vec![
            (
                "oauth_consumer_key".to_string(),
                self.credential.consumer_key.clone(),
            ),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            (
                "oauth_token".to_string(),
                self.credential.access_token.clone(),
            ),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        let signature = self.signature(method, url, params, &oauth_params)?;
        oauth_params.push(("oauth_signature".to_string(), signature));

        let rendered = oauth_params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {rendered}"))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        oauth_params: &[(String, String)],
    ) -> TwitterResult<String> {
        let mut encoded = params
            .iter()
            .chain(oauth_params.iter())
            .map(|(key, value)| (encode(key), encode(value)))
            .collect::<Vec<_>>();
        encoded.sort();
        let parameter_string = encoded
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&parameter_string)
        );
        let signing_key = format!(
            "{}&{}",
            encode(&self.credential.consumer_secret),
            encode(&self.credential.access_token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .map_err(|error| TwitterError::OAuth(error.to_string()))?;
        mac.update(base_string.as_bytes());
        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }
}

pub(crate) fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, OAUTH_ENCODE_SET).to_string()
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
