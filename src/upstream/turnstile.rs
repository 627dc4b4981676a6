//! Challenge token validation against the provider's siteverify endpoint.

use serde::Deserialize;

use crate::config::VerificationConfig;
use crate::upstream::client::FetchClient;
use crate::upstream::error::{FetchError, FetchResult};

/// Siteverify response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteverifyResponse {
    pub success: bool,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Outcome of validating one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    Accepted,
    Rejected { error_codes: Vec<String> },
}

/// Validates challenge tokens submitted by browsers.
#[derive(Debug, Clone)]
pub struct TurnstileVerifier {
    fetch: FetchClient,
    siteverify_url: String,
    secret_key: String,
}

impl TurnstileVerifier {
    pub fn new(fetch: FetchClient, config: &VerificationConfig) -> Self {
        Self {
            fetch,
            siteverify_url: config.siteverify_url.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Ask the provider whether `token` is a solved challenge.
    ///
    /// `remote_ip` is forwarded when known.
    pub async fn verify(&self, token: &str, remote_ip: Option<&str>) -> FetchResult<TokenVerdict> {
        if self.secret_key.is_empty() {
            return Err(FetchError::Internal("verification secret key is not configured".to_string()));
        }

        let mut pairs = vec![("secret", self.secret_key.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            pairs.push(("remoteip", ip));
        }

        let body: SiteverifyResponse = self.fetch.post_form(&self.siteverify_url, &pairs).await?;
        if body.success {
            tracing::debug!(hostname = ?body.hostname, "Challenge token accepted");
            Ok(TokenVerdict::Accepted)
        } else {
            tracing::info!(error_codes = ?body.error_codes, "Challenge token rejected");
            Ok(TokenVerdict::Rejected {
                error_codes: body.error_codes,
            })
        }
    }
}
