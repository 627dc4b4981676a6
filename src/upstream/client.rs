//! Resilient HTTP client for upstream calls.
//!
//! # Responsibilities
//! - Validate the target URL before any I/O
//! - Retry network errors, 429 and 5xx with exponential backoff
//! - Hand the final response back to the caller, success or not
//! - Offer JSON helpers that turn non-2xx into typed errors

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time;
use url::Url;

use crate::config::{RetryConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::resilience::{is_retryable, RetryPolicy};
use crate::upstream::error::{FetchError, FetchResult};

/// Method, headers and body of an outbound request.
///
/// The body is kept as bytes so every attempt can resend it.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// POST with a JSON body.
    pub fn json<B: Serialize>(body: &B) -> FetchResult<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| FetchError::InvalidInput(format!("unserializable body: {}", e)))?;
        let mut options = Self {
            method: Method::POST,
            body: Some(bytes),
            ..Self::default()
        };
        options
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(options)
    }

    /// POST with an `application/x-www-form-urlencoded` body.
    pub fn form(pairs: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        let mut options = Self {
            method: Method::POST,
            body: Some(encoded.into_bytes()),
            ..Self::default()
        };
        options.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        options
    }

    /// Add a header, ignoring values that are not valid header text.
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(HeaderName::from_static(name), v);
            }
            Err(_) => tracing::warn!(header = name, "Dropping invalid header value"),
        }
        self
    }
}

/// Outbound HTTP client with retry and backoff.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl FetchClient {
    /// Build a client from configuration.
    pub fn new(retries: &RetryConfig, timeouts: &TimeoutConfig, user_agent: &str) -> FetchResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(http, RetryPolicy::from(retries)))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// Issue a request, retrying transient failures.
    ///
    /// Returns the last response once attempts are exhausted; callers must
    /// check the status. Only a network failure on the final attempt is an
    /// `Err`.
    pub async fn fetch_with_retry(&self, url: &str, options: RequestOptions) -> FetchResult<Response> {
        let target = parse_absolute_url(url)?;
        let max_attempts = self.policy.max_attempts.max(1);
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self
                .http
                .request(options.method.clone(), target.clone())
                .headers(options.headers.clone());
            if let Some(body) = &options.body {
                request = request.body(body.clone());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if attempt < max_attempts && is_retryable(Some(status)) {
                        let delay = self.policy.delay_after(attempt);
                        metrics::record_upstream_attempt("retryable_status");
                        metrics::record_upstream_retry();
                        tracing::info!(url = %target, attempt, delay = ?delay, status = %status, "Retrying upstream request");
                        time::sleep(delay).await;
                        continue;
                    }

                    metrics::record_upstream_attempt(if status.is_success() { "success" } else { "failure" });
                    tracing::debug!(
                        url = %target,
                        status = %status,
                        attempts = attempt,
                        elapsed = ?started.elapsed(),
                        "Upstream request finished"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    metrics::record_upstream_attempt("network_error");
                    tracing::warn!(url = %target, attempt, error = %e, "Upstream request failed");

                    if attempt < max_attempts && is_retryable(None) {
                        let delay = self.policy.delay_after(attempt);
                        metrics::record_upstream_retry();
                        tracing::info!(url = %target, attempt, delay = ?delay, "Retrying after network error");
                        time::sleep(delay).await;
                        continue;
                    }

                    return Err(e.into());
                }
            }
        }
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> FetchResult<T> {
        let response = self.fetch_with_retry(url, RequestOptions::get()).await?;
        decode_json(ensure_success(response).await?).await
    }

    /// POST `body` as JSON to `url` and decode a JSON body.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> FetchResult<T> {
        let response = self.fetch_with_retry(url, RequestOptions::json(body)?).await?;
        decode_json(ensure_success(response).await?).await
    }

    /// POST a form to `url` and decode a JSON body.
    pub async fn post_form<T: DeserializeOwned>(&self, url: &str, pairs: &[(&str, &str)]) -> FetchResult<T> {
        let response = self.fetch_with_retry(url, RequestOptions::form(pairs)).await?;
        decode_json(ensure_success(response).await?).await
    }
}

/// Accept only absolute http(s) URLs.
pub fn parse_absolute_url(url: &str) -> FetchResult<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        scheme => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

/// Turn a non-2xx response into `FetchError::Status`.
pub async fn ensure_success(response: Response) -> FetchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = if text.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        text.chars().take(512).collect()
    };

    Err(FetchError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> FetchResult<T> {
    response
        .json::<T>()
        .await
        .map_err(FetchError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_url() {
        assert!(parse_absolute_url("https://pokeapi.co/api/v2/pokemon/25").is_ok());
        assert!(parse_absolute_url("http://127.0.0.1:8080/").is_ok());

        assert!(matches!(
            parse_absolute_url("/api/v2/pokemon/25"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_absolute_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(parse_absolute_url("mailto:ash@example.com"), Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_io() {
        let client = FetchClient::with_client(reqwest::Client::new(), RetryPolicy::default());
        let err = client
            .fetch_with_retry("pokemon/25", RequestOptions::get())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_form_options() {
        let options = RequestOptions::form(&[("secret", "s3cr3t"), ("response", "a b&c")]);
        assert_eq!(options.method, Method::POST);
        assert_eq!(
            options.body.as_deref(),
            Some("secret=s3cr3t&response=a+b%26c".as_bytes())
        );
        assert_eq!(
            options.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_json_options_and_header() {
        let options = RequestOptions::json(&serde_json::json!({"id": 25}))
            .unwrap()
            .header("x-request-id", "abc");
        assert_eq!(options.body.as_deref(), Some(br#"{"id":25}"#.as_slice()));
        assert_eq!(options.headers.get("x-request-id").unwrap(), "abc");
    }
}
