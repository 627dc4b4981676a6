//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry policy for upstream calls.
    pub retries: RetryConfig,

    /// In-flight request deduplication.
    pub dedup: DedupConfig,

    /// Edge gatekeeper rules.
    pub gate: GateConfig,

    /// Human-verification challenge settings.
    pub verification: VerificationConfig,

    /// Upstream API endpoints.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Timeout for a single upstream attempt in seconds.
    pub upstream_secs: u64,

    /// Total time allowed for an incoming request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 10,
            request_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
            jitter: false,
        }
    }
}

/// In-flight deduplication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Pending entries older than this are purged by the sweeper.
    pub stale_after_secs: u64,

    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 30,
            sweep_interval_secs: 300,
        }
    }
}

/// Gatekeeper configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Enforce verification on protected prefixes. The deny-list applies
    /// regardless of this flag.
    pub enabled: bool,

    /// Name of the verification cookie.
    pub cookie_name: String,

    /// Path of the verification page.
    pub verify_path: String,

    /// Path of the verification submission endpoint.
    pub verify_api_path: String,

    /// Favicon path, never gated.
    pub favicon_path: String,

    /// Prefix of framework/static assets, never gated.
    pub asset_prefix: String,

    /// Prefix of API routes, never gated.
    pub api_prefix: String,

    /// Prefixes that require a verified client.
    pub protected_prefixes: Vec<String>,

    /// Additional case-insensitive regular expressions to reject.
    pub extra_deny_patterns: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie_name: "turnstile_verified".to_string(),
            verify_path: "/verify".to_string(),
            verify_api_path: "/api/verify-turnstile".to_string(),
            favicon_path: "/favicon.ico".to_string(),
            asset_prefix: "/_next/".to_string(),
            api_prefix: "/api/".to_string(),
            protected_prefixes: vec!["/pokemon/".to_string()],
            extra_deny_patterns: Vec::new(),
        }
    }
}

/// Human-verification challenge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Public site key embedded in the verification page.
    pub site_key: String,

    /// Secret key sent to the siteverify endpoint.
    /// Falls back to `TURNSTILE_SECRET_KEY` when empty.
    pub secret_key: String,

    /// Challenge provider validation endpoint.
    pub siteverify_url: String,

    /// Cookie lifetime in seconds.
    pub cookie_max_age_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            site_key: String::new(),
            secret_key: String::new(),
            siteverify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify"
                .to_string(),
            cookie_max_age_secs: 86_400,
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// REST base URL.
    pub rest_base_url: String,

    /// GraphQL endpoint.
    pub graphql_url: String,

    /// User-Agent sent upstream.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://pokeapi.co/api/v2".to_string(),
            graphql_url: "https://beta.pokeapi.co/graphql/v1beta".to_string(),
            user_agent: concat!("pokedex-edge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
