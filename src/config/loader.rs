//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variable consulted when `verification.secret_key` is empty.
pub const SECRET_KEY_ENV: &str = "TURNSTILE_SECRET_KEY";

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EdgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<EdgeConfig, ConfigError> {
    let mut config: EdgeConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Fill secrets that are not present in the file from the environment.
pub fn apply_env_overrides(config: &mut EdgeConfig) {
    if config.verification.secret_key.is_empty() {
        if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
            config.verification.secret_key = secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("[listener]\nbind_address = \"127.0.0.1:3000\"\n").unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.gate.cookie_name, "turnstile_verified");
        assert_eq!(config.dedup.stale_after_secs, 30);
    }

    #[test]
    fn test_gate_section() {
        let config = parse_config(
            r#"
            [gate]
            protected_prefixes = ["/pokemon/", "/moves/"]
            extra_deny_patterns = ["^/wp-(admin|login)"]
            "#,
        )
        .unwrap();
        assert_eq!(config.gate.protected_prefixes.len(), 2);
        assert_eq!(config.gate.extra_deny_patterns[0], "^/wp-(admin|login)");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[retries]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("retries.max_attempts"));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[retries\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
