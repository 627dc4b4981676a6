//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, delays ordered)
//! - Check gate paths are absolute and deny patterns compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use regex::RegexBuilder;

use crate::config::schema::{EdgeConfig, GateConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a full configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must not be smaller than retries.base_delay_ms",
        ));
    }

    if config.timeouts.upstream_secs == 0 || config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts", "timeouts must be greater than zero"));
    }

    if config.dedup.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("dedup.sweep_interval_secs", "must be greater than zero"));
    }

    if config.verification.cookie_max_age_secs == 0 {
        errors.push(ValidationError::new(
            "verification.cookie_max_age_secs",
            "must be greater than zero",
        ));
    }

    for (field, value) in [
        ("upstream.rest_base_url", &config.upstream.rest_base_url),
        ("upstream.graphql_url", &config.upstream.graphql_url),
        ("verification.siteverify_url", &config.verification.siteverify_url),
    ] {
        if url::Url::parse(value).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not an absolute URL", value)));
        }
    }

    errors.extend(validate_gate(&config.gate));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the gate section. Used on hot reload as well.
pub fn validate_gate(gate: &GateConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if gate.cookie_name.is_empty() || gate.cookie_name.contains([';', '=', ' ']) {
        errors.push(ValidationError::new("gate.cookie_name", "must be a valid cookie name"));
    }

    let paths = [
        ("gate.verify_path", &gate.verify_path),
        ("gate.verify_api_path", &gate.verify_api_path),
        ("gate.favicon_path", &gate.favicon_path),
        ("gate.asset_prefix", &gate.asset_prefix),
        ("gate.api_prefix", &gate.api_prefix),
    ];
    for (field, value) in paths {
        if !value.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }

    for prefix in &gate.protected_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(
                "gate.protected_prefixes",
                format!("'{}' must start with '/'", prefix),
            ));
        }
        if gate.verify_path.starts_with(prefix.as_str()) {
            errors.push(ValidationError::new(
                "gate.protected_prefixes",
                format!("'{}' would gate the verification page itself", prefix),
            ));
        }
    }

    for pattern in &gate.extra_deny_patterns {
        if let Err(e) = RegexBuilder::new(pattern).case_insensitive(true).build() {
            errors.push(ValidationError::new(
                "gate.extra_deny_patterns",
                format!("invalid pattern '{}': {}", pattern, e),
            ));
        }
    }

    errors
}
