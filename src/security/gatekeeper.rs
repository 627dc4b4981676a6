//! Edge gatekeeper.
//!
//! # State Machine (per request)
//! ```text
//! path matches deny-list            → REJECTED (404)
//! path is excluded                  → ALLOWED
//! path under protected prefix:
//!     cookie == "true"              → ALLOWED
//!     otherwise                     → REDIRECT_TO_VERIFY (?redirect=<path>)
//! anything else                     → ALLOWED
//! ```
//!
//! # Design Decisions
//! - Deny-list is evaluated first and is never overridden
//! - API routes other than the verification endpoint are never gated,
//!   only pages are
//! - Pure function of path and cookies: no I/O, no shared state

use serde::Serialize;

use crate::config::GateConfig;
use crate::security::deny_list::DenyList;
use crate::security::verification::is_verified;

/// Why a request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Excluded,
    Verified,
    Unprotected,
    GateDisabled,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Respond 404 immediately.
    Reject,
    /// Send the client to the verification page.
    RedirectToVerify { location: String },
    /// Continue to the application.
    Allow(AllowReason),
}

impl GateDecision {
    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            GateDecision::Reject => "rejected",
            GateDecision::RedirectToVerify { .. } => "redirect_to_verify",
            GateDecision::Allow(AllowReason::Excluded) => "allowed_excluded",
            GateDecision::Allow(AllowReason::Verified) => "allowed_verified",
            GateDecision::Allow(AllowReason::Unprotected) => "allowed_unprotected",
            GateDecision::Allow(AllowReason::GateDisabled) => "allowed_gate_disabled",
        }
    }
}

/// Compiled gate rules.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    config: GateConfig,
    deny_list: DenyList,
}

/// Read-only view of the active rules.
#[derive(Debug, Clone, Serialize)]
pub struct GateSnapshot {
    pub config: GateConfig,
    pub deny_patterns: Vec<String>,
}

impl Default for Gatekeeper {
    fn default() -> Self {
        Self {
            config: GateConfig::default(),
            deny_list: DenyList::default(),
        }
    }
}

impl Gatekeeper {
    /// Compile the gate from configuration.
    pub fn from_config(config: GateConfig) -> Result<Self, regex::Error> {
        let deny_list = DenyList::with_extra(&config.extra_deny_patterns)?;
        Ok(Self { config, deny_list })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            config: self.config.clone(),
            deny_patterns: self.deny_list.describe(),
        }
    }

    /// Decide what happens to a request for `path` carrying `cookie_headers`.
    pub fn evaluate<'a>(
        &self,
        path: &str,
        cookie_headers: impl IntoIterator<Item = &'a str>,
    ) -> GateDecision {
        if let Some(pattern) = self.deny_list.find_match(path) {
            tracing::debug!(path = %path, pattern = ?pattern, "Path matched deny-list");
            return GateDecision::Reject;
        }

        if !self.config.enabled {
            return GateDecision::Allow(AllowReason::GateDisabled);
        }

        if self.is_excluded(path) {
            return GateDecision::Allow(AllowReason::Excluded);
        }

        if self.is_protected(path) {
            if is_verified(cookie_headers, &self.config.cookie_name) {
                return GateDecision::Allow(AllowReason::Verified);
            }
            return GateDecision::RedirectToVerify {
                location: self.verify_location(path),
            };
        }

        GateDecision::Allow(AllowReason::Unprotected)
    }

    fn is_excluded(&self, path: &str) -> bool {
        let c = &self.config;
        path == c.verify_path
            || path == c.verify_api_path
            || path == c.favicon_path
            || path.starts_with(&c.asset_prefix)
            || (path.starts_with(&c.api_prefix) && path != c.verify_api_path)
    }

    fn is_protected(&self, path: &str) -> bool {
        self.config
            .protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// `/verify?redirect=<url-encoded path>`.
    pub fn verify_location(&self, path: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", path)
            .finish();
        format!("{}?{}", self.config.verify_path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_COOKIES: [&str; 0] = [];

    #[test]
    fn test_deny_list_wins_over_everything() {
        let gate = Gatekeeper::default();
        assert_eq!(gate.evaluate("/.env", NO_COOKIES), GateDecision::Reject);
        assert_eq!(gate.evaluate("/.env", ["turnstile_verified=true"]), GateDecision::Reject);
        // Excluded prefixes do not shield blocked paths.
        assert_eq!(gate.evaluate("/_next/.git/config", NO_COOKIES), GateDecision::Reject);
        assert_eq!(gate.evaluate("/api/dump.sql", NO_COOKIES), GateDecision::Reject);
        assert_eq!(gate.evaluate("/pokemon/.env", ["turnstile_verified=true"]), GateDecision::Reject);
    }

    #[test]
    fn test_protected_path_without_cookie_redirects() {
        let gate = Gatekeeper::default();
        assert_eq!(
            gate.evaluate("/pokemon/25", NO_COOKIES),
            GateDecision::RedirectToVerify {
                location: "/verify?redirect=%2Fpokemon%2F25".to_string()
            }
        );
        assert!(matches!(
            gate.evaluate("/pokemon/25", ["turnstile_verified=false"]),
            GateDecision::RedirectToVerify { .. }
        ));
    }

    #[test]
    fn test_protected_path_with_cookie_allowed() {
        let gate = Gatekeeper::default();
        assert_eq!(
            gate.evaluate("/pokemon/25", ["turnstile_verified=true"]),
            GateDecision::Allow(AllowReason::Verified)
        );
        assert_eq!(
            gate.evaluate("/pokemon/25", ["theme=dark; turnstile_verified=true"]),
            GateDecision::Allow(AllowReason::Verified)
        );
    }

    #[test]
    fn test_exclusions() {
        let gate = Gatekeeper::default();
        for path in [
            "/verify",
            "/api/verify-turnstile",
            "/favicon.ico",
            "/_next/static/chunks/app.js",
            "/api/pokemon/25",
            "/api/graphql",
        ] {
            assert_eq!(
                gate.evaluate(path, NO_COOKIES),
                GateDecision::Allow(AllowReason::Excluded),
                "{}",
                path
            );
        }
    }

    #[test]
    fn test_unprotected_pages_pass() {
        let gate = Gatekeeper::default();
        assert_eq!(gate.evaluate("/", NO_COOKIES), GateDecision::Allow(AllowReason::Unprotected));
        assert_eq!(gate.evaluate("/pokemon", NO_COOKIES), GateDecision::Allow(AllowReason::Unprotected));
        assert_eq!(gate.evaluate("/about", NO_COOKIES), GateDecision::Allow(AllowReason::Unprotected));
    }

    #[test]
    fn test_disabled_gate_still_blocks_scanners() {
        let config = GateConfig {
            enabled: false,
            ..GateConfig::default()
        };
        let gate = Gatekeeper::from_config(config).unwrap();
        assert_eq!(gate.evaluate("/.git/HEAD", NO_COOKIES), GateDecision::Reject);
        assert_eq!(
            gate.evaluate("/pokemon/25", NO_COOKIES),
            GateDecision::Allow(AllowReason::GateDisabled)
        );
    }

    #[test]
    fn test_custom_prefixes_and_patterns() {
        let config = GateConfig {
            protected_prefixes: vec!["/pokemon/".into(), "/moves/".into()],
            extra_deny_patterns: vec!["^/wp-".into()],
            ..GateConfig::default()
        };
        let gate = Gatekeeper::from_config(config).unwrap();
        assert_eq!(
            gate.evaluate("/moves/thunderbolt", NO_COOKIES),
            GateDecision::RedirectToVerify {
                location: "/verify?redirect=%2Fmoves%2Fthunderbolt".to_string()
            }
        );
        assert_eq!(gate.evaluate("/wp-login.php", NO_COOKIES), GateDecision::Reject);
        assert_eq!(gate.snapshot().deny_patterns.last().unwrap(), "regex:^/wp-");
    }

    #[test]
    fn test_labels() {
        assert_eq!(GateDecision::Reject.label(), "rejected");
        assert_eq!(GateDecision::Allow(AllowReason::Verified).label(), "allowed_verified");
    }
}
