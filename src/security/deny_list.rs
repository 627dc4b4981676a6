//! Deny-list of paths that only vulnerability scanners ask for.
//!
//! # Design Decisions
//! - Matching is on the lowercased path, so every pattern is case-insensitive
//! - Built-in patterns are literal checks; only operator-supplied extras use regex
//! - First match wins; pattern order does not matter

use regex::{Regex, RegexBuilder};

/// A single compiled path matcher.
#[derive(Debug, Clone)]
pub enum DenyPattern {
    /// Path ends with the literal.
    Suffix(&'static str),
    /// Path contains the literal anywhere.
    Contains(&'static str),
    /// Last path segment equals the literal.
    FileName(&'static str),
    /// Operator-supplied regular expression.
    Regex(Regex),
}

impl DenyPattern {
    /// `path` must already be lowercased.
    fn matches(&self, path: &str) -> bool {
        match self {
            DenyPattern::Suffix(s) => path.ends_with(s),
            DenyPattern::Contains(s) => path.contains(s),
            DenyPattern::FileName(name) => {
                path.trim_end_matches('/').rsplit('/').next() == Some(*name)
            }
            DenyPattern::Regex(re) => re.is_match(path),
        }
    }

    fn describe(&self) -> String {
        match self {
            DenyPattern::Suffix(s) => format!("suffix:{}", s),
            DenyPattern::Contains(s) => format!("contains:{}", s),
            DenyPattern::FileName(s) => format!("file:{}", s),
            DenyPattern::Regex(re) => format!("regex:{}", re.as_str()),
        }
    }
}

const SUFFIXES: &[&str] = &[".env", ".dev.vars", ".sql", ".bak", ".log", ".yml", ".yaml"];
const SUBSTRINGS: &[&str] = &[".env.", ".git"];
const FILE_NAMES: &[&str] = &[
    "phpinfo.php",
    "config.php",
    "config.inc",
    "web.config",
    ".htaccess",
    "composer.json",
    "package.json",
];

/// Ordered set of deny patterns.
#[derive(Debug, Clone)]
pub struct DenyList {
    patterns: Vec<DenyPattern>,
}

impl Default for DenyList {
    fn default() -> Self {
        let patterns = SUFFIXES
            .iter()
            .map(|s| DenyPattern::Suffix(s))
            .chain(SUBSTRINGS.iter().map(|s| DenyPattern::Contains(s)))
            .chain(FILE_NAMES.iter().map(|s| DenyPattern::FileName(s)))
            .collect();
        Self { patterns }
    }
}

impl DenyList {
    /// Built-in patterns plus case-insensitive regular expressions.
    pub fn with_extra(extra: &[String]) -> Result<Self, regex::Error> {
        let mut list = Self::default();
        for pattern in extra {
            let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
            list.patterns.push(DenyPattern::Regex(re));
        }
        Ok(list)
    }

    /// Return the first pattern matching `path`, if any.
    pub fn find_match(&self, path: &str) -> Option<&DenyPattern> {
        let lowered = path.to_lowercase();
        self.patterns.iter().find(|p| p.matches(&lowered))
    }

    pub fn is_blocked(&self, path: &str) -> bool {
        self.find_match(path).is_some()
    }

    /// Human-readable pattern list for the admin API.
    pub fn describe(&self) -> Vec<String> {
        self.patterns.iter().map(DenyPattern::describe).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_scanner_paths() {
        let list = DenyList::default();
        for path in [
            "/.env",
            "/app/.env",
            "/.env.production",
            "/.ENV",
            "/.dev.vars",
            "/.git/config",
            "/.git/HEAD",
            "/.gitignore",
            "/backup/dump.sql",
            "/db.SQL",
            "/index.php.bak",
            "/logs/error.log",
            "/docker-compose.yml",
            "/.github/workflows/ci.yaml",
            "/phpinfo.php",
            "/wp/config.php",
            "/config.inc",
            "/web.config",
            "/.htaccess",
            "/composer.json",
            "/package.json",
            "/Package.JSON",
        ] {
            assert!(list.is_blocked(path), "{} should be blocked", path);
        }
    }

    #[test]
    fn test_allows_application_paths() {
        let list = DenyList::default();
        for path in [
            "/",
            "/pokemon/25",
            "/pokemon/mr-mime",
            "/verify",
            "/api/verify-turnstile",
            "/_next/static/chunks/main.js",
            "/favicon.ico",
            "/blog",
            "/environment",
            "/my-package.json.html",
        ] {
            assert!(!list.is_blocked(path), "{} should be allowed", path);
        }
    }

    #[test]
    fn test_extra_regex_patterns() {
        let list = DenyList::with_extra(&["^/wp-(admin|login)".to_string()]).unwrap();
        assert!(list.is_blocked("/wp-admin/setup.php"));
        assert!(list.is_blocked("/WP-LOGIN.php"));
        assert!(!list.is_blocked("/pokemon/wp-admin"));
        assert_eq!(list.describe().len(), DenyList::default().describe().len() + 1);

        assert!(DenyList::with_extra(&["(".to_string()]).is_err());
    }

    #[test]
    fn test_find_match_reports_pattern() {
        let list = DenyList::default();
        let pattern = list.find_match("/.git/config").unwrap();
        assert_eq!(pattern.describe(), "contains:.git");
    }
}
