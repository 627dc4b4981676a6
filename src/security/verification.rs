//! Verification cookie contract.
//!
//! The cookie is a client-held flag: `<name>=true` with HttpOnly, Secure,
//! SameSite=Lax, Path=/ and a fixed Max-Age. No server-side session exists.

use url::Url;

/// Base used to resolve redirect targets; only its origin matters.
const REDIRECT_BASE: &str = "http://edge.invalid/";

/// The only value that counts as verified.
pub const VERIFIED_VALUE: &str = "true";

/// Find a cookie value in a `Cookie` request header.
pub fn read_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}

/// True if any of the `Cookie` headers carries `<name>=true`.
pub fn is_verified<'a>(cookie_headers: impl IntoIterator<Item = &'a str>, name: &str) -> bool {
    cookie_headers
        .into_iter()
        .filter_map(|header| read_cookie(header, name))
        .any(|value| value == VERIFIED_VALUE)
}

/// `Set-Cookie` value issued after a successful challenge.
pub fn verification_cookie(name: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        name, VERIFIED_VALUE, max_age_secs
    )
}

/// Keep post-verification redirects on this site.
///
/// Browsers drop tab, CR and LF while parsing a URL, so `/\t/host` ends up
/// as `//host`. Targets with whitespace, control characters or backslashes
/// are refused outright, and what remains must resolve to our own origin.
/// Anything else becomes `/`.
pub fn sanitize_redirect(target: Option<&str>) -> String {
    match target {
        Some(t) if is_same_origin_path(t) => t.to_string(),
        _ => "/".to_string(),
    }
}

fn is_same_origin_path(target: &str) -> bool {
    if !target.starts_with('/') || target.starts_with("//") {
        return false;
    }
    if target
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || c == '\\')
    {
        return false;
    }

    let Ok(base) = Url::parse(REDIRECT_BASE) else {
        return false;
    };
    match base.join(target) {
        Ok(resolved) => resolved.origin() == base.origin(),
        Err(_) => false,
    }
}
