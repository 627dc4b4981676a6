//! Verification page and token submission endpoint.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::http::response::fetch_error_response;
use crate::http::server::AppState;
use crate::security::verification::{sanitize_redirect, verification_cookie};
use crate::upstream::TokenVerdict;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

/// Best-effort client address, as reported by the fronting proxy.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(ip) = headers.get("cf-connecting-ip").and_then(|v| v.to_str().ok()) {
        return Some(ip.trim().to_string());
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the challenge page. After a successful submission the browser
/// returns to the sanitized `redirect` target.
pub fn render_verify_page(site_key: &str, verify_api_path: &str, redirect: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>Quick check</title>
<script src="https://challenges.cloudflare.com/turnstile/v0/api.js" async defer></script>
</head>
<body data-redirect="{redirect}" data-endpoint="{endpoint}">
<main>
<h1>Just making sure you're human</h1>
<div class="cf-turnstile" data-sitekey="{site_key}" data-callback="onVerified"></div>
<p id="status" role="status"></p>
</main>
<script>
async function onVerified(token) {{
  const status = document.getElementById("status");
  const body = document.body.dataset;
  status.textContent = "Verifying…";
  try {{
    const res = await fetch(body.endpoint, {{
      method: "POST",
      headers: {{ "Content-Type": "application/json" }},
      body: JSON.stringify({{ token }}),
    }});
    if (res.ok) {{
      window.location.replace(body.redirect);
    }} else {{
      status.textContent = "Verification failed. Please try again.";
    }}
  }} catch (e) {{
    status.textContent = "Network error. Please try again.";
  }}
}}
</script>
</body>
</html>
"#,
        redirect = escape_html(redirect),
        endpoint = escape_html(verify_api_path),
        site_key = escape_html(site_key),
    )
}

pub async fn verify_page(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Html<String> {
    let redirect = sanitize_redirect(query.redirect.as_deref());
    let verify_api_path = state.gate.load().config().verify_api_path.clone();
    Html(render_verify_page(&state.verification.site_key, &verify_api_path, &redirect))
}

pub async fn verify_turnstile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Response {
    let token = body.token.trim();
    if token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Missing verification token"})),
        )
            .into_response();
    }

    let ip = client_ip(&headers);
    match state.verifier.verify(token, ip.as_deref()).await {
        Ok(TokenVerdict::Accepted) => {
            let cookie_name = state.gate.load().config().cookie_name.clone();
            tracing::info!(client = ?ip, "Client verified");
            (
                StatusCode::OK,
                [(
                    header::SET_COOKIE,
                    verification_cookie(&cookie_name, state.verification.cookie_max_age_secs),
                )],
                Json(json!({"success": true})),
            )
                .into_response()
        }
        Ok(TokenVerdict::Rejected { error_codes }) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": "Verification failed",
                "codes": error_codes,
            })),
        )
            .into_response(),
        Err(e) => fetch_error_response(&e),
    }
}
