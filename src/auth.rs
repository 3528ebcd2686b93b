//! Bearer token extraction for tool dispatch.
//!
//! The transport layer hands us request headers; tools that hit the
//! orchestrator directly need the caller's token, and the resource cache
//! opportunistically records it via `note_credential`.

use crate::error::{Error, Result};
use hyper::http::HeaderMap;

/// Extract a Bearer token from the `Authorization` header, if present.
///
/// The scheme comparison is case-insensitive; surrounding whitespace is trimmed.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(hyper::http::header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = auth.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Require a token for a protected call.
///
/// # Errors
///
/// Returns `Error::Unauthorized` if the token is absent or empty.
pub fn require_token(token: Option<String>) -> Result<String> {
    match token {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(Error::Unauthorized(
            "Missing or invalid Authorization Bearer token".to_string(),
        )),
    }
}
