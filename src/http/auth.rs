//! Basic-auth middleware
//!
//! Every catalog and streaming request must carry HTTP basic credentials
//! whose password matches the configured shared secret. The username is
//! ignored.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::state::AppState;

const CHALLENGE: &str = "Basic realm=\"river\"";

/// Reject requests without the right password
pub async fn require_password(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match basic_auth_password(request.headers()) {
        Some(password) if constant_time_eq(password.as_bytes(), state.password().as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!("Rejected {} {}: wrong password", request.method(), request.uri());
            unauthorized()
        }
        None => {
            tracing::debug!("Rejected {} {}: no credentials", request.method(), request.uri());
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
        "Unauthorized",
    )
        .into_response()
}

/// Password from an `Authorization: Basic ...` header, if any
pub fn basic_auth_password(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (_user, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
