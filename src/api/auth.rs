//! Credential extraction for the REST API
//!
//! Keys are presented in the `X-API-Key` header. Routes that need a
//! permission call [`authorize`], which runs the admission gate and turns a
//! denial into the matching error response.

use crate::api::AppState;
use crate::error::Result;
use crate::types::{KeyRecord, Permission};
use axum::http::HeaderMap;

/// Header carrying the key token
pub const API_KEY_HEADER: &str = "x-api-key";

/// Token presented in the request headers, if any
///
/// Header names are case-insensitive; the value is taken verbatim.
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Run the admission gate for `permission` and return the resolved key
pub async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    permission: Permission,
) -> Result<KeyRecord> {
    state
        .scheduler
        .admission()
        .gate(presented_token(headers), permission)
        .await?
        .into_result()
}
