use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::config::config;
use crate::error::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Requests with no access key (allowed only when policy does not require
/// one) share a single bucket so anonymous floods still hit a ceiling.
const ANONYMOUS_CALLER: &str = "anonymous";

/// Call-admission middleware: access-key policy check plus quota.
///
/// Runs ahead of credential verification so abusive load is shed before any
/// signature or store work happens, whether or not the bearer token is valid.
pub async fn admission_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let policy = &config().auth;
    if policy.require_api_key {
        match api_key {
            None => return Err(ApiError::forbidden("access key required")),
            Some(key) if !policy.api_keys.iter().any(|k| k == key) => {
                tracing::warn!(caller = %key, "unrecognized access key");
                return Err(ApiError::forbidden("unrecognized access key"));
            }
            Some(_) => {}
        }
    }

    let caller_key = api_key.unwrap_or(ANONYMOUS_CALLER);
    if let Err(e) = state.quota.admit(caller_key) {
        tracing::warn!(caller = %caller_key, error = %e, "request rejected by quota");
        return Err(e.into());
    }

    Ok(next.run(request).await)
}
