// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bearer-token middleware for Axum.
//!
//! Applied with `axum::middleware::from_fn_with_state` to the protected
//! router subtree. Requests are gated in three stages: a wallet that is not
//! ready yet answers 503 for everything, an unencrypted wallet runs without
//! authentication, and an encrypted one requires the current bearer token.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::CoreError;
use crate::state::AppState;

/// Authentication middleware function.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.wallet.is_wallet_ready() {
        return CoreError::WalletNotReady("Wallet is not ready".to_string()).into_response();
    }
    if !state.wallet.is_encrypted() {
        return next.run(request).await;
    }
    match bearer_token(&request) {
        Some(token) if state.tokens.is_valid(token) => next.run(request).await,
        _ => CoreError::Unauthorized("Missing or invalid api token".to_string()).into_response(),
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderValue;

    fn request_with_auth(value: &str) -> Request {
        let mut request = Request::new(axum::body::Body::empty());
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        request
    }

    #[test]
    fn bearer_token_is_extracted_and_trimmed() {
        let request = request_with_auth("Bearer  abc123 ");
        assert_eq!(bearer_token(&request), Some("abc123"));
    }

    #[test]
    fn non_bearer_schemes_are_rejected() {
        let request = request_with_auth("Basic abc123");
        assert_eq!(bearer_token(&request), None);
        let bare = Request::new(axum::body::Body::empty());
        assert_eq!(bearer_token(&bare), None);
    }
}
