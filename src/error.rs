// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gateway error taxonomy.
//!
//! Every operation exposed by the gateway core returns [`CoreError`] on
//! failure. Guard and calculator failures are raised before any engine call
//! is attempted; engine failures arrive as unstructured text through the
//! completion bridge and are classified by [`CoreError::from_engine`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::bridge::EngineFailure;

/// Failure kinds produced by the gateway core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced offer, trade, payment account or arbitrator does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Malformed input, wrong trade state, self-trade attempt, incompatible
    /// payment account currency.
    #[error("{0}")]
    ValidationFailed(String),
    /// Spendable balance below the computed requirement.
    #[error("{0}")]
    InsufficientFunds(String),
    /// Resulting output would be below the network dust threshold.
    #[error("{0}")]
    AmountTooLow(String),
    /// Amount exceeds an engine-imposed ceiling.
    #[error("{0}")]
    AmountTooHigh(String),
    /// Missing or invalid access token, or wrong wallet password.
    #[error("{0}")]
    Unauthorized(String),
    /// Wallet subsystem not yet initialized or synced.
    #[error("{0}")]
    WalletNotReady(String),
    /// A bridged engine call exceeded its deadline without a callback.
    #[error("engine call timed out")]
    Timeout,
    /// Engine returned an error not matching any known pattern.
    #[error("{0}")]
    Unexpected(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl CoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// Stable machine-readable code for this error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::ValidationFailed(_) => "validation_failed",
            CoreError::InsufficientFunds(_) => "insufficient_funds",
            CoreError::AmountTooLow(_) => "amount_too_low",
            CoreError::AmountTooHigh(_) => "amount_too_high",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::WalletNotReady(_) => "wallet_not_ready",
            CoreError::Timeout => "timeout",
            CoreError::Unexpected(_) => "unexpected",
        }
    }

    /// HTTP status this error maps to at the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::ValidationFailed(_)
            | CoreError::AmountTooLow(_)
            | CoreError::AmountTooHigh(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::InsufficientFunds(_) => StatusCode::CONFLICT,
            CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoreError::WalletNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CoreError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a bridge-reported engine failure.
    ///
    /// Engine errors are free text; known substrings are matched
    /// case-insensitively, everything else becomes [`CoreError::Unexpected`]
    /// carrying the original message.
    pub fn from_engine(failure: EngineFailure) -> Self {
        match failure {
            EngineFailure::Timeout => CoreError::Timeout,
            EngineFailure::Abandoned => {
                CoreError::Unexpected("engine dropped the completion handle".into())
            }
            EngineFailure::Message(message) => classify_engine_message(message),
        }
    }
}

fn classify_engine_message(message: String) -> CoreError {
    let lowered = message.to_lowercase();
    if lowered.contains("insufficient money") || lowered.contains("insufficient funds") {
        CoreError::InsufficientFunds(message)
    } else if lowered.contains("amount is larger") {
        CoreError::AmountTooHigh(message)
    } else if lowered.contains("dust") {
        CoreError::AmountTooLow(message)
    } else {
        CoreError::Unexpected(message)
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            error: self.to_string(),
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
