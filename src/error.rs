use crate::domain::GameId;
use crate::ledger::LedgerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Failure of a whole aggregation or lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Transient; the caller may retry with backoff.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("no such game: {0}")]
    GameNotFound(GameId),
    /// The ledger returned data that does not fit together. Never retried.
    #[error("malformed ledger record: {0}")]
    MalformedRecord(String),
    #[error("aggregation cancelled")]
    Cancelled,
}

impl SettlementError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SettlementError::LedgerUnavailable(_))
    }
}

/// JSON-RPC invalid request, method not found and invalid params. Retrying cannot help.
const RPC_REQUEST_ERRORS: std::ops::RangeInclusive<i64> = -32602..=-32600;

impl From<LedgerError> for SettlementError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Parse(msg) => SettlementError::MalformedRecord(msg),
            LedgerError::Rpc { code, message } if RPC_REQUEST_ERRORS.contains(&code) => {
                SettlementError::MalformedRecord(format!("RPC error {}: {}", code, message))
            }
            other => SettlementError::LedgerUnavailable(other.to_string()),
        }
    }
}

/// Failure confined to one feed. Players holding the feed are reported as unscored.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "camelCase")]
pub enum FeedFailure {
    #[error("price unavailable: {0}")]
    PriceUnavailable(String),
    /// The feed's current price is zero.
    #[error("division by zero: current price is 0")]
    DivisionByZero,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::LedgerUnavailable(_) => AppError::Unavailable(err.to_string()),
            SettlementError::GameNotFound(_) => AppError::NotFound(err.to_string()),
            SettlementError::MalformedRecord(_) => AppError::BadGateway(err.to_string()),
            SettlementError::Cancelled => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = matches!(self, AppError::Unavailable(_));
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
            "retryable": retryable,
        }));

        (status, body).into_response()
    }
}
