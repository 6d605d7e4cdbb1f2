//! Error taxonomy shared by the HTTP and WebSocket boundaries.
//!
//! Every rejection carries a stable machine-readable kind plus a
//! human-readable message, so clients can tell "your action failed"
//! apart from "room state changed".

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("wrong phase: expected {expected}")]
    InvalidPhase { expected: &'static str },

    #[error("need at least {needed} players, got {got}")]
    InsufficientPlayers { needed: usize, got: usize },

    #[error("room-code space exhausted")]
    ResourceExhausted,

    #[error("rate limited, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Stable kind string surfaced on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::InvalidInput(_) => "invalid_input",
            GameError::NotFound => "not_found",
            GameError::Forbidden => "forbidden",
            GameError::InvalidPhase { .. } => "invalid_phase",
            GameError::InsufficientPlayers { .. } => "insufficient_players",
            GameError::ResourceExhausted => "resource_exhausted",
            GameError::RateLimited { .. } => "rate_limited",
            GameError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for GameError {
    fn status_code(&self) -> StatusCode {
        match self {
            GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::NotFound => StatusCode::NOT_FOUND,
            GameError::Forbidden => StatusCode::FORBIDDEN,
            GameError::InvalidPhase { .. } => StatusCode::CONFLICT,
            GameError::InsufficientPlayers { .. } => StatusCode::CONFLICT,
            GameError::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
            GameError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let GameError::RateLimited { retry_after } = self {
            builder.insert_header(("Retry-After", retry_after.to_string()));
        }
        builder.json(json!({
            "kind": self.kind(),
            "message": self.to_string(),
        }))
    }
}
