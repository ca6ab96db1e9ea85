//! Errors of room commands, services and HTTP handlers.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Caller-input errors of room commands, reported only to the originating connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The room does not exist yet.
    #[error("unknown room")]
    UnknownRoom,
    /// The caller has not joined the targeted room.
    #[error("caller has not joined the room")]
    NotJoined,
    /// The requested question does not exist.
    #[error("no such question")]
    NoQuestion,
    /// Nothing is on display.
    #[error("no question is currently displayed")]
    NoCurrentQuestion,
    /// Only the responder may cancel.
    #[error("caller does not hold the buzz lock")]
    NotResponder,
    /// Another participant holds the buzz lock.
    #[error("another participant is answering")]
    NotYourTurn,
    /// Answers are locked while the answer is revealed.
    #[error("answers are locked")]
    Locked,
    /// The buzz lock is already held.
    #[error("buzz lock already held")]
    Busy,
    /// A background refill is already running.
    #[error("a refill is already running")]
    AlreadyRefilling,
    /// Payload failed validation.
    #[error("invalid input")]
    InvalidInput,
}

impl CommandError {
    /// Stable wire code.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnknownRoom => "unknown-room",
            Self::NotJoined => "not-joined",
            Self::NoQuestion => "no-question",
            Self::NoCurrentQuestion => "no-current-question",
            Self::NotResponder => "not-responder",
            Self::NotYourTurn => "not-your-turn",
            Self::Locked => "locked",
            Self::Busy => "busy",
            Self::AlreadyRefilling => "already-refilling",
            Self::InvalidInput => "invalid-input",
        }
    }
}

impl From<ValidationErrors> for CommandError {
    fn from(_: ValidationErrors) -> Self {
        CommandError::InvalidInput
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The question source could not produce questions.
    #[error("question source unavailable: {0}")]
    SourceUnavailable(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::SourceUnavailable(message) => AppError::ServiceUnavailable(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
