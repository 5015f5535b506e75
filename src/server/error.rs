use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::moderation::{CaseError, EvidenceError};
use crate::runtime::RuntimeError;

const LOG_TARGET: &str = "poker_room_authority::server::error";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::UnknownRoom(_) | RuntimeError::UnknownCase(_) | RuntimeError::RoomGone(_) => {
                ApiError::NotFound(err.to_string())
            }
            RuntimeError::RoomAlreadyExists(_) => ApiError::BadRequest(err.to_string()),
            RuntimeError::Case(CaseError::InvalidTransition { .. } | CaseError::Unassigned { .. }) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<EvidenceError> for ApiError {
    fn from(err: EvidenceError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Internal(message) => {
                error!(target: LOG_TARGET, %message, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}
