//! Error types for the server

use crate::error::CollisionError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    NotReady(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CollisionError> for ServerError {
    fn from(err: CollisionError) -> Self {
        match err {
            CollisionError::ServiceNotReady => ServerError::NotReady(err.to_string()),
            CollisionError::ProbabilityUnsupported(_) => ServerError::BadRequest(err.to_string()),
            e if e.is_client_error() => ServerError::BadRequest(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ServerError::PayloadTooLarge(rejection.body_text()),
            _ => ServerError::BadRequest(rejection.body_text()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => {
                tracing::warn!(detail = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            ServerError::NotReady(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
