use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::FieldErrors;

/// Failures raised by a store backend. Messages are shown to the operator verbatim.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Rejected(String),

    #[error("No record in {table} with id {id}")]
    NotFound { table: &'static str, id: u64 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record in {table}: {source}")]
    Corrupt {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    BadUpload(&'static str),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Please fix the errors and submit again.")]
    Validation(FieldErrors),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Invalid password")]
    InvalidPassword,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload { .. } | AppError::BadUpload { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::UnknownResource { .. } => StatusCode::NOT_FOUND,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized | AppError::InvalidPassword => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store { .. } | AppError::Config { .. } | AppError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match &self {
            AppError::Validation(errors) => json!({ "error": self.to_string(), "fields": errors }),
            _ => json!({ "error": self.to_string() }),
        };

        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(body)).into_response()
    }
}

/// Outcome of an admin action as seen by the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Please fix the highlighted fields")]
    Validation(FieldErrors),

    #[error("{0}")]
    Store(String),

    #[error("Could not reach the server: {0}")]
    Transport(String),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => ActionError::Transport(message),
            other => ActionError::Store(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ActionError {
    fn from(err: reqwest::Error) -> Self {
        ActionError::Transport(err.to_string())
    }
}
