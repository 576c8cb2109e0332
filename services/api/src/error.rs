//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP clients.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use learnhub_core::{
    attempt::AttemptError, checkout::CheckoutError, ports::PortError,
    validation::ValidationErrors,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Form input failed validation; rendered field by field.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The checkout wizard refused the requested transition.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// The quiz attempt refused the requested change.
    #[error("Attempt error: {0}")]
    Attempt(#[from] AttemptError),

    #[error("Unauthorized")]
    Unauthorized,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Port(PortError::Declined(_)) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Port(PortError::Unauthorized) | ApiError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Checkout(_) => StatusCode::CONFLICT,
            ApiError::Attempt(AttemptError::UnknownQuestion(_)) => StatusCode::BAD_REQUEST,
            ApiError::Attempt(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => ErrorBody {
                error: "Validation failed".to_string(),
                errors: Some(errors.fields().clone()),
            },
            other if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Internal error: {:?}", other);
                ErrorBody {
                    error: "Internal server error".to_string(),
                    errors: None,
                }
            }
            ApiError::Port(e) => ErrorBody {
                error: e.to_string(),
                errors: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                errors: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
