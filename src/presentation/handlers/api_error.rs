use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::ports::{ProviderError, RepositoryError};
use crate::application::services::{BatchProcessorError, DispatchError, TransitionError};

use super::api_response::{ApiResponse, ErrorDetail};

/// Handler error carrying the HTTP status and a machine-readable code.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn invalid_config(errors: Vec<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "CONFIGURATION_INVALID",
            "configuration is invalid",
        )
        .with_details(json!({ "errors": errors }))
    }

    fn internal(code: &'static str, message: String) -> Self {
        tracing::error!(code, error = %message, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, "an internal error occurred")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::failure(ErrorDetail {
            code: self.code,
            message: self.message,
            details: self.details,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            RepositoryError::ConstraintViolation(message) => {
                ApiError::new(StatusCode::CONFLICT, "CONSTRAINT_VIOLATION", message)
            }
            other => ApiError::internal("REPOSITORY_ERROR", other.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::ConfigurationInvalid(errors) => ApiError::invalid_config(errors),
            ProviderError::ProviderNotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "PROVIDER_NOT_FOUND", e.to_string())
            }
            ProviderError::InitializationFailed(message) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE", message)
            }
        }
    }
}

impl From<BatchProcessorError> for ApiError {
    fn from(e: BatchProcessorError) -> Self {
        use BatchProcessorError as E;
        let message = e.to_string();
        match e {
            E::FolderNotFound(_) | E::JobNotFound(_) | E::RecordNotFound(_) => {
                ApiError::not_found(message)
            }
            E::FolderInactive(_) => ApiError::new(StatusCode::CONFLICT, "FOLDER_INACTIVE", message),
            E::FolderNotRunning(_) => {
                ApiError::new(StatusCode::CONFLICT, "FOLDER_NOT_RUNNING", message)
            }
            E::NoActiveMonitor(_) => {
                ApiError::new(StatusCode::CONFLICT, "NO_ACTIVE_MONITOR", message)
            }
            E::MonitorConflict { .. } => {
                ApiError::new(StatusCode::CONFLICT, "MONITOR_CONFLICT", message)
            }
            E::JobAlreadyFinished { .. } => {
                ApiError::new(StatusCode::CONFLICT, "JOB_ALREADY_FINISHED", message)
            }
            E::NothingToRetry(_) => {
                ApiError::new(StatusCode::CONFLICT, "NOTHING_TO_RETRY", message)
            }
            E::NotRetryable { .. } => {
                ApiError::new(StatusCode::CONFLICT, "NOT_RETRYABLE", message)
            }
            E::RetryBudgetExhausted { .. } => {
                ApiError::new(StatusCode::CONFLICT, "RETRY_BUDGET_EXHAUSTED", message)
            }
            E::ConfigurationInvalid(errors) => ApiError::invalid_config(errors),
            E::Provider(e) => e.into(),
            E::Storage(e) => ApiError::new(StatusCode::BAD_GATEWAY, "STORAGE_ERROR", e.to_string()),
            E::Monitor(e) => ApiError::new(StatusCode::CONFLICT, "MONITOR_ERROR", e.to_string()),
            E::Repository(e) => e.into(),
            E::Transition(TransitionError::Repository(e)) => e.into(),
            E::Transition(e) => ApiError::new(StatusCode::CONFLICT, "STATUS_CONFLICT", e.to_string()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Provider(e) => e.into(),
            DispatchError::Repository(e) => e.into(),
            DispatchError::Notification(e) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "DELIVERY_FAILED", e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), "INVALID_BODY", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}
