// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Reason code attached to an upstream failure when it enters the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Overloaded,
    QuotaExceeded,
    Other,
}

/// A failed generation call, classified once at the client boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    /// Classify an upstream error message. "overloaded" wins over "quota"
    /// when both appear.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = if lower.contains("overloaded") {
            UpstreamErrorKind::Overloaded
        } else if lower.contains("quota") {
            UpstreamErrorKind::QuotaExceeded
        } else {
            UpstreamErrorKind::Other
        };
        Self { kind, message }
    }

    pub fn is_overloaded(&self) -> bool {
        self.kind == UpstreamErrorKind::Overloaded
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("message is empty")]
    InvalidInput,
    #[error("API credential is missing or still the placeholder")]
    Misconfigured,
    #[error("All models are currently overloaded. Please try again later.")]
    AllModelsOverloaded,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// What the client gets told, independent of how the failure arose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidInput,
    Misconfigured,
    Overloaded,
    QuotaExceeded,
    UpstreamFailure,
}

impl DispatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DispatchError::InvalidInput => ErrorCategory::InvalidInput,
            DispatchError::Misconfigured => ErrorCategory::Misconfigured,
            DispatchError::AllModelsOverloaded => ErrorCategory::Overloaded,
            DispatchError::Upstream(err) => match err.kind {
                UpstreamErrorKind::Overloaded => ErrorCategory::Overloaded,
                UpstreamErrorKind::QuotaExceeded => ErrorCategory::QuotaExceeded,
                UpstreamErrorKind::Other => ErrorCategory::UpstreamFailure,
            },
        }
    }
}

const UPSTREAM_PREFIX: &str = "Failed to get response from AI. ";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Misconfigured(String),
    #[error("{0}")]
    Unavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err.category() {
            ErrorCategory::InvalidInput => AppError::BadRequest("Message is required".to_string()),
            ErrorCategory::Misconfigured => AppError::Misconfigured(
                "Gemini API key not configured on server. Please check the .env file.".to_string(),
            ),
            ErrorCategory::Overloaded => AppError::Unavailable(format!(
                "{UPSTREAM_PREFIX}The AI service is currently overloaded with high traffic. Please try again in a moment."
            )),
            ErrorCategory::QuotaExceeded => AppError::Unavailable(format!(
                "{UPSTREAM_PREFIX}API quota exceeded. Please check your API key limits."
            )),
            ErrorCategory::UpstreamFailure => {
                AppError::Unavailable(format!("{UPSTREAM_PREFIX}{err}"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
