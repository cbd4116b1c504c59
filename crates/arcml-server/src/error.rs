//! HTTP error mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors returned by request handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body failed schema or constraint checks
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Dependencies are not ready to serve traffic
    #[error("{0}")]
    NotReady(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::NotReady(_) => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<arcml_core::Error> for AppError {
    fn from(err: arcml_core::Error) -> Self {
        match err {
            arcml_core::Error::Validation(msg) => Self::Validation(msg),
            arcml_core::Error::NotReady(msg) => Self::NotReady(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let cases = [
            (arcml_core::Error::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (arcml_core::Error::not_ready("db down"), StatusCode::SERVICE_UNAVAILABLE),
            (arcml_core::Error::model_not_loaded("sentiment"), StatusCode::INTERNAL_SERVER_ERROR),
            (arcml_core::Error::storage("timeout"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_not_found() {
        let response = AppError::not_found("Job not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
