use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::intelligence::llm::LlmError;
use crate::storage::StorageError;

/// Request-level failures, mapped to HTTP at the handler edge.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("summary generation failed: {0}")]
    Llm(#[from] LlmError),
}

impl From<StorageError> for DeskError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Invalid(msg) => DeskError::Validation(msg),
            other => DeskError::Storage(other),
        }
    }
}

impl DeskError {
    pub fn status(&self) -> StatusCode {
        match self {
            DeskError::Unauthorized => StatusCode::UNAUTHORIZED,
            DeskError::Forbidden => StatusCode::FORBIDDEN,
            DeskError::NotFound(_) => StatusCode::NOT_FOUND,
            DeskError::Validation(_) => StatusCode::BAD_REQUEST,
            DeskError::Storage(_) | DeskError::Llm(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_401_and_403() {
        assert_eq!(DeskError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DeskError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_failures_map_to_500() {
        let err = DeskError::from(StorageError::Other("disk full".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "storage error: disk full");

        let err = DeskError::from(LlmError::NotConfigured);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_input_from_storage_is_400() {
        let err = DeskError::from(StorageError::Invalid("Invalid priority 'urgent'".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_message_passes_through() {
        let err = DeskError::Validation("Invalid status 'paused'".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid status 'paused'");
    }
}
