use crate::api::cors_headers;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Result type for cost report operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The query service could not be reached or rejected the call
    #[error("Failed to {operation}: {message}")]
    QueryService { operation: String, message: String },

    /// The query reached a terminal FAILED state
    #[error("{reason}")]
    QueryFailed { execution_id: String, reason: String },

    /// The query service answered without a field we depend on
    #[error("Query service response is missing {field}")]
    MalformedResponse { field: String },

    /// Configuration failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human readable failure reason
    pub error: String,
}

impl Error {
    pub fn query_service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::QueryService {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::QueryService { .. } | Error::MalformedResponse { .. } | Error::Other(_) => {
                tracing::error!("Cost report failed: {:#}", self);
            }
            Error::QueryFailed { execution_id, .. } => {
                tracing::warn!(execution_id = %execution_id, "Query execution failed: {}", self);
            }
            Error::InvalidConfig { .. } => {
                tracing::error!("{}", self);
            }
        }

        let body = ErrorBody { error: self.to_string() };
        (StatusCode::INTERNAL_SERVER_ERROR, cors_headers(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_query_failed_body_is_the_reason() {
        let response = Error::QueryFailed {
            execution_id: "abc".to_string(),
            reason: "SYNTAX_ERROR: line 1:8".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "SYNTAX_ERROR: line 1:8");
    }

    #[test]
    fn test_query_service_message_includes_operation() {
        let err = Error::query_service("start query execution", "AccessDeniedException: nope");
        assert_eq!(err.to_string(), "Failed to start query execution: AccessDeniedException: nope");
    }
}
