use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::dto::ErrorResponse;

/// Every failure a handler can return, translated to HTTP in one place
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] roadwatch_core::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Search task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use roadwatch_core::Error as Core;

        match self {
            ApiError::Core(err) => match err {
                Core::InvalidNode(_)
                | Core::NoPath { .. }
                | Core::InvalidObstacle(_)
                | Core::InvalidCoordinates(_)
                | Core::InvalidPolicy(_) => StatusCode::BAD_REQUEST,
                Core::NodeNotFound(_) | Core::ObstacleNotFound(_) => StatusCode::NOT_FOUND,
                Core::NotOwner { .. } => StatusCode::FORBIDDEN,
                Core::EmptyGraph => StatusCode::SERVICE_UNAVAILABLE,
                Core::Cancelled => StatusCode::REQUEST_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Join(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(err) => err.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Timeout => "TIMEOUT",
            ApiError::Join(_) | ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{self}");
        } else {
            tracing::debug!(code = self.code(), "{self}");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
