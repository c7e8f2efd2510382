// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use damage_locator_processing::ProcessingError;
use serde::Serialize;
use thiserror::Error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Request too large: maximum size is {max_mb} MB")]
    RequestTooLarge { max_mb: usize },

    #[error("Vision model not configured: {0}")]
    VisionUnavailable(String),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] ProcessingError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::RequestTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "REQUEST_TOO_LARGE"),
            ApiError::VisionUnavailable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VISION_UNAVAILABLE"),
            ApiError::Analysis(ProcessingError::NoPhotos) => (StatusCode::BAD_REQUEST, "NO_PHOTOS"),
            ApiError::Analysis(ProcessingError::AllPhotosFailed { .. }) => {
                (StatusCode::BAD_GATEWAY, "ALL_PHOTOS_FAILED")
            }
            ApiError::Analysis(ProcessingError::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED")
            }
            ApiError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<damage_locator_core::Error> for ApiError {
    fn from(err: damage_locator_core::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<damage_locator_geometry::Error> for ApiError {
    fn from(err: damage_locator_geometry::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<cacache::Error> for ApiError {
    fn from(err: cacache::Error) -> Self {
        ApiError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {}", err))
    }
}
