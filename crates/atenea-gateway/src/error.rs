// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`AteneaError`] to HTTP responses.
//!
//! Structured rejections keep their message; operational failures are
//! logged with full detail and answered with a generic body.

use atenea_core::AteneaError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
    /// Machine-readable error kind.
    pub kind: &'static str,
}

/// An engine error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AteneaError);

impl From<AteneaError> for ApiError {
    fn from(err: AteneaError) -> Self {
        Self(err)
    }
}

/// Status code for an engine error.
pub fn status_for(err: &AteneaError) -> StatusCode {
    match err {
        AteneaError::NotFound { .. } => StatusCode::NOT_FOUND,
        AteneaError::InvalidTransition { .. } => StatusCode::CONFLICT,
        AteneaError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AteneaError::DispatchFailure { .. } | AteneaError::Channel { .. } | AteneaError::Bot { .. } => {
            StatusCode::BAD_GATEWAY
        }
        AteneaError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        AteneaError::Config(_)
        | AteneaError::Storage { .. }
        | AteneaError::IntegrityFailure { .. }
        | AteneaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            if !self.0.is_rejection() {
                tracing::warn!(kind = self.0.kind(), error = %self.0, "request failed");
            }
            self.0.to_string()
        };
        (
            status,
            Json(ErrorResponse {
                error,
                kind: self.0.kind(),
            }),
        )
            .into_response()
    }
}
