// Meterstat Server - HTTP adapter for meterstat
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the server and their HTTP mapping.

use crate::metrics::record_analysis_failure;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meterstat::{AnalyticsError, ErrorKind, ParseResolutionError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for request handling
#[derive(Error, Debug)]
pub enum ApiError {
    /// Failure reported by the analytics core
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Resolution string outside the enumerated set
    #[error(transparent)]
    Resolution(#[from] ParseResolutionError),

    /// No samples stored for this entity
    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    /// Malformed query or body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for request handlers
pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Analytics(err) => match err.kind() {
                ErrorKind::InsufficientData | ErrorKind::DegenerateInput => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ErrorKind::InvalidConfig => StatusCode::BAD_REQUEST,
                // The store hands out ordered ranges, so this is our bug
                ErrorKind::InputOrder => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Resolution(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownSeries(_) => StatusCode::NOT_FOUND,
            ApiError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Analytics(err) => err.kind().as_str(),
            ApiError::Resolution(_) => "invalid_resolution",
            ApiError::UnknownSeries(_) => "unknown_series",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Csv(_) => "csv",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Analytics(ref err) = self {
            record_analysis_failure(err.kind());
        }
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
