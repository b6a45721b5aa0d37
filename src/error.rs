// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for meterstat
//!
//! Every failure is local and deterministic: calling again with the same
//! input yields the same error, so nothing here is retryable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for meterstat operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Main error type for aggregation and analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// A sample is older than one already seen
    #[error("Samples out of order at index {index}: {found} precedes {previous}")]
    InputOrder {
        index: usize,
        previous: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    /// Too few points for the requested statistic
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Every point shares the same x value, so no line can be fitted
    #[error("Degenerate input: all {count} points share x = {x}")]
    DegenerateInput { x: f64, count: usize },

    /// Configuration value that leaves an analysis undefined
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalyticsError {
    /// Stable tag for the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::InputOrder { .. } => ErrorKind::InputOrder,
            AnalyticsError::InsufficientData { .. } => ErrorKind::InsufficientData,
            AnalyticsError::DegenerateInput { .. } => ErrorKind::DegenerateInput,
            AnalyticsError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}

/// Kind of an [`AnalyticsError`], without its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputOrder,
    InsufficientData,
    DegenerateInput,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputOrder => "input_order",
            ErrorKind::InsufficientData => "insufficient_data",
            ErrorKind::DegenerateInput => "degenerate_input",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown resolution name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown resolution '{0}' (expected one of raw, hour, day, week, month, year)")]
pub struct ParseResolutionError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_error_display() {
        let err = AnalyticsError::InsufficientData {
            required: 6,
            actual: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("at least 6"));
        assert!(msg.contains("got 4"));
    }

    #[test]
    fn test_input_order_display_names_both_timestamps() {
        let previous = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let found = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let err = AnalyticsError::InputOrder {
            index: 7,
            previous,
            found,
        };
        let msg = err.to_string();
        assert!(msg.contains("index 7"));
        assert!(msg.contains("2024-03-01"));
        assert!(msg.contains("2024-03-02"));
    }

    #[test]
    fn test_error_kind() {
        let err = AnalyticsError::DegenerateInput { x: 1.0, count: 3 };
        assert_eq!(err.kind(), ErrorKind::DegenerateInput);
        assert_eq!(err.kind().as_str(), "degenerate_input");
        assert_eq!(
            AnalyticsError::InvalidConfig("window".into()).kind(),
            ErrorKind::InvalidConfig
        );
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientData).unwrap();
        assert_eq!(json, "\"insufficient_data\"");
    }
}
