// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Combined aggregation, trend and spike report for one series.

use crate::aggregate::{aggregate_with, AggregatedPoint, AggregationMode};
use crate::anomaly::{detect_anomaly_with, AnomalyResult};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, ErrorKind, Result};
use crate::resolution::Resolution;
use crate::sample::Sample;
use crate::trend::{day_offsets, fit_trend, TrendResult};
use serde::{Deserialize, Serialize};

/// Result of one analyzer, or why it could not run on this series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis<T> {
    Ready(T),
    Unavailable { kind: ErrorKind, reason: String },
}

impl<T> Analysis<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Analysis::Ready(value) => Some(value),
            Analysis::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Analysis::Ready(_))
    }

    /// Data-shape failures become `Unavailable`; anything else propagates.
    fn capture(result: Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Analysis::Ready(value)),
            Err(
                err @ (AnalyticsError::InsufficientData { .. }
                | AnalyticsError::DegenerateInput { .. }),
            ) => Ok(Analysis::Unavailable {
                kind: err.kind(),
                reason: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }
}

/// Aggregated series with its trend and latest-point spike check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub resolution: Resolution,
    pub aggregation: AggregationMode,
    /// Raw samples consumed
    pub sample_count: usize,
    pub points: Vec<AggregatedPoint>,
    /// Fitted over days since the first bucket
    pub trend: Analysis<TrendResult>,
    /// Latest bucket against the preceding buckets
    pub anomaly: Analysis<AnomalyResult>,
}

impl SeriesReport {
    /// Whether the latest point was flagged.
    pub fn has_spike(&self) -> bool {
        self.anomaly.ready().map_or(false, |a| a.is_anomaly)
    }
}

/// Aggregate `samples` at `resolution`, then run both analyzers on the
/// aggregated series.
///
/// Ordering and configuration errors fail the whole report. A series too
/// short (or too degenerate) for an analyzer still yields its points, with
/// that analyzer marked [`Analysis::Unavailable`].
pub fn analyze(
    samples: &[Sample],
    resolution: Resolution,
    config: &AnalyticsConfig,
) -> Result<SeriesReport> {
    config.validate()?;

    let points = aggregate_with(samples, resolution, config.aggregation)?;
    let trend = Analysis::capture(fit_trend(&day_offsets(&points)))?;
    let anomaly = Analysis::capture(detect_anomaly_with(&points, &config.anomaly))?;

    Ok(SeriesReport {
        resolution,
        aggregation: config.aggregation,
        sample_count: samples.len(),
        points,
        trend,
        anomaly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::TrendClass;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    /// Four readings per day, each day's total given by `daily`.
    fn quarter_hourly(daily: &[f64]) -> Vec<Sample> {
        let origin = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut samples = Vec::new();
        for (day, total) in daily.iter().enumerate() {
            for slot in 0..4 {
                let ts = origin + Duration::days(day as i64) + Duration::hours(slot * 6);
                samples.push(Sample::new(ts, total / 4.0));
            }
        }
        samples
    }

    #[test]
    fn test_report_with_spike() {
        let samples = quarter_hourly(&[20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 80.0]);
        let report = analyze(&samples, Resolution::Day, &AnalyticsConfig::default()).unwrap();

        assert_eq!(report.sample_count, 28);
        assert_eq!(report.points.len(), 7);
        assert_relative_eq!(report.points[6].aggregate, 80.0);
        assert!(report.has_spike());

        let trend = report.trend.ready().unwrap();
        assert_eq!(trend.classification, TrendClass::Increasing);
    }

    #[test]
    fn test_short_series_keeps_points() {
        let samples = quarter_hourly(&[10.0, 12.0]);
        let report = analyze(&samples, Resolution::Day, &AnalyticsConfig::default()).unwrap();

        assert_eq!(report.points.len(), 2);
        assert!(report.trend.is_ready());
        match &report.anomaly {
            Analysis::Unavailable { kind, reason } => {
                assert_eq!(*kind, ErrorKind::InsufficientData);
                assert!(reason.contains("at least 6"));
            }
            other => panic!("expected unavailable anomaly, got {:?}", other),
        }
        assert!(!report.has_spike());
    }

    #[test]
    fn test_single_bucket_trend_unavailable() {
        let samples = quarter_hourly(&[10.0]);
        let report = analyze(&samples, Resolution::Month, &AnalyticsConfig::default()).unwrap();
        assert_eq!(report.points.len(), 1);
        assert!(!report.trend.is_ready());
    }

    #[test]
    fn test_duplicate_raw_timestamps_are_degenerate_for_trend() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let samples = vec![Sample::new(ts, 1.0), Sample::new(ts, 2.0)];
        let report = analyze(&samples, Resolution::Raw, &AnalyticsConfig::default()).unwrap();
        assert!(matches!(
            report.trend,
            Analysis::Unavailable {
                kind: ErrorKind::DegenerateInput,
                ..
            }
        ));
    }

    #[test]
    fn test_order_error_propagates() {
        let mut samples = quarter_hourly(&[10.0, 10.0]);
        samples.swap(0, 5);
        let err = analyze(&samples, Resolution::Day, &AnalyticsConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputOrder);
    }

    #[test]
    fn test_invalid_config_propagates() {
        let mut config = AnalyticsConfig::default();
        config.anomaly.window_size = 0;
        let err = analyze(&[], Resolution::Day, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_report_serializes_status_tags() {
        let samples = quarter_hourly(&[10.0, 12.0]);
        let report = analyze(&samples, Resolution::Day, &AnalyticsConfig::default()).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(json.contains("\"status\":\"unavailable\""));
        assert!(json.contains("\"kind\":\"insufficient_data\""));
        assert!(json.contains("\"resolution\":\"day\""));
    }
}
