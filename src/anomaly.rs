// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Spike detection on the most recent point of a series.
//!
//! The reference window is the `window_size` points immediately preceding
//! the latest one. It is recomputed on every call. With the default
//! configuration only values above `mean + 2σ` are flagged: a drop in
//! consumption is not an anomaly. A constant reference window has σ = 0,
//! so any increase at all is flagged.

use crate::error::{AnalyticsError, Result};
use crate::sample::SeriesPoint;
use crate::stats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of reference points.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Default width of the normal band, in standard deviations.
pub const DEFAULT_SIGMA: f64 = 2.0;

/// Which side of the reference band is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeDirection {
    /// Only values above the upper limit
    #[default]
    Above,
    /// Values above the upper limit or below the lower limit
    Both,
}

/// Anomaly detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Number of points in the reference window.
    pub window_size: usize,
    /// Multiplier applied to the reference standard deviation.
    pub sigma_multiplier: f64,
    /// Sides of the band that count as anomalous.
    pub direction: SpikeDirection,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sigma_multiplier: DEFAULT_SIGMA,
            direction: SpikeDirection::Above,
        }
    }
}

impl AnomalyConfig {
    pub fn with_window(window_size: usize) -> Self {
        Self {
            window_size,
            ..Default::default()
        }
    }

    /// Points needed for one evaluation: the window plus the latest point.
    pub fn required_points(&self) -> usize {
        self.window_size.saturating_add(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "anomaly window_size must be at least 1".to_string(),
            ));
        }
        if !self.sigma_multiplier.is_finite() || self.sigma_multiplier < 0.0 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "sigma_multiplier must be a non-negative number, got {}",
                self.sigma_multiplier
            )));
        }
        Ok(())
    }
}

/// Outcome of checking the latest point against its reference window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub reference_mean: f64,
    /// Sample standard deviation (`n - 1` divisor) of the window
    pub reference_std_dev: f64,
    /// Upper limit, `mean + k·σ`
    pub limit: f64,
    /// Lower limit, only computed for [`SpikeDirection::Both`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<f64>,
    pub latest_timestamp: DateTime<Utc>,
    pub latest_value: f64,
    pub is_anomaly: bool,
}

impl AnomalyResult {
    /// Signed distance of the latest value from the reference mean.
    pub fn deviation(&self) -> f64 {
        self.latest_value - self.reference_mean
    }

    /// Deviation in standard deviations, `None` when σ = 0.
    pub fn z_score(&self) -> Option<f64> {
        if self.reference_std_dev > 0.0 {
            Some(self.deviation() / self.reference_std_dev)
        } else {
            None
        }
    }
}

/// Check whether the latest point is a spike above `mean + 2σ` of the
/// `window_size` points before it.
///
/// Needs at least `window_size + 1` points.
pub fn detect_anomaly<P: SeriesPoint>(points: &[P], window_size: usize) -> Result<AnomalyResult> {
    detect_anomaly_with(points, &AnomalyConfig::with_window(window_size))
}

/// Check the latest point with explicit settings.
pub fn detect_anomaly_with<P: SeriesPoint>(
    points: &[P],
    config: &AnomalyConfig,
) -> Result<AnomalyResult> {
    config.validate()?;

    let required = config.required_points();
    if points.len() < required {
        return Err(AnalyticsError::InsufficientData {
            required,
            actual: points.len(),
        });
    }

    let (history, latest) = points.split_at(points.len() - 1);
    let latest = &latest[0];
    let window: Vec<f64> = history[history.len() - config.window_size..]
        .iter()
        .map(SeriesPoint::value)
        .collect();

    let insufficient = || AnalyticsError::InsufficientData {
        required,
        actual: points.len(),
    };
    let reference_mean = stats::mean(&window).ok_or_else(insufficient)?;
    let reference_std_dev = stats::std_dev(&window).ok_or_else(insufficient)?;

    let band = config.sigma_multiplier * reference_std_dev;
    let limit = reference_mean + band;
    let lower_limit = match config.direction {
        SpikeDirection::Above => None,
        SpikeDirection::Both => Some(reference_mean - band),
    };

    let latest_value = latest.value();
    let is_anomaly = latest_value > limit || lower_limit.map_or(false, |low| latest_value < low);

    #[cfg(feature = "logging")]
    if is_anomaly {
        log::debug!(
            "spike at {}: {} outside [{:?}, {}]",
            latest.timestamp(),
            latest_value,
            lower_limit,
            limit
        );
    }

    Ok(AnomalyResult {
        reference_mean,
        reference_std_dev,
        limit,
        lower_limit,
        latest_timestamp: latest.timestamp(),
        latest_value,
        is_anomaly,
    })
}
