// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Linear trend fitting and classification.
//!
//! The classification threshold is expressed in the caller's y units per
//! x unit. [`day_offsets`] produces x values in days so that a series of
//! daily consumption totals is classified in units per day.

use crate::error::{AnalyticsError, Result};
use crate::sample::SeriesPoint;
use crate::stats::{LinearFit, RegressionSums};
use serde::{Deserialize, Serialize};

/// Slope magnitude above which a series is no longer considered stable.
pub const SLOPE_THRESHOLD: f64 = 0.01;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendClass {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendClass {
    /// Classify a slope against [`SLOPE_THRESHOLD`].
    pub fn from_slope(slope: f64) -> Self {
        if slope > SLOPE_THRESHOLD {
            TrendClass::Increasing
        } else if slope < -SLOPE_THRESHOLD {
            TrendClass::Decreasing
        } else {
            TrendClass::Stable
        }
    }
}

impl std::fmt::Display for TrendClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendClass::Increasing => write!(f, "increasing"),
            TrendClass::Decreasing => write!(f, "decreasing"),
            TrendClass::Stable => write!(f, "stable"),
        }
    }
}

/// Least-squares line with goodness of fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, in `[0, 1]`
    pub r_squared: f64,
    pub classification: TrendClass,
}

impl TrendResult {
    /// Value of the fitted line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `y = slope * x + intercept` by ordinary least squares.
///
/// Fails with [`AnalyticsError::InsufficientData`] below two points and
/// with [`AnalyticsError::DegenerateInput`] when every x is identical.
/// A series with identical y values is a perfect flat fit: slope 0 and
/// `r_squared` 1.
pub fn fit_trend(points: &[(f64, f64)]) -> Result<TrendResult> {
    if points.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            required: 2,
            actual: points.len(),
        });
    }

    let (first_x, first_y) = points[0];
    if points.iter().all(|&(x, _)| x == first_x) {
        return Err(AnalyticsError::DegenerateInput {
            x: first_x,
            count: points.len(),
        });
    }

    if points.iter().all(|&(_, y)| y == first_y) {
        return Ok(TrendResult {
            slope: 0.0,
            intercept: first_y,
            r_squared: 1.0,
            classification: TrendClass::Stable,
        });
    }

    let sums = RegressionSums::from_points(points);
    let fit = sums.fit().ok_or(AnalyticsError::DegenerateInput {
        x: first_x,
        count: points.len(),
    })?;

    let r_squared = coefficient_of_determination(points, &fit, sums.sum_y / sums.n as f64);

    Ok(TrendResult {
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared,
        classification: TrendClass::from_slope(fit.slope),
    })
}

fn coefficient_of_determination(points: &[(f64, f64)], fit: &LinearFit, mean_y: f64) -> f64 {
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for &(x, y) in points {
        ss_res += (y - fit.predict(x)).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    if ss_tot == 0.0 {
        return 1.0;
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Convert a time series to `(days since first point, value)` pairs.
pub fn day_offsets<P: SeriesPoint>(points: &[P]) -> Vec<(f64, f64)> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let origin = first.timestamp();
    points
        .iter()
        .map(|p| {
            let elapsed = p.timestamp() - origin;
            let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
            (seconds / SECONDS_PER_DAY, p.value())
        })
        .collect()
}
