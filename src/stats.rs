// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shared statistics primitives.
//!
//! Variance and standard deviation use the `n - 1` (sample) divisor
//! throughout. Empty input yields `None` rather than NaN.

/// Sum of all values (0.0 for an empty slice).
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(sum(values) / values.len() as f64)
}

/// Sample variance (`n - 1` divisor). A single value has zero variance.
pub fn variance(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (values.len() - 1) as f64)
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Slope and intercept of a fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Accumulated sums for the least-squares normal equations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegressionSums {
    pub n: usize,
    pub sum_x: f64,
    pub sum_y: f64,
    pub sum_xy: f64,
    pub sum_xx: f64,
}

impl RegressionSums {
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let mut sums = Self::default();
        for &(x, y) in points {
            sums.add(x, y);
        }
        sums
    }

    pub fn add(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xy += x * y;
        self.sum_xx += x * x;
    }

    /// `n * Σx² - (Σx)²`, zero when every x is equal.
    pub fn denominator(&self) -> f64 {
        let n = self.n as f64;
        n * self.sum_xx - self.sum_x * self.sum_x
    }

    /// Closed-form ordinary least squares.
    ///
    /// `None` with fewer than two points or a non-positive denominator.
    pub fn fit(&self) -> Option<LinearFit> {
        if self.n < 2 {
            return None;
        }
        let denominator = self.denominator();
        if denominator <= 0.0 || !denominator.is_finite() {
            return None;
        }
        let n = self.n as f64;
        let slope = (n * self.sum_xy - self.sum_x * self.sum_y) / denominator;
        let intercept = (self.sum_y - slope * self.sum_x) / n;
        Some(LinearFit { slope, intercept })
    }
}

/// Ordinary least squares over `(x, y)` points.
pub fn least_squares(points: &[(f64, f64)]) -> Option<LinearFit> {
    RegressionSums::from_points(points).fit()
}
