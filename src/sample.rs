// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Time-stamped readings and the accessor trait shared by raw and
//! aggregated series.

use crate::error::{AnalyticsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metered reading.
///
/// Duplicate timestamps are independent observations and are never merged
/// implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Anything that can be read as a `(timestamp, value)` pair.
pub trait SeriesPoint {
    fn timestamp(&self) -> DateTime<Utc>;
    fn value(&self) -> f64;
}

impl SeriesPoint for Sample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.value
    }
}

impl SeriesPoint for (DateTime<Utc>, f64) {
    fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    fn value(&self) -> f64 {
        self.1
    }
}

/// Verify that timestamps never decrease.
///
/// Equal timestamps pass; the first strict decrease is reported with its
/// index and both timestamps.
pub fn check_order<P: SeriesPoint>(points: &[P]) -> Result<()> {
    for (index, pair) in points.windows(2).enumerate() {
        let previous = pair[0].timestamp();
        let found = pair[1].timestamp();
        if found < previous {
            return Err(AnalyticsError::InputOrder {
                index: index + 1,
                previous,
                found,
            });
        }
    }
    Ok(())
}
