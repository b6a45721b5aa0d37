// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Resolution-aware aggregation
//!
//! [`aggregate`] reduces a time-ordered series to one point per calendar
//! bucket in a single linear pass, holding only the bucket currently being
//! filled besides the output list. Output size is bounded by the number of
//! buckets spanned, regardless of how many samples the caller supplies.

use crate::error::{AnalyticsError, Result};
use crate::resolution::Resolution;
use crate::sample::{Sample, SeriesPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bucket of an aggregated series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    /// Inclusive start of the bucket
    pub bucket_start: DateTime<Utc>,
    /// Folded value (sum or mean, see [`AggregationMode`])
    pub aggregate: f64,
    /// Number of raw samples folded into the bucket
    pub count: usize,
}

impl SeriesPoint for AggregatedPoint {
    fn timestamp(&self) -> DateTime<Utc> {
        self.bucket_start
    }

    fn value(&self) -> f64 {
        self.aggregate
    }
}

/// How samples inside one bucket are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Additive metrics such as consumption.
    #[default]
    Sum,
    /// Level metrics such as temperature.
    Mean,
}

impl std::str::FromStr for AggregationMode {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationMode::Sum),
            "mean" | "avg" | "average" => Ok(AggregationMode::Mean),
            other => Err(AnalyticsError::InvalidConfig(format!(
                "unknown aggregation mode '{}'",
                other
            ))),
        }
    }
}

/// Bucket currently being filled.
struct OpenBucket {
    start: DateTime<Utc>,
    sum: f64,
    count: usize,
}

impl OpenBucket {
    fn new(start: DateTime<Utc>, value: f64) -> Self {
        Self {
            start,
            sum: value,
            count: 1,
        }
    }

    fn close(self, mode: AggregationMode) -> AggregatedPoint {
        let aggregate = match mode {
            AggregationMode::Sum => self.sum,
            AggregationMode::Mean => self.sum / self.count as f64,
        };
        AggregatedPoint {
            bucket_start: self.start,
            aggregate,
            count: self.count,
        }
    }
}

/// Sum samples into calendar buckets.
///
/// Samples must be ordered by timestamp ascending; a timestamp strictly
/// smaller than its predecessor fails with [`AnalyticsError::InputOrder`].
/// [`Resolution::Raw`] maps each sample to its own point with `count = 1`.
pub fn aggregate(samples: &[Sample], resolution: Resolution) -> Result<Vec<AggregatedPoint>> {
    aggregate_with(samples, resolution, AggregationMode::Sum)
}

/// Aggregate with an explicit folding mode.
pub fn aggregate_with(
    samples: &[Sample],
    resolution: Resolution,
    mode: AggregationMode,
) -> Result<Vec<AggregatedPoint>> {
    let points = if resolution.is_raw() {
        passthrough(samples)?
    } else {
        bucketize(samples, resolution, mode)?
    };

    #[cfg(feature = "logging")]
    log::debug!(
        "aggregated {} samples into {} points at {} resolution",
        samples.len(),
        points.len(),
        resolution
    );

    Ok(points)
}

fn passthrough(samples: &[Sample]) -> Result<Vec<AggregatedPoint>> {
    let mut points = Vec::with_capacity(samples.len());
    let mut previous: Option<DateTime<Utc>> = None;

    for (index, sample) in samples.iter().enumerate() {
        check_step(index, previous, sample.timestamp)?;
        previous = Some(sample.timestamp);
        points.push(AggregatedPoint {
            bucket_start: sample.timestamp,
            aggregate: sample.value,
            count: 1,
        });
    }

    Ok(points)
}

fn bucketize(
    samples: &[Sample],
    resolution: Resolution,
    mode: AggregationMode,
) -> Result<Vec<AggregatedPoint>> {
    let mut points = Vec::new();
    let mut open: Option<OpenBucket> = None;
    let mut previous: Option<DateTime<Utc>> = None;

    for (index, sample) in samples.iter().enumerate() {
        check_step(index, previous, sample.timestamp)?;
        previous = Some(sample.timestamp);

        let start = resolution.truncate(sample.timestamp);
        if let Some(bucket) = open.as_mut() {
            if bucket.start == start {
                bucket.sum += sample.value;
                bucket.count += 1;
                continue;
            }
        }

        // Ordered input means a new start always closes the previous bucket
        if let Some(done) = open.replace(OpenBucket::new(start, sample.value)) {
            points.push(done.close(mode));
        }
    }

    if let Some(done) = open {
        points.push(done.close(mode));
    }

    Ok(points)
}

fn check_step(index: usize, previous: Option<DateTime<Utc>>, found: DateTime<Utc>) -> Result<()> {
    match previous {
        Some(previous) if found < previous => Err(AnalyticsError::InputOrder {
            index,
            previous,
            found,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts(mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, mo, d, h, 0, 0).unwrap()
    }

    fn sample(mo: u32, d: u32, h: u32, value: f64) -> Sample {
        Sample::new(ts(mo, d, h), value)
    }

    #[test]
    fn test_empty_input() {
        for resolution in Resolution::ALL {
            assert!(aggregate(&[], resolution).unwrap().is_empty());
        }
    }

    #[test]
    fn test_raw_is_identity() {
        let samples = vec![
            sample(1, 1, 0, 1.5),
            sample(1, 1, 0, 2.5),
            sample(1, 2, 3, 4.0),
        ];
        let points = aggregate(&samples, Resolution::Raw).unwrap();

        assert_eq!(points.len(), samples.len());
        for (point, sample) in points.iter().zip(&samples) {
            assert_eq!(point.bucket_start, sample.timestamp);
            assert_eq!(point.aggregate, sample.value);
            assert_eq!(point.count, 1);
        }
    }

    #[test]
    fn test_day_buckets_sum() {
        let samples = vec![
            sample(1, 1, 0, 1.0),
            sample(1, 1, 12, 2.0),
            sample(1, 1, 23, 3.0),
            sample(1, 2, 6, 10.0),
            sample(1, 4, 1, 5.0),
            sample(1, 4, 2, 5.0),
        ];
        let points = aggregate(&samples, Resolution::Day).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].bucket_start, ts(1, 1, 0));
        assert_relative_eq!(points[0].aggregate, 6.0);
        assert_eq!(points[0].count, 3);
        assert_eq!(points[1].bucket_start, ts(1, 2, 0));
        assert_eq!(points[1].count, 1);
        // No bucket is emitted for the empty 3rd
        assert_eq!(points[2].bucket_start, ts(1, 4, 0));
        assert_relative_eq!(points[2].aggregate, 10.0);
    }

    #[test]
    fn test_month_buckets() {
        let samples = vec![
            sample(1, 3, 0, 100.0),
            sample(1, 31, 23, 50.0),
            sample(2, 1, 0, 70.0),
            sample(2, 29, 0, 30.0),
            sample(3, 15, 0, 20.0),
        ];
        let points = aggregate(&samples, Resolution::Month).unwrap();

        let summary: Vec<_> = points.iter().map(|p| (p.aggregate, p.count)).collect();
        assert_eq!(summary, vec![(150.0, 2), (100.0, 2), (20.0, 1)]);
        assert_eq!(points[1].bucket_start, ts(2, 1, 0));
    }

    #[test]
    fn test_duplicate_timestamps_stay_independent() {
        let samples = vec![sample(1, 1, 5, 1.0), sample(1, 1, 5, 1.0)];
        let points = aggregate(&samples, Resolution::Day).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].count, 2);
        assert_relative_eq!(points[0].aggregate, 2.0);
    }

    #[test]
    fn test_mean_mode() {
        let samples = vec![
            sample(1, 1, 0, 18.0),
            sample(1, 1, 12, 22.0),
            sample(1, 2, 0, 19.0),
        ];
        let points = aggregate_with(&samples, Resolution::Day, AggregationMode::Mean).unwrap();
        assert_relative_eq!(points[0].aggregate, 20.0);
        assert_eq!(points[0].count, 2);
        assert_relative_eq!(points[1].aggregate, 19.0);
    }

    #[test]
    fn test_out_of_order_is_rejected() {
        let samples = vec![
            sample(1, 1, 0, 1.0),
            sample(1, 3, 0, 1.0),
            sample(1, 2, 0, 1.0),
        ];
        for resolution in [Resolution::Raw, Resolution::Day, Resolution::Month] {
            let err = aggregate(&samples, resolution).unwrap_err();
            assert_eq!(
                err,
                AnalyticsError::InputOrder {
                    index: 2,
                    previous: ts(1, 3, 0),
                    found: ts(1, 2, 0),
                }
            );
        }
    }

    #[test]
    fn test_out_of_order_within_same_bucket_is_rejected() {
        // Same day, so bucketing alone would not notice
        let samples = vec![sample(1, 1, 10, 1.0), sample(1, 1, 9, 1.0)];
        assert!(matches!(
            aggregate(&samples, Resolution::Day),
            Err(AnalyticsError::InputOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_aggregation_mode_parse() {
        assert_eq!("sum".parse::<AggregationMode>().unwrap(), AggregationMode::Sum);
        assert_eq!("AVG".parse::<AggregationMode>().unwrap(), AggregationMode::Mean);
        assert!(matches!(
            "median".parse::<AggregationMode>(),
            Err(AnalyticsError::InvalidConfig(_))
        ));
    }
}
