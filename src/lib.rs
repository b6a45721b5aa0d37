//! # Meterstat - Consumption series analytics
//!
//! Pure, stateless analytics over time-stamped metered readings.
//!
//! ## Key Features
//!
//! - **Resolution-aware aggregation**: Reduce any number of samples to one
//!   point per hour, day, week, month or year in a single linear pass
//! - **Trend regression**: Least-squares slope with r² and a
//!   rising / falling / stable classification
//! - **Spike detection**: Flag the latest reading when it exceeds
//!   `mean + 2σ` of a trailing reference window
//!
//! Nothing here performs I/O or keeps state between calls; every function
//! borrows its input and returns newly allocated results.
//!
//! ## Quick Start
//!
//! ```rust
//! use meterstat::{aggregate, detect_anomaly, fit_trend, day_offsets, Resolution, Sample};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let samples: Vec<Sample> = (0..7 * 24)
//!     .map(|h| Sample::new(origin + Duration::hours(h), 0.5))
//!     .collect();
//!
//! // One point per day, each summing 24 half-unit readings
//! let daily = aggregate(&samples, Resolution::Day).unwrap();
//! assert_eq!(daily.len(), 7);
//! assert!((daily[0].aggregate - 12.0).abs() < 1e-9);
//!
//! // Flat consumption: stable trend, no spike
//! let trend = fit_trend(&day_offsets(&daily)).unwrap();
//! assert_eq!(trend.classification, meterstat::TrendClass::Stable);
//!
//! let check = detect_anomaly(&daily, 5).unwrap();
//! assert!(!check.is_anomaly);
//! ```
//!
//! ## Modules
//!
//! - [`sample`]: Readings and the [`SeriesPoint`] accessor trait
//! - [`resolution`]: Calendar bucketing
//! - [`aggregate`]: Bucketed sums (or means)
//! - [`stats`]: Mean, variance, least squares
//! - [`trend`]: Linear trend fitting
//! - [`anomaly`]: Latest-point spike detection
//! - [`config`]: Serializable analysis settings
//! - [`report`]: All of the above in one call

// Modules
pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod report;
pub mod resolution;
pub mod sample;
pub mod stats;
pub mod trend;

// Re-exports for convenient access
pub use aggregate::{aggregate, aggregate_with, AggregatedPoint, AggregationMode};
pub use anomaly::{
    detect_anomaly, detect_anomaly_with, AnomalyConfig, AnomalyResult, SpikeDirection,
    DEFAULT_SIGMA, DEFAULT_WINDOW_SIZE,
};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, ErrorKind, ParseResolutionError, Result};
pub use report::{analyze, Analysis, SeriesReport};
pub use resolution::Resolution;
pub use sample::{check_order, Sample, SeriesPoint};
pub use trend::{day_offsets, fit_trend, TrendClass, TrendResult, SLOPE_THRESHOLD};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
