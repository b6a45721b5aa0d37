//! Stress tests for meterstat
//!
//! Run with: cargo test --release stress -- --ignored

use chrono::{Duration, TimeZone, Utc};
use meterstat::*;
use std::time::Instant;

fn minute_series(count: usize) -> Vec<Sample> {
    let origin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let value = 0.2 + (i as f64 * 0.01).sin().abs();
            Sample::new(origin + Duration::minutes(i as i64), value)
        })
        .collect()
}

#[test]
#[ignore] // Run manually with --ignored
fn stress_test_aggregation() {
    // Roughly five years of per-minute readings
    let samples = minute_series(2_600_000);

    let start = Instant::now();
    let daily = aggregate(&samples, Resolution::Day).unwrap();
    let elapsed = start.elapsed();
    let rate = samples.len() as f64 / elapsed.as_secs_f64();

    println!(
        "Aggregated {} samples into {} days in {:?}",
        samples.len(),
        daily.len(),
        elapsed
    );
    println!("Rate: {:.0} samples/second", rate);

    assert!(daily.len() < 2_000);
    assert!(
        rate > 1_000_000.0,
        "Should aggregate at least 1M samples/s, got {:.0}",
        rate
    );
}

#[test]
#[ignore]
fn stress_test_trend_fit() {
    let points: Vec<_> = (0..1_000_000)
        .map(|i| (i as f64, 3.0 * i as f64 + (i as f64).sin()))
        .collect();

    let start = Instant::now();
    let result = fit_trend(&points).unwrap();
    let elapsed = start.elapsed();

    println!("Fitted {} points in {:?}", points.len(), elapsed);

    assert!((result.slope - 3.0).abs() < 1e-3);
    assert_eq!(result.classification, TrendClass::Increasing);
}

#[test]
#[ignore]
fn stress_test_repeated_reports() {
    let samples = minute_series(100_000);
    let config = AnalyticsConfig::default();

    let iterations = 200;
    let start = Instant::now();

    for i in 0..iterations {
        let resolution = Resolution::ALL[1 + i % (Resolution::ALL.len() - 1)];
        let report = analyze(&samples, resolution, &config).unwrap();
        assert_eq!(report.sample_count, samples.len());
    }

    let elapsed = start.elapsed();
    println!("{} reports over {} samples in {:?}", iterations, samples.len(), elapsed);
}
