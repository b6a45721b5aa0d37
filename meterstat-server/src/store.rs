// Meterstat Server - Series store
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! In-memory series store and CSV import.
//!
//! Every series is kept sorted by timestamp so that range queries hand the
//! analytics core an ordered slice. Samples sharing a timestamp are kept
//! side by side in arrival order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meterstat::Sample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Half-open time range `[from, to)`. Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if to <= from)
    }
}

/// Summary of one stored series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesInfo {
    pub entity: String,
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<DateTime<Utc>>,
}

/// Ordered sample storage keyed by entity.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Append samples, keeping the series ordered. Returns the new length.
    async fn append(&self, entity: &str, samples: Vec<Sample>) -> usize;

    /// Samples of `entity` inside `range`, ascending. `None` if unknown.
    async fn range(&self, entity: &str, range: TimeRange) -> Option<Vec<Sample>>;

    /// All stored series, sorted by entity name.
    async fn series(&self) -> Vec<SeriesInfo>;
}

/// Series held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<String, Vec<Sample>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Insert keeping ascending order; equal timestamps go after existing ones.
fn insert_ordered(series: &mut Vec<Sample>, sample: Sample) {
    match series.last() {
        Some(last) if sample.timestamp < last.timestamp => {
            let at = series.partition_point(|s| s.timestamp <= sample.timestamp);
            series.insert(at, sample);
        }
        _ => series.push(sample),
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn append(&self, entity: &str, mut samples: Vec<Sample>) -> usize {
        samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let mut series = self.series.write().await;
        let entry = series.entry(entity.to_string()).or_default();
        entry.reserve(samples.len());
        for sample in samples {
            insert_ordered(entry, sample);
        }
        entry.len()
    }

    async fn range(&self, entity: &str, range: TimeRange) -> Option<Vec<Sample>> {
        let series = self.series.read().await;
        let samples = series.get(entity)?;
        if range.is_empty() {
            return Some(Vec::new());
        }

        let start = range
            .from
            .map_or(0, |from| samples.partition_point(|s| s.timestamp < from));
        let end = range
            .to
            .map_or(samples.len(), |to| samples.partition_point(|s| s.timestamp < to));
        Some(samples[start..end.max(start)].to_vec())
    }

    async fn series(&self) -> Vec<SeriesInfo> {
        let series = self.series.read().await;
        let mut infos: Vec<SeriesInfo> = series
            .iter()
            .map(|(entity, samples)| SeriesInfo {
                entity: entity.clone(),
                samples: samples.len(),
                first: samples.first().map(|s| s.timestamp),
                last: samples.last().map(|s| s.timestamp),
            })
            .collect();
        infos.sort_by(|a, b| a.entity.cmp(&b.entity));
        infos
    }
}

/// Errors while importing a CSV dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty dataset")]
    EmptyDataset,
}

/// One row of an import file: `entity,timestamp,value`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    entity: String,
    timestamp: DateTime<Utc>,
    value: f64,
}

/// Import totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub series: usize,
    pub samples: usize,
}

/// Load an `entity,timestamp,value` CSV file (RFC 3339 timestamps).
pub async fn load_csv<S: SeriesStore + ?Sized>(
    store: &S,
    path: &Path,
) -> Result<LoadSummary, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    load_reader(store, reader).await
}

async fn load_reader<S, R>(store: &S, mut reader: csv::Reader<R>) -> Result<LoadSummary, LoadError>
where
    S: SeriesStore + ?Sized,
    R: std::io::Read,
{
    let mut grouped: HashMap<String, Vec<Sample>> = HashMap::new();
    let mut samples = 0;
    for row in reader.deserialize::<CsvRow>() {
        let row = row?;
        grouped
            .entry(row.entity)
            .or_default()
            .push(Sample::new(row.timestamp, row.value));
        samples += 1;
    }

    if samples == 0 {
        return Err(LoadError::EmptyDataset);
    }

    let series = grouped.len();
    for (entity, batch) in grouped {
        debug!("Importing {} samples for {}", batch.len(), entity);
        store.append(&entity, batch).await;
    }

    info!("Imported {} samples across {} series", samples, series);
    Ok(LoadSummary { series, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::io::Write;

    fn at(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    #[tokio::test]
    async fn test_append_keeps_order() {
        let store = MemoryStore::new();
        store
            .append("m1", vec![Sample::new(at(5), 5.0), Sample::new(at(1), 1.0)])
            .await;
        store
            .append("m1", vec![Sample::new(at(3), 3.0), Sample::new(at(9), 9.0)])
            .await;

        let samples = store.range("m1", TimeRange::default()).await.unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 3.0, 5.0, 9.0]);
    }

    #[tokio::test]
    async fn test_duplicates_kept_in_arrival_order() {
        let store = MemoryStore::new();
        store.append("m1", vec![Sample::new(at(2), 1.0)]).await;
        store.append("m1", vec![Sample::new(at(4), 9.0)]).await;
        store.append("m1", vec![Sample::new(at(2), 2.0)]).await;

        let samples = store.range("m1", TimeRange::default()).await.unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 9.0]);
    }

    #[tokio::test]
    async fn test_range_is_half_open() {
        let store = MemoryStore::new();
        let batch = (0..10).map(|h| Sample::new(at(h), h as f64)).collect();
        store.append("m1", batch).await;

        let samples = store
            .range("m1", TimeRange::new(Some(at(2)), Some(at(5))))
            .await
            .unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);

        let inverted = store
            .range("m1", TimeRange::new(Some(at(5)), Some(at(2))))
            .await
            .unwrap();
        assert!(inverted.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_entity() {
        let store = MemoryStore::new();
        assert!(store.range("nope", TimeRange::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_series_listing() {
        let store = MemoryStore::new();
        store.append("b", vec![Sample::new(at(1), 1.0)]).await;
        store
            .append("a", vec![Sample::new(at(0), 1.0), Sample::new(at(3), 1.0)])
            .await;

        let infos = store.series().await;
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].entity, "a");
        assert_eq!(infos[0].samples, 2);
        assert_eq!(infos[0].last, Some(at(3)));
        assert_eq!(infos[1].entity, "b");
    }

    #[tokio::test]
    async fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entity,timestamp,value").unwrap();
        writeln!(file, "house-1,2024-04-01T02:00:00Z,1.5").unwrap();
        writeln!(file, "house-1,2024-04-01T01:00:00Z,0.5").unwrap();
        writeln!(file, "house-2, 2024-04-01T00:00:00Z ,3").unwrap();
        file.flush().unwrap();

        let store = MemoryStore::new();
        let summary = load_csv(&store, file.path()).await.unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                series: 2,
                samples: 3
            }
        );

        let house = store.range("house-1", TimeRange::default()).await.unwrap();
        assert_eq!(house[0].value, 0.5);
        assert_eq!(house[1].value, 1.5);
    }

    #[tokio::test]
    async fn test_load_csv_errors() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_csv(&store, Path::new("/nonexistent/readings.csv")).await,
            Err(LoadError::FileNotFound(_))
        ));

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        writeln!(empty, "entity,timestamp,value").unwrap();
        empty.flush().unwrap();
        assert!(matches!(
            load_csv(&store, empty.path()).await,
            Err(LoadError::EmptyDataset)
        ));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "entity,timestamp,value").unwrap();
        writeln!(bad, "house-1,yesterday,1.0").unwrap();
        bad.flush().unwrap();
        assert!(matches!(
            load_csv(&store, bad.path()).await,
            Err(LoadError::Csv(_))
        ));
    }
}
