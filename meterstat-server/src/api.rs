// Meterstat Server - HTTP routes
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP routes over the series store and the analytics core.
//!
//! Handlers only parse the request, read an ordered range from the store,
//! call one of the pure meterstat functions and serialize its result.

use crate::error::{ApiError, Result};
use crate::metrics::{
    encode_metrics, record_ingest, record_request, record_scan, record_spike,
    update_series_count,
};
use crate::store::{SeriesInfo, SeriesStore, TimeRange};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use meterstat::{
    aggregate_with, analyze, day_offsets, detect_anomaly_with, fit_trend, AggregatedPoint,
    AggregationMode, AnalyticsConfig, AnomalyResult, Resolution, Sample, SeriesReport,
    TrendResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers.
pub struct AppState {
    pub store: Arc<dyn SeriesStore>,
    /// Defaults applied when a request does not override them
    pub config: AnalyticsConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn SeriesStore>, config: AnalyticsConfig) -> Self {
        Self {
            store,
            config,
            start_time: Instant::now(),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .route("/series", get(list_series))
        .route("/series/:entity", get(series_points))
        .route("/series/:entity/samples", post(ingest_samples))
        .route("/series/:entity/trend", get(series_trend))
        .route("/series/:entity/anomaly", get(series_anomaly))
        .route("/series/:entity/report", get(series_report))
        .route("/series/:entity/export.csv", get(export_csv))
        .with_state(state)
}

/// Query parameters shared by the series endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SeriesQuery {
    /// raw, hour, day, week, month or year (default: day)
    pub resolution: Option<String>,
    /// RFC 3339 inclusive lower bound
    pub from: Option<String>,
    /// RFC 3339 exclusive upper bound
    pub to: Option<String>,
    /// sum or mean
    pub mode: Option<String>,
    /// Reference window size for spike checks
    pub window: Option<usize>,
}

impl SeriesQuery {
    fn resolution(&self) -> Result<Resolution> {
        match self.resolution.as_deref() {
            Some(name) => Ok(name.parse()?),
            None => Ok(Resolution::Day),
        }
    }

    fn range(&self) -> Result<TimeRange> {
        Ok(TimeRange::new(
            parse_bound("from", self.from.as_deref())?,
            parse_bound("to", self.to.as_deref())?,
        ))
    }

    /// Server defaults overridden by `mode` and `window`.
    fn config(&self, defaults: &AnalyticsConfig) -> Result<AnalyticsConfig> {
        let mut config = defaults.clone();
        if let Some(mode) = self.mode.as_deref() {
            config.aggregation = mode.parse::<AggregationMode>()?;
        }
        if let Some(window) = self.window {
            config.anomaly.window_size = window;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| ApiError::BadRequest(format!("invalid '{}' timestamp: {}", name, e)))
        })
        .transpose()
}

/// Read the requested range of a series.
async fn load_range(state: &AppState, entity: &str, query: &SeriesQuery) -> Result<Vec<Sample>> {
    let range = query.range()?;
    let samples = state
        .store
        .range(entity, range)
        .await
        .ok_or_else(|| ApiError::UnknownSeries(entity.to_string()))?;
    record_scan(samples.len());
    Ok(samples)
}

/// Aggregated points response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResponse {
    pub entity: String,
    pub resolution: Resolution,
    pub aggregation: AggregationMode,
    pub sample_count: usize,
    pub points: Vec<AggregatedPoint>,
}

/// Trend response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrendResponse {
    pub entity: String,
    pub resolution: Resolution,
    /// Aggregated points the line was fitted on
    pub point_count: usize,
    /// Unit of the slope: value per day
    pub trend: TrendResult,
}

/// Spike check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnomalyResponse {
    pub entity: String,
    pub resolution: Resolution,
    pub window_size: usize,
    pub anomaly: AnomalyResult,
}

/// Ingest response.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub entity: String,
    pub accepted: usize,
    pub total: usize,
}

async fn list_series(State(state): State<Arc<AppState>>) -> Json<Vec<SeriesInfo>> {
    record_request("list");
    Json(state.store.series().await)
}

async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Json(samples): Json<Vec<Sample>>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    record_request("ingest");
    if let Some(bad) = samples.iter().find(|s| !s.value.is_finite()) {
        return Err(ApiError::BadRequest(format!(
            "non-finite value at {}",
            bad.timestamp
        )));
    }

    let accepted = samples.len();
    let total = state.store.append(&entity, samples).await;
    record_ingest(accepted);
    update_series_count(state.store.series().await.len());
    tracing::debug!("Appended {} samples to {} ({} total)", accepted, entity, total);

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            entity,
            accepted,
            total,
        }),
    ))
}

async fn series_points(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<PointsResponse>> {
    record_request("points");
    let resolution = query.resolution()?;
    let config = query.config(&state.config)?;
    let samples = load_range(&state, &entity, &query).await?;
    let points = aggregate_with(&samples, resolution, config.aggregation)?;

    Ok(Json(PointsResponse {
        entity,
        resolution,
        aggregation: config.aggregation,
        sample_count: samples.len(),
        points,
    }))
}

async fn series_trend(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<TrendResponse>> {
    record_request("trend");
    let resolution = query.resolution()?;
    let config = query.config(&state.config)?;
    let samples = load_range(&state, &entity, &query).await?;
    let points = aggregate_with(&samples, resolution, config.aggregation)?;
    let trend = fit_trend(&day_offsets(&points))?;

    Ok(Json(TrendResponse {
        entity,
        resolution,
        point_count: points.len(),
        trend,
    }))
}

async fn series_anomaly(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<AnomalyResponse>> {
    record_request("anomaly");
    let resolution = query.resolution()?;
    let config = query.config(&state.config)?;
    let samples = load_range(&state, &entity, &query).await?;
    let points = aggregate_with(&samples, resolution, config.aggregation)?;
    let anomaly = detect_anomaly_with(&points, &config.anomaly)?;

    if anomaly.is_anomaly {
        record_spike();
        tracing::info!(
            "Spike on {}: {} exceeds limit {:.3}",
            entity,
            anomaly.latest_value,
            anomaly.limit
        );
    }

    Ok(Json(AnomalyResponse {
        entity,
        resolution,
        window_size: config.anomaly.window_size,
        anomaly,
    }))
}

async fn series_report(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<SeriesReport>> {
    record_request("report");
    let resolution = query.resolution()?;
    let config = query.config(&state.config)?;
    let samples = load_range(&state, &entity, &query).await?;
    let report = analyze(&samples, resolution, &config)?;
    if report.has_spike() {
        record_spike();
    }
    Ok(Json(report))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Response> {
    record_request("export");
    let resolution = query.resolution()?;
    let config = query.config(&state.config)?;
    let samples = load_range(&state, &entity, &query).await?;
    let points = aggregate_with(&samples, resolution, config.aggregation)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for point in &points {
        writer.serialize(point)?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| ApiError::Csv(e.into_error().into()))?;

    let disposition = format!("attachment; filename=\"{}-{}.csv\"", entity, resolution);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Meterstat</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Meterstat</h1>
    <p>Consumption series aggregation, trend and spike detection.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/series">/series</a> - Stored series</div>
        <div class="endpoint"><code>GET /series/{entity}?resolution=day&amp;from=&amp;to=</code> - Aggregated points</div>
        <div class="endpoint"><code>POST /series/{entity}/samples</code> - Append samples</div>
        <div class="endpoint"><code>GET /series/{entity}/trend</code> - Linear trend</div>
        <div class="endpoint"><code>GET /series/{entity}/anomaly?window=5</code> - Spike check on the latest point</div>
        <div class="endpoint"><code>GET /series/{entity}/report</code> - Points, trend and spike check</div>
        <div class="endpoint"><code>GET /series/{entity}/export.csv</code> - Aggregated points as CSV</div>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/status">/status</a> - Status information (JSON)</div>
    </div>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    core_version: &'static str,
    uptime_secs: u64,
    series: usize,
    samples: usize,
    config: AnalyticsConfig,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let series = state.store.series().await;
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        core_version: meterstat::VERSION,
        uptime_secs: state.start_time.elapsed().as_secs(),
        series: series.len(),
        samples: series.iter().map(|s| s.samples).sum(),
        config: state.config.clone(),
    })
}
