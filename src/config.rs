// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Analytics configuration.
//!
//! Defaults encode consumption semantics: buckets are summed and only
//! spikes above the reference band are flagged. A level metric such as
//! temperature would use [`AggregationMode::Mean`] and
//! [`SpikeDirection::Both`].

use crate::aggregate::AggregationMode;
use crate::anomaly::{AnomalyConfig, SpikeDirection};
use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};

/// Master configuration for a series analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Folding applied inside each bucket.
    pub aggregation: AggregationMode,

    /// Spike detection settings.
    pub anomaly: AnomalyConfig,
}

impl AnalyticsConfig {
    /// Settings for a level metric: averaged buckets, two-sided checks.
    pub fn level_metric() -> Self {
        Self {
            aggregation: AggregationMode::Mean,
            anomaly: AnomalyConfig {
                direction: SpikeDirection::Both,
                ..Default::default()
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.anomaly.validate()
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnalyticsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnalyticsError::InvalidConfig(e.to_string()))
    }
}
