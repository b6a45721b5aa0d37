// Meterstat - Consumption series analytics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Calendar resolutions and their bucketing functions.
//!
//! A bucket is the half-open interval `[start, end)` obtained by truncating
//! a timestamp to a UTC calendar boundary. Weeks start on Monday (ISO 8601).

use crate::error::ParseResolutionError;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested time-bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// No bucketing: every sample is its own point.
    #[default]
    Raw,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Resolution {
    /// All resolutions, finest first.
    pub const ALL: [Resolution; 6] = [
        Resolution::Raw,
        Resolution::Hour,
        Resolution::Day,
        Resolution::Week,
        Resolution::Month,
        Resolution::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Raw => "raw",
            Resolution::Hour => "hour",
            Resolution::Day => "day",
            Resolution::Week => "week",
            Resolution::Month => "month",
            Resolution::Year => "year",
        }
    }

    /// Whether samples are grouped at all.
    pub fn is_raw(&self) -> bool {
        matches!(self, Resolution::Raw)
    }

    /// Start of the bucket containing `ts`. Identity for [`Resolution::Raw`].
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        match self {
            Resolution::Raw => ts,
            Resolution::Hour => {
                let hour = midnight(date) + Duration::hours(i64::from(ts.hour()));
                Utc.from_utc_datetime(&hour)
            }
            Resolution::Day => Utc.from_utc_datetime(&midnight(date)),
            Resolution::Week => {
                let back = i64::from(date.weekday().num_days_from_monday());
                Utc.from_utc_datetime(&midnight(date - Duration::days(back)))
            }
            Resolution::Month => {
                let back = i64::from(date.day0());
                Utc.from_utc_datetime(&midnight(date - Duration::days(back)))
            }
            Resolution::Year => {
                let back = i64::from(date.ordinal0());
                Utc.from_utc_datetime(&midnight(date - Duration::days(back)))
            }
        }
    }

    /// Exclusive end of the bucket starting at `start`.
    ///
    /// `None` for [`Resolution::Raw`], which has no interval, and when the
    /// end would fall outside chrono's representable range.
    pub fn bucket_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = self.truncate(start);
        match self {
            Resolution::Raw => None,
            Resolution::Hour => start.checked_add_signed(Duration::hours(1)),
            Resolution::Day => start.checked_add_signed(Duration::days(1)),
            Resolution::Week => start.checked_add_signed(Duration::days(7)),
            Resolution::Month => start.checked_add_months(Months::new(1)),
            Resolution::Year => start.checked_add_months(Months::new(12)),
        }
    }

    /// Whether `ts` falls in the bucket starting at `bucket_start`.
    pub fn contains(&self, bucket_start: DateTime<Utc>, ts: DateTime<Utc>) -> bool {
        self.truncate(ts) == bucket_start
    }
}

fn midnight(date: NaiveDate) -> chrono::NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Resolution::Raw),
            "hour" => Ok(Resolution::Hour),
            "day" => Ok(Resolution::Day),
            "week" => Ok(Resolution::Week),
            "month" => Ok(Resolution::Month),
            "year" => Ok(Resolution::Year),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}
