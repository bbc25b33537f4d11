// SPDX-License-Identifier: MIT

//! Run (activity) model and the SmashRun payload it is decoded from.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

const KM_PER_MILE: f64 = 1.609_344;

/// Activity payload as returned by the SmashRun activities API.
///
/// The serde renames are the full mapping table from the provider's
/// camelCase keys to our fields: required fields fail the decode when
/// missing, optional ones default to `None`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderActivity {
    pub activity_id: i64,
    pub start_date_time_local: String,
    /// Distance in kilometers.
    pub distance: f64,
    /// Elapsed time in seconds.
    pub duration: f64,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub heart_rate_average: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Stored run record in the `runs` table, keyed by the provider's stable
/// activity id so re-syncs replace rather than duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Run {
    pub activity_id: i64,
    /// Wall-clock start time as recorded by the runner's device.
    pub start_date_time_local: NaiveDateTime,
    #[validate(range(min = 0.0))]
    pub distance_miles: f64,
    #[validate(range(min = 0.0))]
    pub duration_seconds: f64,
    pub activity_type: Option<String>,
    pub calories: Option<f64>,
    pub heart_rate_average: Option<f64>,
    pub notes: Option<String>,
    pub source: String,
}

impl Run {
    /// Decode a provider payload into a stored run.
    pub fn from_provider(payload: &ProviderActivity) -> Result<Self, AppError> {
        let start = parse_local_start(&payload.start_date_time_local).map_err(|e| {
            AppError::SmashrunApi(format!(
                "Invalid startDateTimeLocal for activity {}: {}",
                payload.activity_id, e
            ))
        })?;

        let run = Run {
            activity_id: payload.activity_id,
            start_date_time_local: start,
            distance_miles: payload.distance / KM_PER_MILE,
            duration_seconds: payload.duration,
            activity_type: payload.activity_type.clone(),
            calories: payload.calories,
            heart_rate_average: payload.heart_rate_average,
            notes: payload.notes.clone(),
            source: super::source::DEFAULT_SOURCE_TYPE.to_string(),
        };

        run.validate().map_err(|e| {
            AppError::SmashrunApi(format!("Invalid activity {}: {}", payload.activity_id, e))
        })?;

        Ok(run)
    }

    /// Calendar date the run started on (local wall clock).
    pub fn start_date(&self) -> NaiveDate {
        self.start_date_time_local.date()
    }
}

/// SmashRun reports local start times with a UTC offset attached; keep the
/// wall-clock part. Timestamps without an offset are accepted as-is.
fn parse_local_start(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
}
