// SPDX-License-Identifier: MIT

//! Split model for per-mile/per-km pace tracking.
//!
//! Splits store cumulative metrics as reported by SmashRun; per-split
//! deltas are derived downstream rather than stored.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Unit a split sequence is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitUnit {
    Mi,
    Km,
}

impl SplitUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitUnit::Mi => "mi",
            SplitUnit::Km => "km",
        }
    }
}

impl fmt::Display for SplitUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mi" => Ok(SplitUnit::Mi),
            "km" => Ok(SplitUnit::Km),
            other => Err(AppError::BadRequest(format!(
                "Invalid split unit: {other}. Use 'mi' or 'km'."
            ))),
        }
    }
}

/// Split payload as returned by the SmashRun splits endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSplit {
    /// Distance at the end of this split (miles or km per requested unit).
    #[serde(rename = "distance")]
    pub cumulative_distance: f64,
    /// Elapsed seconds at the end of this split.
    #[serde(rename = "seconds")]
    pub cumulative_seconds: f64,
    #[serde(rename = "speed", default)]
    pub speed_kph: Option<f64>,
    #[serde(rename = "heartRate", default)]
    pub heart_rate: Option<i32>,
    #[serde(rename = "elevationGain", default)]
    pub cumulative_elevation_gain_meters: Option<f64>,
    #[serde(rename = "elevationLoss", default)]
    pub cumulative_elevation_loss_meters: Option<f64>,
}

/// Stored split row, keyed by (activity_id, split_unit, split_number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Split {
    pub activity_id: i64,
    pub split_unit: SplitUnit,
    /// Sequential split number starting at 1, with no gaps.
    #[validate(range(min = 1))]
    pub split_number: i32,
    #[validate(range(exclusive_min = 0.0))]
    pub cumulative_distance: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub cumulative_seconds: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub speed_kph: Option<f64>,
    #[validate(range(min = 0))]
    pub heart_rate: Option<i32>,
    #[validate(range(min = 0.0))]
    pub cumulative_elevation_gain_meters: Option<f64>,
    #[validate(range(min = 0.0))]
    pub cumulative_elevation_loss_meters: Option<f64>,
}
