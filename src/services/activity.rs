// SPDX-License-Identifier: MIT

//! Idempotent persistence of runs and their splits.

use crate::db::SyncStore;
use crate::error::AppError;
use crate::models::{ProviderSplit, Run, Split, SplitUnit};
use std::sync::Arc;
use validator::Validate;

/// Writes runs and splits through the store's upsert contract.
#[derive(Clone)]
pub struct ActivityRepository {
    store: Arc<dyn SyncStore>,
}

impl ActivityRepository {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Insert-or-replace a run. The conflict key is the provider's
    /// activity_id, never an internal serial id, so repeated syncs of the
    /// same run can never duplicate it.
    pub async fn upsert_run(&self, run: &Run) -> Result<(), AppError> {
        self.store.upsert_run(run).await?;
        tracing::debug!(activity_id = run.activity_id, "Upserted run");
        Ok(())
    }

    /// Replace the full split sequence for (activity_id, unit).
    ///
    /// Returns the number of splits stored.
    pub async fn upsert_splits(
        &self,
        activity_id: i64,
        unit: SplitUnit,
        splits: &[ProviderSplit],
    ) -> Result<usize, AppError> {
        let rows = sequence_splits(activity_id, unit, splits)?;
        self.store.replace_splits(activity_id, unit, &rows).await?;
        tracing::debug!(activity_id, unit = %unit, count = rows.len(), "Replaced splits");
        Ok(rows.len())
    }
}

/// Assign contiguous split numbers 1..N in payload order and check the
/// cumulative invariants. Distance and seconds must be positive and
/// non-decreasing; a violation rejects the whole sequence so nothing
/// partial is ever stored for this (activity, unit).
pub fn sequence_splits(
    activity_id: i64,
    unit: SplitUnit,
    splits: &[ProviderSplit],
) -> Result<Vec<Split>, AppError> {
    let mut rows = Vec::with_capacity(splits.len());
    let mut prev_distance = 0.0_f64;
    let mut prev_seconds = 0.0_f64;

    for (i, s) in splits.iter().enumerate() {
        let number = (i + 1) as i32;
        let row = Split {
            activity_id,
            split_unit: unit,
            split_number: number,
            cumulative_distance: s.cumulative_distance,
            cumulative_seconds: s.cumulative_seconds,
            speed_kph: s.speed_kph,
            heart_rate: s.heart_rate,
            cumulative_elevation_gain_meters: s.cumulative_elevation_gain_meters,
            cumulative_elevation_loss_meters: s.cumulative_elevation_loss_meters,
        };

        row.validate().map_err(|e| {
            AppError::SmashrunApi(format!(
                "Invalid split {number} for activity {activity_id}: {e}"
            ))
        })?;

        if row.cumulative_distance < prev_distance || row.cumulative_seconds < prev_seconds {
            return Err(AppError::SmashrunApi(format!(
                "Non-monotonic cumulative metrics at split {number} for activity {activity_id}"
            )));
        }

        prev_distance = row.cumulative_distance;
        prev_seconds = row.cumulative_seconds;
        rows.push(row);
    }

    Ok(rows)
}
