// SPDX-License-Identifier: MIT

//! Sync cursor tracking: when runs were last synced for a user.

use crate::db::SyncStore;
use crate::error::AppError;
use crate::models::SyncState;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Backfill window when no sync has ever succeeded.
const DEFAULT_BACKFILL_DAYS: i64 = 30;

/// Tracks the last successful sync date for one user.
#[derive(Clone)]
pub struct SyncStateTracker {
    store: Arc<dyn SyncStore>,
    user_id: Uuid,
}

impl SyncStateTracker {
    pub fn new(store: Arc<dyn SyncStore>, user_id: Uuid) -> Self {
        Self { store, user_id }
    }

    /// Date of the last successful sync, or `today - 30 days` when no state
    /// exists or the lookup fails. A flaky state read must never abort a
    /// sync; the worst case is re-fetching an already-synced window, which
    /// the upsert contract makes harmless.
    pub async fn last_sync_date(&self) -> NaiveDate {
        let default = Utc::now().date_naive() - Duration::days(DEFAULT_BACKFILL_DAYS);

        match self.store.get_sync_state(self.user_id).await {
            Ok(Some(state)) => {
                tracing::debug!(last_sync = %state.last_sync_date, "Found last sync date");
                state.last_sync_date
            }
            Ok(None) => {
                tracing::info!(default = %default, "No sync state found, using backfill default");
                default
            }
            Err(e) => {
                tracing::warn!(error = %e, default = %default, "Failed to read sync state, using backfill default");
                default
            }
        }
    }

    /// Persist the cursor. Unlike reads, write failures propagate: a
    /// silently lost cursor update means duplicate work on every future run.
    pub async fn update_last_sync_date(
        &self,
        sync_date: NaiveDate,
        runs_synced: i64,
    ) -> Result<(), AppError> {
        let state = SyncState {
            user_id: self.user_id,
            last_sync_date: sync_date,
            last_sync_timestamp: Utc::now(),
            runs_synced,
        };

        self.store.upsert_sync_state(&state).await?;
        tracing::info!(
            sync_date = %sync_date,
            runs_synced,
            "Updated sync state"
        );
        Ok(())
    }

    /// Record the outcome of a sync batch. On success the cursor moves to
    /// `sync_date`; on failure it is deliberately left unmoved so the failed
    /// window is retried next time.
    pub async fn record_sync_attempt(
        &self,
        success: bool,
        sync_date: NaiveDate,
        runs_synced: i64,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        if success {
            self.update_last_sync_date(sync_date, runs_synced).await
        } else {
            tracing::error!(
                runs_synced,
                error = error_message.unwrap_or("unknown"),
                "Sync failed, cursor unchanged"
            );
            Ok(())
        }
    }
}
