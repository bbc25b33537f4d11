// SPDX-License-Identifier: MIT

//! Sync cursor model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user sync cursor, as stored in `sync_state`.
///
/// Created lazily on the first successful sync and updated only on success,
/// so a failed batch is retried over the same window next time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub user_id: Uuid,
    pub last_sync_date: NaiveDate,
    pub last_sync_timestamp: DateTime<Utc>,
    /// Runs persisted by the last successful batch.
    pub runs_synced: i64,
}
