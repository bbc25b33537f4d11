// SPDX-License-Identifier: MIT

//! Database layer (Supabase/PostgREST).

pub mod supabase;

pub use supabase::SupabaseDb;

use crate::error::AppError;
use crate::models::{Run, SourceRecord, Split, SplitUnit, SyncState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const USER_SOURCES: &str = "user_sources";
    pub const RUNS: &str = "runs";
    pub const SPLITS: &str = "splits";
    pub const SYNC_STATE: &str = "sync_state";
}

/// Storage operations the sync pipeline needs.
///
/// `SupabaseDb` is the production implementation. Tests provide an
/// in-memory store so orchestration properties can be exercised offline.
/// Each operation maps to the store's own per-row atomicity; there is no
/// client-side locking.
#[async_trait]
pub trait SyncStore: Send + Sync {
    // ─── Token fields on user_sources ────────────────────────────

    /// Fetch the single active source row for (user, source_type), if any.
    async fn get_active_source(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<Option<SourceRecord>, AppError>;

    /// Overwrite the token fields of the active source row.
    ///
    /// Returns false when no active source row existed to update; tokens
    /// can only be attached to an existing source.
    async fn update_source_tokens(
        &self,
        user_id: Uuid,
        source_type: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError>;

    /// Null out the token fields of the source row, keeping the row itself.
    async fn clear_source_tokens(&self, user_id: Uuid, source_type: &str)
        -> Result<(), AppError>;

    // ─── Runs and splits ─────────────────────────────────────────

    /// Insert-or-replace a run keyed by the provider's activity id.
    async fn upsert_run(&self, run: &Run) -> Result<(), AppError>;

    /// Replace the full split set for (activity_id, unit).
    async fn replace_splits(
        &self,
        activity_id: i64,
        unit: SplitUnit,
        splits: &[Split],
    ) -> Result<(), AppError>;

    // ─── Sync state ──────────────────────────────────────────────

    async fn get_sync_state(&self, user_id: Uuid) -> Result<Option<SyncState>, AppError>;

    /// Insert-or-replace the per-user sync cursor.
    async fn upsert_sync_state(&self, state: &SyncState) -> Result<(), AppError>;
}
