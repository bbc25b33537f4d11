// SPDX-License-Identifier: MIT

//! Shared fixtures: an in-memory store and a stub provider so sync
//! behavior can be exercised without Supabase or SmashRun.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runstreak::db::SyncStore;
use runstreak::error::AppError;
use runstreak::models::{ProviderSplit, Run, SourceRecord, Split, SplitUnit, SyncState};
use runstreak::services::{
    ActivityProvider, ActivityRepository, SyncService, SyncStateTracker, TokenRepository,
    TokenResponse,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory `SyncStore` with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    pub inner: Mutex<MemoryInner>,
}

#[derive(Default)]
pub struct MemoryInner {
    pub sources: HashMap<(Uuid, String), SourceRecord>,
    pub runs: HashMap<i64, Run>,
    pub splits: HashMap<(i64, SplitUnit), Vec<Split>>,
    pub sync_state: HashMap<Uuid, SyncState>,
    /// When set, sync-state upserts fail with a Database error.
    pub fail_sync_state_writes: bool,
    /// Run upserts for these activity ids fail with a Database error.
    pub fail_run_upserts: HashSet<i64>,
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn get_active_source(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<Option<SourceRecord>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sources
            .get(&(user_id, source_type.to_string()))
            .cloned())
    }

    async fn update_source_tokens(
        &self,
        user_id: Uuid,
        source_type: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.sources.get_mut(&(user_id, source_type.to_string())) {
            Some(record) => {
                record.access_token = Some(access_token.to_string());
                record.refresh_token = Some(refresh_token.to_string());
                record.token_expires_at = token_expires_at;
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_source_tokens(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.sources.get_mut(&(user_id, source_type.to_string())) {
            record.access_token = None;
            record.refresh_token = None;
            record.token_expires_at = None;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn upsert_run(&self, run: &Run) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_run_upserts.contains(&run.activity_id) {
            return Err(AppError::Database(format!(
                "injected upsert failure for activity {}",
                run.activity_id
            )));
        }
        inner.runs.insert(run.activity_id, run.clone());
        Ok(())
    }

    async fn replace_splits(
        &self,
        activity_id: i64,
        unit: SplitUnit,
        splits: &[Split],
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.splits.remove(&(activity_id, unit));
        if !splits.is_empty() {
            inner.splits.insert((activity_id, unit), splits.to_vec());
        }
        Ok(())
    }

    async fn get_sync_state(&self, user_id: Uuid) -> Result<Option<SyncState>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sync_state.get(&user_id).cloned())
    }

    async fn upsert_sync_state(&self, state: &SyncState) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sync_state_writes {
            return Err(AppError::Database(
                "injected sync state write failure".to_string(),
            ));
        }
        inner.sync_state.insert(state.user_id, state.clone());
        Ok(())
    }
}

/// Stub `ActivityProvider` returning canned payloads.
#[derive(Default)]
#[allow(dead_code)]
pub struct StubProvider {
    pub activities: Vec<serde_json::Value>,
    pub splits: HashMap<i64, Vec<ProviderSplit>>,
    /// Refresh grant result; None rejects the refresh.
    pub refresh: Option<TokenResponse>,
}

#[async_trait]
impl ActivityProvider for StubProvider {
    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.refresh
            .clone()
            .ok_or_else(|| AppError::SmashrunApi("Token grant failed: HTTP 400".to_string()))
    }

    async fn list_activities(
        &self,
        _access_token: &str,
        _since: chrono::NaiveDate,
        _until: chrono::NaiveDate,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        Ok(self.activities.clone())
    }

    async fn get_splits(
        &self,
        _access_token: &str,
        activity_id: i64,
        _unit: SplitUnit,
    ) -> Result<Option<Vec<ProviderSplit>>, AppError> {
        Ok(self.splits.get(&activity_id).cloned())
    }
}

#[allow(dead_code)]
pub fn test_user() -> Uuid {
    Uuid::from_u128(0x7f0c_0a50_6a6f_4b5e_9f0f_0123_4567_89ab)
}

/// Seed an active source row, optionally with tokens.
#[allow(dead_code)]
pub fn seed_source(
    store: &MemoryStore,
    user_id: Uuid,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    token_expires_at: Option<DateTime<Utc>>,
) {
    let mut inner = store.inner.lock().unwrap();
    inner.sources.insert(
        (user_id, "smashrun".to_string()),
        SourceRecord {
            access_token: access_token.map(str::to_string),
            refresh_token: refresh_token.map(str::to_string),
            token_expires_at,
            updated_at: Utc::now(),
        },
    );
}

/// Provider activity payload as the SmashRun API would return it.
#[allow(dead_code)]
pub fn activity_json(activity_id: i64, start_local: &str, distance_km: f64) -> serde_json::Value {
    serde_json::json!({
        "activityId": activity_id,
        "startDateTimeLocal": start_local,
        "distance": distance_km,
        "duration": 1800.0,
        "activityType": "running"
    })
}

#[allow(dead_code)]
pub fn provider_split(distance: f64, seconds: f64) -> ProviderSplit {
    ProviderSplit {
        cumulative_distance: distance,
        cumulative_seconds: seconds,
        speed_kph: None,
        heart_rate: None,
        cumulative_elevation_gain_meters: None,
        cumulative_elevation_loss_meters: None,
    }
}

/// Assemble a sync service over the in-memory fixtures.
#[allow(dead_code)]
pub fn sync_service(
    store: &Arc<MemoryStore>,
    provider: Arc<StubProvider>,
    user_id: Uuid,
) -> SyncService {
    let store: Arc<dyn SyncStore> = store.clone();
    SyncService::new(
        provider,
        TokenRepository::new(store.clone()),
        SyncStateTracker::new(store.clone(), user_id),
        ActivityRepository::new(store),
        user_id,
        SplitUnit::Mi,
    )
}
