// SPDX-License-Identifier: MIT

//! Supabase client wrapper with typed operations.
//!
//! Talks to the PostgREST API (`/rest/v1`) with the service role key, which
//! bypasses Row Level Security. That is safe here: the sync backend enforces
//! its own authorization and never handles end-user requests directly.
//!
//! Provides high-level operations for:
//! - Token fields on `user_sources` rows
//! - Run and split upserts
//! - The per-user sync cursor

use crate::db::{tables, SyncStore};
use crate::error::AppError;
use crate::models::{Run, SourceRecord, Split, SplitUnit, SyncState};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Supabase PostgREST client.
#[derive(Clone)]
pub struct SupabaseDb {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseDb {
    /// Create a new client for a Supabase project.
    ///
    /// `base_url` is the project URL (e.g. `https://xxx.supabase.co` or a
    /// local `http://127.0.0.1:54321`); `api_key` is the service role key.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Check response status, mapping failures to `Database` errors.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Database(format!("HTTP {status}: {body}")))
    }

    /// Check response and parse the JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        self.check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Database(format!("JSON parse error: {e}")))
    }

    fn source_filter(user_id: Uuid, source_type: &str) -> [(&'static str, String); 3] {
        [
            ("user_id", format!("eq.{user_id}")),
            ("source_type", format!("eq.{source_type}")),
            ("is_active", "eq.true".to_string()),
        ]
    }
}

#[async_trait]
impl SyncStore for SupabaseDb {
    // ─── Token fields on user_sources ────────────────────────────

    async fn get_active_source(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<Option<SourceRecord>, AppError> {
        let response = self
            .request(reqwest::Method::GET, tables::USER_SOURCES)
            .query(&Self::source_filter(user_id, source_type))
            .query(&[
                (
                    "select",
                    "access_token,refresh_token,token_expires_at,updated_at",
                ),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Source lookup failed: {e}")))?;

        let mut rows: Vec<SourceRecord> = self.check_response_json(response).await?;
        let first = rows.drain(..).next();
        Ok(first)
    }

    async fn update_source_tokens(
        &self,
        user_id: Uuid,
        source_type: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError> {
        let body = serde_json::json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "token_expires_at": token_expires_at.map(format_utc_rfc3339),
            "updated_at": format_utc_rfc3339(Utc::now()),
        });

        // return=representation so the row count tells us whether any
        // active source row existed to update.
        let response = self
            .request(reqwest::Method::PATCH, tables::USER_SOURCES)
            .query(&Self::source_filter(user_id, source_type))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Token update failed: {e}")))?;

        let rows: Vec<serde_json::Value> = self.check_response_json(response).await?;
        Ok(!rows.is_empty())
    }

    async fn clear_source_tokens(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "access_token": null,
            "refresh_token": null,
            "token_expires_at": null,
            "updated_at": format_utc_rfc3339(Utc::now()),
        });

        let response = self
            .request(reqwest::Method::PATCH, tables::USER_SOURCES)
            .query(&Self::source_filter(user_id, source_type))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Token clear failed: {e}")))?;

        self.check_response(response).await?;
        Ok(())
    }

    // ─── Runs and splits ─────────────────────────────────────────

    async fn upsert_run(&self, run: &Run) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::POST, tables::RUNS)
            .query(&[("on_conflict", "activity_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[run])
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Run upsert failed: {e}")))?;

        self.check_response(response).await?;
        Ok(())
    }

    async fn replace_splits(
        &self,
        activity_id: i64,
        unit: SplitUnit,
        splits: &[Split],
    ) -> Result<(), AppError> {
        // Full replace: delete the (activity, unit) sequence first so a
        // re-sync with a different split count leaves no stale rows.
        let response = self
            .request(reqwest::Method::DELETE, tables::SPLITS)
            .query(&[
                ("activity_id", format!("eq.{activity_id}")),
                ("split_unit", format!("eq.{unit}")),
            ])
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Split delete failed: {e}")))?;
        self.check_response(response).await?;

        if splits.is_empty() {
            return Ok(());
        }

        let response = self
            .request(reqwest::Method::POST, tables::SPLITS)
            .header("Prefer", "return=minimal")
            .json(splits)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Split insert failed: {e}")))?;
        self.check_response(response).await?;
        Ok(())
    }

    // ─── Sync state ──────────────────────────────────────────────

    async fn get_sync_state(&self, user_id: Uuid) -> Result<Option<SyncState>, AppError> {
        let response = self
            .request(reqwest::Method::GET, tables::SYNC_STATE)
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Sync state lookup failed: {e}")))?;

        let mut rows: Vec<SyncState> = self.check_response_json(response).await?;
        let first = rows.drain(..).next();
        Ok(first)
    }

    async fn upsert_sync_state(&self, state: &SyncState) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::POST, tables::SYNC_STATE)
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[state])
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Sync state upsert failed: {e}")))?;

        self.check_response(response).await?;
        Ok(())
    }
}
