// SPDX-License-Identifier: MIT

//! Sync orchestration.
//!
//! One batch walks resolve-window, ensure-token, fetch, transform, persist,
//! record. A single activity's failure is logged and skipped; token-step and
//! cursor-recording failures abort the batch. Everything already upserted
//! stays valid either way, so an aborted batch is safely re-runnable.

use crate::error::AppError;
use crate::models::{ProviderActivity, Run, SplitUnit, DEFAULT_SOURCE_TYPE};
use crate::services::activity::ActivityRepository;
use crate::services::smashrun::ActivityProvider;
use crate::services::sync_state::SyncStateTracker;
use crate::services::tokens::TokenRepository;
use crate::time_utils::parse_iso_date;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// SmashRun launch date; `--full` backfills from here.
const SMASHRUN_EPOCH: (i32, u32, u32) = (2010, 1, 1);

fn smashrun_epoch() -> NaiveDate {
    let (y, m, d) = SMASHRUN_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d).expect("static epoch date is valid")
}

/// Raw window flags as given on the CLI or trigger request.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub since: Option<String>,
    pub until: Option<String>,
    pub year: Option<i32>,
    pub full: bool,
}

/// A parsed, validated window request.
///
/// Parsing is pure and happens before any network or store access, so bad
/// flags fail the whole operation with no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    Year(i32),
    Full,
    Range {
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    },
    Incremental,
}

impl WindowSpec {
    /// Parse flags with first-match-wins precedence: year, full,
    /// since/until, incremental.
    pub fn parse(opts: &SyncOptions) -> Result<Self, AppError> {
        if let Some(year) = opts.year {
            if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
                return Err(AppError::InvalidDate(format!("Invalid year: {year}")));
            }
            return Ok(WindowSpec::Year(year));
        }

        if opts.full {
            return Ok(WindowSpec::Full);
        }

        if opts.since.is_some() || opts.until.is_some() {
            let since = opts.since.as_deref().map(parse_iso_date).transpose()?;
            let until = opts.until.as_deref().map(parse_iso_date).transpose()?;
            if let (Some(s), Some(u)) = (since, until) {
                if s > u {
                    return Err(AppError::InvalidDate(format!(
                        "since {s} is after until {u}"
                    )));
                }
            }
            return Ok(WindowSpec::Range { since, until });
        }

        Ok(WindowSpec::Incremental)
    }

    /// Whether resolution needs the stored last-sync date.
    pub fn needs_last_sync(&self) -> bool {
        matches!(
            self,
            WindowSpec::Incremental | WindowSpec::Range { since: None, .. }
        )
    }

    /// Fill in defaults to a concrete window.
    pub fn resolve(&self, last_sync: NaiveDate, today: NaiveDate) -> Result<SyncWindow, AppError> {
        let (since, until) = match *self {
            WindowSpec::Year(year) => {
                let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| AppError::InvalidDate(format!("Invalid year: {year}")))?;
                let dec31 = NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| AppError::InvalidDate(format!("Invalid year: {year}")))?;
                (jan1, dec31)
            }
            WindowSpec::Full => (smashrun_epoch(), today),
            WindowSpec::Range { since, until } => {
                (since.unwrap_or(last_sync), until.unwrap_or(today))
            }
            WindowSpec::Incremental => (last_sync, today),
        };

        if since > until {
            return Err(AppError::InvalidDate(format!(
                "since {since} is after until {until}"
            )));
        }

        Ok(SyncWindow { since, until })
    }
}

/// Resolved date window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

/// Outcome of a sync batch. Counts reflect rows actually persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub since: NaiveDate,
    pub until: NaiveDate,
    pub runs_synced: usize,
    pub splits_synced: usize,
    pub skipped: usize,
}

/// The sync state machine for one user.
pub struct SyncService {
    provider: Arc<dyn ActivityProvider>,
    tokens: TokenRepository,
    state: SyncStateTracker,
    activities: ActivityRepository,
    user_id: Uuid,
    split_unit: SplitUnit,
}

impl SyncService {
    pub fn new(
        provider: Arc<dyn ActivityProvider>,
        tokens: TokenRepository,
        state: SyncStateTracker,
        activities: ActivityRepository,
        user_id: Uuid,
        split_unit: SplitUnit,
    ) -> Self {
        Self {
            provider,
            tokens,
            state,
            activities,
            user_id,
            split_unit,
        }
    }

    /// Run one sync batch.
    pub async fn run(&self, opts: &SyncOptions) -> Result<SyncOutcome, AppError> {
        // Window resolution. Parse first so bad flags fail before any IO;
        // the stored cursor is only read when a default actually needs it.
        let spec = WindowSpec::parse(opts)?;
        let today = Utc::now().date_naive();
        let last_sync = if spec.needs_last_sync() {
            self.state.last_sync_date().await
        } else {
            today
        };
        let window = spec.resolve(last_sync, today)?;

        tracing::info!(
            user_id = %self.user_id,
            since = %window.since,
            until = %window.until,
            "Starting sync"
        );

        // Token ensure. A failure here aborts the whole batch: without a
        // usable token nothing can be fetched.
        let access_token = match self.ensure_access_token().await {
            Ok(token) => token,
            Err(e) => {
                let _ = self
                    .state
                    .record_sync_attempt(false, window.until, 0, Some(&e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let payloads = match self
            .provider
            .list_activities(&access_token, window.since, window.until)
            .await
        {
            Ok(payloads) => payloads,
            Err(e) => {
                let _ = self
                    .state
                    .record_sync_attempt(false, window.until, 0, Some(&e.to_string()))
                    .await;
                return Err(e);
            }
        };

        tracing::info!(count = payloads.len(), "Fetched activities");

        let mut runs_synced = 0_usize;
        let mut splits_synced = 0_usize;
        let mut skipped = 0_usize;

        for payload in &payloads {
            match self.sync_one(&access_token, payload).await {
                Ok(split_count) => {
                    runs_synced += 1;
                    splits_synced += split_count;
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, "Skipping activity");
                }
            }
        }

        // Per-activity skips do not fail the batch. The window's until date
        // becomes the cursor so a historical range sync never advances the
        // incremental cursor past unrelated gaps; a write failure here is
        // the batch result, but everything upserted above remains valid.
        self.state
            .record_sync_attempt(true, window.until, runs_synced as i64, None)
            .await?;

        tracing::info!(runs_synced, splits_synced, skipped, "Sync complete");

        Ok(SyncOutcome {
            since: window.since,
            until: window.until,
            runs_synced,
            splits_synced,
            skipped,
        })
    }

    /// A usable access token: the stored one if valid, otherwise a refresh
    /// through the provider, persisting the new tokens. With no refresh
    /// token there is no headless path left; the user must re-authorize.
    async fn ensure_access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self
            .tokens
            .get_valid_access_token(self.user_id, DEFAULT_SOURCE_TYPE)
            .await?
        {
            return Ok(token);
        }

        let stored = self
            .tokens
            .get_user_tokens(self.user_id, DEFAULT_SOURCE_TYPE)
            .await?;

        let refresh_token = stored.and_then(|t| t.refresh_token).ok_or_else(|| {
            AppError::AuthRequired(
                "No refresh token stored; run 'stk auth authorize' to reconnect".to_string(),
            )
        })?;

        tracing::info!(user_id = %self.user_id, "Access token expired or missing, refreshing");
        let response = self.provider.refresh_token(&refresh_token).await?;

        self.tokens
            .save_user_tokens(
                self.user_id,
                &response.access_token,
                &response.refresh_token,
                response.expires_in,
                DEFAULT_SOURCE_TYPE,
            )
            .await?;

        Ok(response.access_token)
    }

    /// Transform and persist one activity; returns the split count stored.
    ///
    /// A failed split fetch or store does not undo the run upsert, so the
    /// run still counts as synced; only the splits are missing until the
    /// next overlapping sync.
    async fn sync_one(
        &self,
        access_token: &str,
        payload: &serde_json::Value,
    ) -> Result<usize, AppError> {
        let activity: ProviderActivity = serde_json::from_value(payload.clone())
            .map_err(|e| AppError::SmashrunApi(format!("Malformed activity payload: {e}")))?;
        let run = Run::from_provider(&activity)?;

        self.activities.upsert_run(&run).await?;

        match self
            .provider
            .get_splits(access_token, run.activity_id, self.split_unit)
            .await
        {
            Ok(Some(splits)) => {
                match self
                    .activities
                    .upsert_splits(run.activity_id, self.split_unit, &splits)
                    .await
                {
                    Ok(count) => Ok(count),
                    Err(e) => {
                        tracing::warn!(
                            activity_id = run.activity_id,
                            error = %e,
                            "Failed to store splits, run kept"
                        );
                        Ok(0)
                    }
                }
            }
            Ok(None) => {
                tracing::debug!(activity_id = run.activity_id, "No splits available");
                Ok(0)
            }
            Err(e) => {
                tracing::warn!(
                    activity_id = run.activity_id,
                    error = %e,
                    "Failed to fetch splits, run kept"
                );
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn opts(
        since: Option<&str>,
        until: Option<&str>,
        year: Option<i32>,
        full: bool,
    ) -> SyncOptions {
        SyncOptions {
            since: since.map(str::to_string),
            until: until.map(str::to_string),
            year,
            full,
        }
    }

    #[test]
    fn test_year_window_ignores_last_sync_and_today() {
        let spec = WindowSpec::parse(&opts(None, None, Some(2015), false)).unwrap();
        assert!(!spec.needs_last_sync());

        let window = spec.resolve(day(2099, 1, 1), day(2099, 6, 1)).unwrap();
        assert_eq!(window.since, day(2015, 1, 1));
        assert_eq!(window.until, day(2015, 12, 31));
    }

    #[test]
    fn test_full_window_starts_at_provider_epoch() {
        let spec = WindowSpec::parse(&opts(None, None, None, true)).unwrap();
        let window = spec.resolve(day(2024, 1, 1), day(2025, 3, 15)).unwrap();
        assert_eq!(window.since, day(2010, 1, 1));
        assert_eq!(window.until, day(2025, 3, 15));
    }

    #[test]
    fn test_incremental_window_uses_last_sync_to_today() {
        let spec = WindowSpec::parse(&SyncOptions::default()).unwrap();
        assert!(spec.needs_last_sync());

        let window = spec.resolve(day(2024, 1, 1), day(2024, 2, 10)).unwrap();
        assert_eq!(window.since, day(2024, 1, 1));
        assert_eq!(window.until, day(2024, 2, 10));
    }

    #[test]
    fn test_explicit_range_defaults() {
        // until defaults to today
        let spec = WindowSpec::parse(&opts(Some("2020-01-01"), None, None, false)).unwrap();
        assert!(!spec.needs_last_sync());
        let window = spec.resolve(day(2024, 1, 1), day(2024, 2, 10)).unwrap();
        assert_eq!(window.since, day(2020, 1, 1));
        assert_eq!(window.until, day(2024, 2, 10));

        // since defaults to last sync date
        let spec = WindowSpec::parse(&opts(None, Some("2024-02-01"), None, false)).unwrap();
        assert!(spec.needs_last_sync());
        let window = spec.resolve(day(2024, 1, 15), day(2024, 2, 10)).unwrap();
        assert_eq!(window.since, day(2024, 1, 15));
        assert_eq!(window.until, day(2024, 2, 1));
    }

    #[test]
    fn test_year_takes_precedence_over_other_flags() {
        let spec =
            WindowSpec::parse(&opts(Some("2020-01-01"), None, Some(2015), true)).unwrap();
        assert_eq!(spec, WindowSpec::Year(2015));
    }

    #[test]
    fn test_unparsable_date_fails_fast() {
        assert!(matches!(
            WindowSpec::parse(&opts(Some("not-a-date"), None, None, false)),
            Err(AppError::InvalidDate(_))
        ));
        assert!(matches!(
            WindowSpec::parse(&opts(None, Some("2024-02-30"), None, false)),
            Err(AppError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_since_after_until_is_invalid() {
        // Explicit flags: rejected at parse time.
        assert!(matches!(
            WindowSpec::parse(&opts(Some("2024-02-01"), Some("2024-01-01"), None, false)),
            Err(AppError::InvalidDate(_))
        ));

        // Defaulted since (last sync) landing after an explicit until:
        // rejected at resolution, not silently swapped.
        let spec = WindowSpec::parse(&opts(None, Some("2024-01-01"), None, false)).unwrap();
        assert!(spec.resolve(day(2024, 6, 1), day(2024, 7, 1)).is_err());
    }
}
