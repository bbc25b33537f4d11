// SPDX-License-Identifier: MIT

//! SmashRun API client for OAuth grants and activity fetching.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization-code and refresh-token grants
//! - Paginated activity listing filtered to a date window
//! - Per-activity split fetching

use crate::error::AppError;
use crate::models::{ProviderSplit, SplitUnit};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

const OAUTH_SCOPE: &str = "read_activity";
const PAGE_SIZE: usize = 100;

/// Token grant response from the provider.
///
/// A 2xx body without both tokens is malformed; the decode fails rather
/// than accepting a partial grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until expiry; absent for non-expiring tokens.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Authenticated user profile (used to confirm a fresh authorization).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub user_name: Option<String>,
}

/// SmashRun API client.
#[derive(Clone)]
pub struct SmashrunClient {
    http: reqwest::Client,
    auth_base: String,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SmashrunClient {
    /// Create a new SmashRun client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_base: "https://secure.smashrun.com/oauth2".to_string(),
            api_base: "https://api.smashrun.com/v1".to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    // ─── OAuth grants ────────────────────────────────────────────

    /// Deterministic authorization URL for the out-of-band code flow.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}/authenticate?client_id={}&response_type=code&redirect_uri={}&scope={}",
            self.auth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            OAUTH_SCOPE,
        )
    }

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.token_grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppError> {
        self.token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ])
        .await
    }

    /// Single token request; no retries. Authorization codes are
    /// one-time-use, so a failed exchange is terminal and user-visible.
    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_base))
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::SmashrunApi(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SmashrunApi(format!(
                "Token grant failed: HTTP {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::SmashrunApi(format!("Malformed token response: {e}")))
    }

    // ─── Activity API ────────────────────────────────────────────

    /// Get the authenticated user's profile.
    pub async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, AppError> {
        let response = self
            .http
            .get(format!("{}/my/userinfo", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::SmashrunApi(format!("User info request failed: {e}")))?;

        self.check_response_json(response).await
    }

    /// Check response status and return a typed error if not successful.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(AppError::SmashrunApi(
                    "Invalid or expired access token".to_string(),
                ));
            }

            return Err(AppError::SmashrunApi(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::SmashrunApi(format!("JSON parse error: {e}")))
    }
}

/// Activity source the orchestrator fetches from.
///
/// Raw JSON payloads cross this seam so one malformed activity fails its own
/// transform step instead of the whole page decode.
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError>;

    /// All activities with a local start date in [since, until].
    async fn list_activities(
        &self,
        access_token: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<serde_json::Value>, AppError>;

    /// Split sequence for an activity, or None when the provider has none.
    async fn get_splits(
        &self,
        access_token: &str,
        activity_id: i64,
        unit: SplitUnit,
    ) -> Result<Option<Vec<ProviderSplit>>, AppError>;
}

#[async_trait]
impl ActivityProvider for SmashrunClient {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.refresh_access_token(refresh_token).await
    }

    async fn list_activities(
        &self,
        access_token: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        // fromDate narrows the fetch server-side; the until bound is only
        // applied client-side because the search endpoint has no toDate.
        let from_ts = since
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let mut activities = Vec::new();
        let mut page: usize = 0;

        loop {
            let response = self
                .http
                .get(format!("{}/my/activities/search", self.api_base))
                .bearer_auth(access_token)
                .query(&[
                    ("page", page.to_string()),
                    ("count", PAGE_SIZE.to_string()),
                    ("fromDate", from_ts.to_string()),
                ])
                .send()
                .await
                .map_err(|e| AppError::SmashrunApi(format!("Activity fetch failed: {e}")))?;

            let batch: Vec<serde_json::Value> = self.check_response_json(response).await?;
            let fetched = batch.len();

            activities.extend(
                batch
                    .into_iter()
                    .filter(|a| starts_within_window(a, since, until)),
            );

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(activities)
    }

    async fn get_splits(
        &self,
        access_token: &str,
        activity_id: i64,
        unit: SplitUnit,
    ) -> Result<Option<Vec<ProviderSplit>>, AppError> {
        let response = self
            .http
            .get(format!(
                "{}/my/activities/{}/splits/{}",
                self.api_base, activity_id, unit
            ))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::SmashrunApi(format!("Split fetch failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let splits: Vec<ProviderSplit> = self.check_response_json(response).await?;
        Ok((!splits.is_empty()).then_some(splits))
    }
}

/// Window filter on the raw payload. Activities whose start date cannot be
/// read are kept so the transform step reports them as skips instead of
/// dropping them silently here.
fn starts_within_window(activity: &serde_json::Value, since: NaiveDate, until: NaiveDate) -> bool {
    activity
        .get("startDateTimeLocal")
        .and_then(|v| v.as_str())
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .map_or(true, |d| d >= since && d <= until)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_authorization_url_is_deterministic() {
        let client = SmashrunClient::new(
            "streak_abc".to_string(),
            "secret".to_string(),
            "urn:ietf:wg:oauth:2.0:oob".to_string(),
        );
        let url = client.authorization_url();
        assert_eq!(url, client.authorization_url());
        assert!(url.starts_with("https://secure.smashrun.com/oauth2/authenticate?"));
        assert!(url.contains("client_id=streak_abc"));
        assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
        assert!(url.contains("scope=read_activity"));
    }

    #[test]
    fn test_token_response_requires_both_tokens() {
        let full: Result<TokenResponse, _> = serde_json::from_value(json!({
            "access_token": "a", "refresh_token": "r", "expires_in": 3600
        }));
        assert!(full.is_ok());

        let missing_refresh: Result<TokenResponse, _> =
            serde_json::from_value(json!({"access_token": "a"}));
        assert!(missing_refresh.is_err());
    }

    #[test]
    fn test_window_filter() {
        let activity = json!({"startDateTimeLocal": "2024-06-15T07:00:00-04:00"});
        assert!(starts_within_window(
            &activity,
            day(2024, 6, 1),
            day(2024, 6, 30)
        ));
        assert!(!starts_within_window(
            &activity,
            day(2024, 7, 1),
            day(2024, 7, 31)
        ));
    }

    #[test]
    fn test_window_filter_keeps_unreadable_dates() {
        // The transform step owns reporting these as skips.
        let activity = json!({"distance": 5.0});
        assert!(starts_within_window(
            &activity,
            day(2024, 6, 1),
            day(2024, 6, 30)
        ));
    }
}
