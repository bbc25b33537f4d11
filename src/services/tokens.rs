// SPDX-License-Identifier: MIT

//! Repository for OAuth tokens stored on `user_sources` rows.
//!
//! Storage only: refresh is the orchestrator's job, because it needs the
//! provider client and this component deliberately does not depend on it.

use crate::db::SyncStore;
use crate::error::AppError;
use crate::models::SourceTokens;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A token is treated as expired this long before the provider would
/// actually reject it.
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 5 * 60;

/// Token storage keyed by (user_id, source_type).
#[derive(Clone)]
pub struct TokenRepository {
    store: Arc<dyn SyncStore>,
}

impl TokenRepository {
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Stored tokens for a user's source, or None when the source is not
    /// configured or not yet authorized.
    pub async fn get_user_tokens(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<Option<SourceTokens>, AppError> {
        let Some(record) = self.store.get_active_source(user_id, source_type).await? else {
            tracing::debug!(user_id = %user_id, source_type, "No active source for user");
            return Ok(None);
        };

        let Some(access_token) = record.access_token else {
            tracing::debug!(user_id = %user_id, source_type, "No tokens stored for user source");
            return Ok(None);
        };

        Ok(Some(SourceTokens {
            access_token,
            refresh_token: record.refresh_token,
            token_expires_at: record.token_expires_at,
        }))
    }

    /// Overwrite the stored tokens. `expires_in` of None means the token
    /// never expires. No-op with a warning when no active source row exists
    /// to attach tokens to.
    pub async fn save_user_tokens(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_in: Option<i64>,
        source_type: &str,
    ) -> Result<(), AppError> {
        let token_expires_at = expires_in.map(|secs| Utc::now() + Duration::seconds(secs));

        let updated = self
            .store
            .update_source_tokens(
                user_id,
                source_type,
                access_token,
                refresh_token,
                token_expires_at,
            )
            .await?;

        if updated {
            tracing::info!(user_id = %user_id, source_type, "Updated tokens for user source");
        } else {
            tracing::warn!(user_id = %user_id, source_type, "No source found to update for user");
        }
        Ok(())
    }

    /// True if the user's access token is missing, expired, or expires
    /// within the refresh buffer.
    pub async fn is_token_expired(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<bool, AppError> {
        match self.get_user_tokens(user_id, source_type).await? {
            None => Ok(true),
            Some(tokens) => Ok(expires_within_buffer(tokens.token_expires_at, Utc::now())),
        }
    }

    /// The stored access token only if it is still valid; never refreshes.
    pub async fn get_valid_access_token(
        &self,
        user_id: Uuid,
        source_type: &str,
    ) -> Result<Option<String>, AppError> {
        let Some(tokens) = self.get_user_tokens(user_id, source_type).await? else {
            return Ok(None);
        };

        if expires_within_buffer(tokens.token_expires_at, Utc::now()) {
            tracing::debug!(user_id = %user_id, "Token expired for user, refresh needed");
            return Ok(None);
        }

        Ok(Some(tokens.access_token))
    }

    /// Clear token fields on disconnect or irrecoverable auth failure. The
    /// source row itself stays active.
    pub async fn delete_tokens(&self, user_id: Uuid, source_type: &str) -> Result<(), AppError> {
        self.store.clear_source_tokens(user_id, source_type).await?;
        tracing::info!(user_id = %user_id, source_type, "Cleared tokens for user source");
        Ok(())
    }
}

/// True when `now` plus the refresh buffer has reached the expiry. Tokens
/// without an expiry never expire.
fn expires_within_buffer(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        None => false,
        Some(at) => now + Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS) >= at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiring_in_four_minutes_is_expired() {
        let now = Utc::now();
        assert!(expires_within_buffer(Some(now + Duration::minutes(4)), now));
    }

    #[test]
    fn test_token_expiring_in_ten_minutes_is_valid() {
        let now = Utc::now();
        assert!(!expires_within_buffer(Some(now + Duration::minutes(10)), now));
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        assert!(!expires_within_buffer(None, Utc::now()));
        assert!(!expires_within_buffer(
            None,
            Utc::now() + Duration::days(10_000)
        ));
    }

    #[test]
    fn test_exact_buffer_boundary_counts_as_expired() {
        let now = Utc::now();
        assert!(expires_within_buffer(
            Some(now + Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS)),
            now
        ));
    }

    #[test]
    fn test_already_expired_token() {
        let now = Utc::now();
        assert!(expires_within_buffer(Some(now - Duration::hours(1)), now));
    }
}
