// SPDX-License-Identifier: MIT

//! Provider connection (source) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default provider source type.
pub const DEFAULT_SOURCE_TYPE: &str = "smashrun";

/// Token columns of an active `user_sources` row.
///
/// The row can exist with no tokens stored yet (source configured but not
/// authorized), so every token field is optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// None means the token never expires.
    pub token_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// OAuth tokens resolved from an active source that has been authorized.
#[derive(Debug, Clone)]
pub struct SourceTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// None means the token never expires.
    pub token_expires_at: Option<DateTime<Utc>>,
}
