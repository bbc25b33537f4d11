// SPDX-License-Identifier: MIT

//! Application configuration and credential sourcing.
//!
//! Credentials come from exactly one of two sources, chosen by an explicit
//! runtime flag: the process environment (with `.env` support for local
//! development) or a JSON credentials file. Nothing deeper in the crate
//! probes the environment.

use crate::models::SplitUnit;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const DEFAULT_PORT: u16 = 8080;

/// Where credentials are loaded from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Environment variables (plus `.env` if present).
    Env,
    /// A JSON credentials file.
    File(PathBuf),
}

/// Application configuration, loaded once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    /// SmashRun OAuth client id
    pub smashrun_client_id: String,
    /// SmashRun OAuth client secret
    pub smashrun_client_secret: String,
    /// OAuth redirect URI; defaults to the out-of-band flow
    pub smashrun_redirect_uri: String,
    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase service role key
    pub supabase_key: String,
    /// User the sync runs for
    pub user_id: Uuid,
    /// Unit splits are fetched in
    pub split_unit: SplitUnit,
    /// Trigger service port
    pub port: u16,
}

impl Config {
    /// Load configuration from the selected credential source.
    pub fn load(source: &CredentialSource) -> Result<Self, ConfigError> {
        match source {
            CredentialSource::Env => Self::from_env(),
            CredentialSource::File(path) => Self::from_credentials_file(path),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            smashrun_client_id: env::var("SMASHRUN_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("SMASHRUN_CLIENT_ID"))?,
            smashrun_client_secret: env::var("SMASHRUN_CLIENT_SECRET")
                .map_err(|_| ConfigError::Missing("SMASHRUN_CLIENT_SECRET"))?,
            smashrun_redirect_uri: env::var("SMASHRUN_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            supabase_url: env::var("SUPABASE_URL")
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_key: env::var("SUPABASE_KEY")
                .map_err(|_| ConfigError::Missing("SUPABASE_KEY"))?,
            user_id: env::var("RUNSTREAK_USER_ID")
                .map_err(|_| ConfigError::Missing("RUNSTREAK_USER_ID"))?
                .parse()
                .map_err(|e| ConfigError::Invalid("RUNSTREAK_USER_ID", format!("{e}")))?,
            split_unit: env::var("RUNSTREAK_SPLIT_UNIT")
                .map(|v| v.parse())
                .unwrap_or(Ok(SplitUnit::Mi))
                .map_err(|e| ConfigError::Invalid("RUNSTREAK_SPLIT_UNIT", e.to_string()))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_PORT),
        })
    }

    /// Load configuration from a JSON credentials file.
    pub fn from_credentials_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(path.display().to_string(), e.to_string()))?;
        Self::from_credentials_json(&contents)
            .map_err(|e| ConfigError::File(path.display().to_string(), e.to_string()))
    }

    fn from_credentials_json(contents: &str) -> Result<Self, serde_json::Error> {
        let file: CredentialsFile = serde_json::from_str(contents)?;
        Ok(Self {
            smashrun_client_id: file.smashrun_client_id,
            smashrun_client_secret: file.smashrun_client_secret,
            smashrun_redirect_uri: file
                .smashrun_redirect_uri
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            supabase_url: file.supabase_url,
            supabase_key: file.supabase_key,
            user_id: file.user_id,
            split_unit: file.split_unit.unwrap_or(SplitUnit::Mi),
            port: file.port.unwrap_or(DEFAULT_PORT),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            smashrun_client_id: "streak_test".to_string(),
            smashrun_client_secret: "test_secret".to_string(),
            smashrun_redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            supabase_url: "http://127.0.0.1:54321".to_string(),
            supabase_key: "test_key".to_string(),
            user_id: Uuid::nil(),
            split_unit: SplitUnit::Mi,
            port: DEFAULT_PORT,
        }
    }
}

/// On-disk credentials file shape.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    smashrun_client_id: String,
    smashrun_client_secret: String,
    #[serde(default)]
    smashrun_redirect_uri: Option<String>,
    supabase_url: String,
    supabase_key: String,
    user_id: Uuid,
    #[serde(default)]
    split_unit: Option<SplitUnit>,
    #[serde(default)]
    port: Option<u16>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Failed to load credentials file {0}: {1}")]
    File(String, String),
}
