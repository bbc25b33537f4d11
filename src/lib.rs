// SPDX-License-Identifier: MIT

//! runstreak: sync running activity from SmashRun into Supabase.
//!
//! The core is the OAuth token lifecycle and the incremental-sync state
//! machine; the CLI and the HTTP trigger are thin shells around
//! [`services::SyncService`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SyncStore;
use services::{
    ActivityProvider, ActivityRepository, SyncService, SyncStateTracker, TokenRepository,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared application context, constructed once at startup and threaded
/// through explicitly; there is no hidden global state.
pub struct SyncContext {
    pub config: Config,
    pub store: Arc<dyn SyncStore>,
    pub provider: Arc<dyn ActivityProvider>,
}

impl SyncContext {
    pub fn new(
        config: Config,
        store: Arc<dyn SyncStore>,
        provider: Arc<dyn ActivityProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
        }
    }

    /// Assemble the sync pipeline for one user.
    pub fn sync_service(&self, user_id: Uuid) -> SyncService {
        SyncService::new(
            self.provider.clone(),
            TokenRepository::new(self.store.clone()),
            SyncStateTracker::new(self.store.clone(), user_id),
            ActivityRepository::new(self.store.clone()),
            user_id,
            self.config.split_unit,
        )
    }

    /// Token repository over the shared store.
    pub fn token_repository(&self) -> TokenRepository {
        TokenRepository::new(self.store.clone())
    }
}
