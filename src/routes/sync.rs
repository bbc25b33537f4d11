// SPDX-License-Identifier: MIT

//! Sync trigger endpoint.
//!
//! `POST /sync-user` runs one sync batch and reports the outcome. This is
//! the surface a scheduler or manual trigger calls; it is not meant for
//! direct end users and should sit behind the deployment's own auth.

use crate::error::Result;
use crate::services::SyncOptions;
use crate::SyncContext;
use axum::{
    extract::{Json, Query, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<SyncContext>> {
    Router::new().route("/sync-user", post(sync_user))
}

/// Request body mirroring the CLI's window flags.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    pub since: Option<String>,
    pub until: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Deserialize)]
pub struct SyncParams {
    pub user_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub status: String,
    pub runs_synced: usize,
    pub splits_synced: usize,
    pub skipped: usize,
    pub since: String,
    pub until: String,
}

/// Run a sync batch for the given (or configured) user.
async fn sync_user(
    State(ctx): State<Arc<SyncContext>>,
    Query(params): Query<SyncParams>,
    Json(request): Json<SyncRequest>,
) -> Result<axum::Json<SyncResponse>> {
    let user_id = params.user_id.unwrap_or(ctx.config.user_id);

    tracing::info!(user_id = %user_id, "Sync triggered");

    let options = SyncOptions {
        since: request.since,
        until: request.until,
        year: request.year,
        full: request.full,
    };

    let outcome = ctx.sync_service(user_id).run(&options).await?;

    Ok(axum::Json(SyncResponse {
        status: "success".to_string(),
        runs_synced: outcome.runs_synced,
        splits_synced: outcome.splits_synced,
        skipped: outcome.skipped,
        since: outcome.since.to_string(),
        until: outcome.until.to_string(),
    }))
}
