// SPDX-License-Identifier: MIT

//! Token storage through the store seam.

mod common;

use chrono::{Duration, Utc};
use common::*;
use runstreak::db::SyncStore;
use runstreak::models::DEFAULT_SOURCE_TYPE;
use runstreak::services::TokenRepository;
use std::sync::Arc;

fn repo(store: &Arc<MemoryStore>) -> TokenRepository {
    let store: Arc<dyn SyncStore> = store.clone();
    TokenRepository::new(store)
}

#[tokio::test]
async fn test_no_source_row_means_no_tokens() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();

    let tokens = repo(&store)
        .get_user_tokens(user, DEFAULT_SOURCE_TYPE)
        .await
        .unwrap();
    assert!(tokens.is_none());
}

#[tokio::test]
async fn test_source_without_tokens_reads_as_none() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();
    seed_source(&store, user, None, None, None);

    let repo = repo(&store);
    assert!(repo
        .get_user_tokens(user, DEFAULT_SOURCE_TYPE)
        .await
        .unwrap()
        .is_none());
    // Missing tokens count as expired so the caller goes down the
    // refresh/re-auth path instead of calling the API with nothing.
    assert!(repo.is_token_expired(user, DEFAULT_SOURCE_TYPE).await.unwrap());
}

#[tokio::test]
async fn test_save_computes_expiry_from_expires_in() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();
    seed_source(&store, user, None, None, None);

    repo(&store)
        .save_user_tokens(user, "access", "refresh", Some(7200), DEFAULT_SOURCE_TYPE)
        .await
        .unwrap();

    let inner = store.inner.lock().unwrap();
    let record = inner
        .sources
        .get(&(user, DEFAULT_SOURCE_TYPE.to_string()))
        .unwrap();
    assert_eq!(record.access_token.as_deref(), Some("access"));
    let expires_at = record.token_expires_at.expect("expiry set");
    let expected = Utc::now() + Duration::seconds(7200);
    assert!((expires_at - expected).num_seconds().abs() < 5);
}

#[tokio::test]
async fn test_save_without_expiry_stores_non_expiring_token() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();
    seed_source(&store, user, None, None, None);

    let repo = repo(&store);
    repo.save_user_tokens(user, "access", "refresh", None, DEFAULT_SOURCE_TYPE)
        .await
        .unwrap();

    assert!(!repo.is_token_expired(user, DEFAULT_SOURCE_TYPE).await.unwrap());
    assert_eq!(
        repo.get_valid_access_token(user, DEFAULT_SOURCE_TYPE)
            .await
            .unwrap()
            .as_deref(),
        Some("access")
    );
}

#[tokio::test]
async fn test_save_without_source_row_is_a_noop() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();

    // No row to attach tokens to: logged, not an error.
    repo(&store)
        .save_user_tokens(user, "access", "refresh", Some(3600), DEFAULT_SOURCE_TYPE)
        .await
        .unwrap();

    assert!(store.inner.lock().unwrap().sources.is_empty());
}

#[tokio::test]
async fn test_valid_access_token_respects_expiry_buffer() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();
    let repo = repo(&store);

    // Expires in two minutes: inside the five-minute buffer.
    seed_source(
        &store,
        user,
        Some("closing"),
        Some("refresh"),
        Some(Utc::now() + Duration::minutes(2)),
    );
    assert!(repo
        .get_valid_access_token(user, DEFAULT_SOURCE_TYPE)
        .await
        .unwrap()
        .is_none());

    seed_source(
        &store,
        user,
        Some("healthy"),
        Some("refresh"),
        Some(Utc::now() + Duration::hours(1)),
    );
    assert_eq!(
        repo.get_valid_access_token(user, DEFAULT_SOURCE_TYPE)
            .await
            .unwrap()
            .as_deref(),
        Some("healthy")
    );
}

#[tokio::test]
async fn test_delete_clears_tokens_but_keeps_source_row() {
    let store = Arc::new(MemoryStore::default());
    let user = test_user();
    seed_source(
        &store,
        user,
        Some("access"),
        Some("refresh"),
        Some(Utc::now() + Duration::hours(1)),
    );

    repo(&store)
        .delete_tokens(user, DEFAULT_SOURCE_TYPE)
        .await
        .unwrap();

    let inner = store.inner.lock().unwrap();
    let record = inner
        .sources
        .get(&(user, DEFAULT_SOURCE_TYPE.to_string()))
        .expect("source row survives disconnect");
    assert!(record.access_token.is_none());
    assert!(record.refresh_token.is_none());
    assert!(record.token_expires_at.is_none());
}
