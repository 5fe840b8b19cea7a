// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle tests against the in-memory store.

use account_service::config::Config;
use account_service::db::{MemoryStore, UserStore};
use account_service::error::AppError;
use account_service::models::{NewUser, User, UserLookup, UserPatch};
use account_service::services::{Claims, SessionManager};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;

fn new_user(name: &str) -> NewUser {
    NewUser {
        email: format!("{name}@example.com"),
        username: name.to_string(),
        full_name: "Session Tester".to_string(),
        password_hash: "not-a-real-hash".to_string(),
        avatar_url: "https://media.test/avatar.png".to_string(),
        cover_image_url: String::new(),
    }
}

async fn setup(name: &str) -> (SessionManager, MemoryStore, String) {
    let store = MemoryStore::new();
    let id = store.create(new_user(name)).await.unwrap();
    let manager = SessionManager::new(&Config::test_default().session, Arc::new(store.clone()));
    (manager, store, id)
}

async fn stored_token(store: &MemoryStore, id: &str) -> Option<String> {
    store.find_by_id(id).await.unwrap().unwrap().refresh_token
}

#[tokio::test]
async fn test_issue_persists_refresh_token() {
    let (manager, store, id) = setup("alice").await;

    let tokens = manager.issue(&id).await.unwrap();

    assert_ne!(tokens.access_token, tokens.refresh_token);
    assert_eq!(stored_token(&store, &id).await, Some(tokens.refresh_token.clone()));

    let claims = manager.verify_access(&tokens.access_token).unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(manager.verify_refresh(Some(&tokens.refresh_token)).await.unwrap(), id);
}

#[tokio::test]
async fn test_reissue_invalidates_previous_refresh_token() {
    let (manager, store, id) = setup("bob").await;

    let first = manager.issue(&id).await.unwrap();
    let second = manager.issue(&id).await.unwrap();

    assert_ne!(first.refresh_token, second.refresh_token);
    assert!(matches!(
        manager.verify_refresh(Some(&first.refresh_token)).await,
        Err(AppError::InvalidSession)
    ));
    assert_eq!(manager.verify_refresh(Some(&second.refresh_token)).await.unwrap(), id);
    assert_eq!(stored_token(&store, &id).await, Some(second.refresh_token));
}

#[tokio::test]
async fn test_invalidate_clears_session() {
    let (manager, store, id) = setup("carol").await;
    let tokens = manager.issue(&id).await.unwrap();

    manager.invalidate(&id).await.unwrap();

    assert_eq!(stored_token(&store, &id).await, None);
    assert!(matches!(
        manager.verify_refresh(Some(&tokens.refresh_token)).await,
        Err(AppError::InvalidSession)
    ));

    // Idempotent, and fine for users that do not exist
    manager.invalidate(&id).await.unwrap();
    manager.invalidate("no-such-user").await.unwrap();
}

#[tokio::test]
async fn test_refresh_verification_leaves_store_untouched() {
    let (manager, store, id) = setup("dave").await;
    let tokens = manager.issue(&id).await.unwrap();
    let before = store.find_by_id(&id).await.unwrap().unwrap();

    manager.verify_refresh(Some(&tokens.refresh_token)).await.unwrap();
    let _ = manager.verify_refresh(Some("garbage")).await;

    assert_eq!(store.find_by_id(&id).await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_refresh_rejects_forged_and_cross_kind_tokens() {
    let (manager, _store, id) = setup("erin").await;
    let tokens = manager.issue(&id).await.unwrap();

    // An access token is signed with a different secret
    assert!(matches!(
        manager.verify_refresh(Some(&tokens.access_token)).await,
        Err(AppError::InvalidSession)
    ));

    // Flip one character in the middle of the signature
    let mut chars: Vec<char> = tokens.refresh_token.chars().collect();
    let i = chars.len() - 10;
    chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
    let forged: String = chars.into_iter().collect();
    assert!(matches!(
        manager.verify_refresh(Some(&forged)).await,
        Err(AppError::InvalidSession)
    ));

    // The genuine token still works
    assert!(manager.verify_refresh(Some(&tokens.refresh_token)).await.is_ok());
}

#[tokio::test]
async fn test_expired_refresh_token_rejected() {
    let (manager, store, id) = setup("eve").await;
    let config = Config::test_default();

    let now = chrono::Utc::now().timestamp() as usize;
    // Well past the default 60 second leeway
    let claims = Claims {
        sub: id.clone(),
        iat: now - 600,
        exp: now - 300,
        jti: "expired".to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.session.refresh_token_secret),
    )
    .unwrap();

    // Stored as the live session, so only expiry can reject it
    store
        .update_by_id(&id, &UserPatch::refresh_token(Some(token.clone())))
        .await
        .unwrap();

    assert!(matches!(
        manager.verify_refresh(Some(&token)).await,
        Err(AppError::InvalidSession)
    ));
    assert_eq!(stored_token(&store, &id).await, Some(token));
}

#[tokio::test]
async fn test_refresh_token_for_deleted_store_entry() {
    let (manager, _store, id) = setup("frank").await;
    let tokens = manager.issue(&id).await.unwrap();

    // Same secrets, but a store that has never heard of this user
    let other = SessionManager::new(
        &Config::test_default().session,
        Arc::new(MemoryStore::new()),
    );
    assert!(matches!(
        other.verify_refresh(Some(&tokens.refresh_token)).await,
        Err(AppError::InvalidSession)
    ));
}

#[tokio::test]
async fn test_concurrent_issues_leave_exactly_one_live_session() {
    let (manager, store, id) = setup("grace").await;
    let manager = Arc::new(manager);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move { manager.issue(&id).await.unwrap() }));
    }

    let mut issued = Vec::new();
    for handle in handles {
        issued.push(handle.await.unwrap());
    }

    let stored = stored_token(&store, &id).await.unwrap();
    let mut live = 0;
    for tokens in &issued {
        if manager.verify_refresh(Some(&tokens.refresh_token)).await.is_ok() {
            assert_eq!(tokens.refresh_token, stored);
            live += 1;
        }
    }
    assert_eq!(live, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE FAILURES
// ═══════════════════════════════════════════════════════════════════════════

/// Reads work, writes fail.
struct ReadOnlyStore(MemoryStore);

#[async_trait]
impl UserStore for ReadOnlyStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.0.find_by_id(id).await
    }

    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<User>, AppError> {
        self.0.find_one(lookup).await
    }

    async fn create(&self, _user: NewUser) -> Result<String, AppError> {
        Err(AppError::Database("read-only".to_string()))
    }

    async fn update_by_id(&self, _id: &str, _patch: &UserPatch) -> Result<Option<User>, AppError> {
        Err(AppError::Database("read-only".to_string()))
    }
}

#[tokio::test]
async fn test_issue_fails_when_token_cannot_be_stored() {
    let inner = MemoryStore::new();
    let id = inner.create(new_user("heidi")).await.unwrap();
    let manager = SessionManager::new(
        &Config::test_default().session,
        Arc::new(ReadOnlyStore(inner.clone())),
    );

    let err = manager.issue(&id).await.unwrap_err();
    assert!(err.is_server_fault());
    assert_eq!(
        err.to_string(),
        "Internal server error: Something went wrong while generating tokens"
    );
    assert_eq!(stored_token(&inner, &id).await, None);
}

#[tokio::test]
async fn test_invalidate_propagates_store_failure() {
    let inner = MemoryStore::new();
    let id = inner.create(new_user("ivan")).await.unwrap();
    let manager = SessionManager::new(
        &Config::test_default().session,
        Arc::new(ReadOnlyStore(inner)),
    );

    assert!(matches!(
        manager.invalidate(&id).await,
        Err(AppError::Database(_))
    ));
}
