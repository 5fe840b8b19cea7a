// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process user record store for local development and tests.

use crate::db::{UserStore, DUPLICATE_USER};
use crate::error::AppError;
use crate::models::{NewUser, User, UserLookup, UserPatch};
use crate::random::new_record_id;
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// DashMap-backed store. Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    /// Serializes writes that must check uniqueness first.
    write_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn find_matching(&self, lookup: &UserLookup) -> Option<User> {
        if lookup.is_empty() {
            return None;
        }
        self.users
            .iter()
            .find(|entry| lookup.matches(entry.value()))
            .map(|entry| entry.value().clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, AppError> {
        self.write_lock
            .lock()
            .map_err(|_| AppError::Database("Memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<User>, AppError> {
        Ok(self.find_matching(lookup))
    }

    async fn create(&self, user: NewUser) -> Result<String, AppError> {
        let _guard = self.lock()?;

        let lookup = UserLookup::new(Some(&user.email), Some(&user.username));
        if self.find_matching(&lookup).is_some() {
            return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
        }

        let id = new_record_id()?;
        let user = user.into_user(id.clone(), now_rfc3339());
        self.users.insert(id.clone(), user);
        Ok(id)
    }

    async fn update_by_id(&self, id: &str, patch: &UserPatch) -> Result<Option<User>, AppError> {
        let _guard = self.lock()?;

        if !self.users.contains_key(id) {
            return Ok(None);
        }

        // Check before taking the entry lock; iterating while holding it deadlocks.
        if let Some(email) = &patch.email {
            let taken = self
                .users
                .iter()
                .any(|entry| entry.key() != id && &entry.value().email == email);
            if taken {
                return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
            }
        }

        Ok(self.users.get_mut(id).map(|mut entry| {
            patch.apply(entry.value_mut());
            entry.value().clone()
        }))
    }
}
