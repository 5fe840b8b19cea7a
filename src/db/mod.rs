// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the user record store and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{NewUser, User, UserLookup, UserPatch};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email and username reservations, one document per unique value
    pub const USER_KEYS: &str = "user_keys";
}

/// Message used for every uniqueness violation.
pub const DUPLICATE_USER: &str = "User already exists with this email or username";

/// Persistence for user documents.
///
/// "Not found" is `Ok(None)`, never an error. Email and username are unique
/// across all records; a write that would break that returns
/// [`AppError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Find a user whose email or username matches the lookup.
    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<User>, AppError>;

    /// Store a new user and return its assigned id.
    async fn create(&self, user: NewUser) -> Result<String, AppError>;

    /// Write only the fields set in `patch`. Returns the updated record, or
    /// `None` if no user has this id.
    async fn update_by_id(&self, id: &str, patch: &UserPatch) -> Result<Option<User>, AppError>;
}
