// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed user record store.
//!
//! Firestore has no unique indexes. Every email and username is claimed by a
//! reservation document in `user_keys`, written in the same transaction as
//! the user with an `Exists(false)` precondition, so of two racing writers
//! only one can commit.

use crate::db::{collections, UserStore, DUPLICATE_USER};
use crate::error::AppError;
use crate::models::{NewUser, User, UserLookup, UserPatch};
use crate::random::new_record_id;
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any bearer token; hand it an unsigned one.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client. Every operation fails with a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<User>, AppError> {
        if lookup.is_empty() {
            return Ok(None);
        }

        let email = lookup.email.clone();
        let username = lookup.username.clone();

        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_any([
                    email.clone().and_then(|e| q.field("email").eq(e)),
                    username.clone().and_then(|u| q.field("username").eq(u)),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn create(&self, user: NewUser) -> Result<String, AppError> {
        // Records written before reservations existed are only caught here
        let lookup = UserLookup::new(Some(&user.email), Some(&user.username));
        if self.find_one(&lookup).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
        }

        let id = new_record_id()?;
        let user = user.into_user(id.clone(), now_rfc3339());
        let keys = [
            reservation_id(EMAIL_KEY, &user.email),
            reservation_id(USERNAME_KEY, &user.username),
        ];
        let owner = UserKey {
            user_id: id.clone(),
        };

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for key in &keys {
            client
                .fluent()
                .update()
                .in_col(collections::USER_KEYS)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(key)
                .object(&owner)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add reservation to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add user to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            return Err(self.commit_failure(&keys, e).await);
        }

        tracing::debug!(user_id = %id, "User document created");
        Ok(id)
    }

    async fn update_by_id(&self, id: &str, patch: &UserPatch) -> Result<Option<User>, AppError> {
        // Firestore updates are upserts; refuse to create a partial document.
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let fields = patch.field_names();
        if fields.is_empty() {
            return Ok(Some(existing));
        }

        let new_email = patch.email.as_deref().filter(|e| *e != existing.email);
        if let Some(email) = new_email {
            if let Some(other) = self.find_one(&UserLookup::by_email(email)).await? {
                if other.id != id {
                    return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
                }
            }
        }

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // An email change moves the reservation inside the same commit
        let mut reserved = Vec::new();
        if let Some(email) = new_email {
            let key = reservation_id(EMAIL_KEY, email);
            client
                .fluent()
                .update()
                .in_col(collections::USER_KEYS)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(&key)
                .object(&UserKey {
                    user_id: id.to_string(),
                })
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add reservation to transaction: {}", e))
                })?;
            reserved.push(key);

            client
                .fluent()
                .delete()
                .from(collections::USER_KEYS)
                .document_id(reservation_id(EMAIL_KEY, &existing.email))
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add release to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(patch)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add update to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            if reserved.is_empty() && self.find_by_id(id).await?.is_none() {
                // Deleted between the read and the commit
                return Ok(None);
            }
            return Err(self.commit_failure(&reserved, e).await);
        }

        self.find_by_id(id).await
    }
}

/// Reservation document holding a unique email or username.
#[derive(Serialize, Deserialize)]
struct UserKey {
    user_id: String,
}

const EMAIL_KEY: &str = "email";
const USERNAME_KEY: &str = "username";

/// Document id for a uniqueness reservation. Hashed because emails may
/// contain characters Firestore does not allow in ids.
fn reservation_id(kind: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

impl FirestoreDb {
    /// Map a failed commit: a reservation that now exists means another
    /// writer took the email or username first.
    async fn commit_failure(&self, keys: &[String], error: FirestoreError) -> AppError {
        if let Ok(client) = self.get_client() {
            for key in keys {
                let owner: Option<UserKey> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::USER_KEYS)
                    .obj()
                    .one(key)
                    .await
                    .unwrap_or(None);
                if owner.is_some() {
                    return AppError::Conflict(DUPLICATE_USER.to_string());
                }
            }
        }
        AppError::Database(format!("Transaction commit failed: {}", error))
    }
}
