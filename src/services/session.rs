// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token lifecycle: issue, verify, rotate, invalidate.
//!
//! A session is an access/refresh JWT pair. Only the refresh token is
//! persisted, on the user's record, and only one is valid at a time: a
//! refresh token must both verify cryptographically and equal the stored
//! value. Issuing a new pair overwrites the stored value, which invalidates
//! the previous refresh token even though its signature is still good.
//!
//! Concurrent `issue` calls for one user are last-write-wins on the stored
//! field; whichever pair was written last is the live session.

use crate::config::SessionConfig;
use crate::db::UserStore;
use crate::error::AppError;
use crate::models::UserPatch;
use crate::random::random_hex;
use crate::time_utils::{now_rfc3339, unix_now};
use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// JWT claims for both token kinds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Random token id; keeps pairs issued in the same second distinct
    pub jti: String,
}

/// A freshly issued token pair.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionTokens { .. }")
    }
}

/// HS256 signer/verifier for one token kind.
struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenSigner {
    fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    fn sign(&self, user_id: &str) -> anyhow::Result<String> {
        let now = unix_now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
            jti: random_hex(16)?,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

/// Issues and validates session tokens against the user record store.
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    access: TokenSigner,
    refresh: TokenSigner,
}

impl SessionManager {
    pub fn new(config: &SessionConfig, store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            access: TokenSigner::new(
                &config.access_token_secret,
                config.access_token_expiry_secs,
            ),
            refresh: TokenSigner::new(
                &config.refresh_token_secret,
                config.refresh_token_expiry_secs,
            ),
        }
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access.ttl_secs
    }

    pub fn refresh_token_ttl_secs(&self) -> i64 {
        self.refresh.ttl_secs
    }

    /// Issue a new token pair for `user_id` and persist the refresh token,
    /// replacing whatever session the user had.
    ///
    /// Any failure is a server fault; nothing is returned unless the refresh
    /// token was stored.
    pub async fn issue(&self, user_id: &str) -> Result<SessionTokens, AppError> {
        self.try_issue(user_id).await.map_err(|e| {
            tracing::error!(user_id, error = %format!("{:#}", e), "Failed to issue session tokens");
            AppError::Internal(anyhow::anyhow!(
                "Something went wrong while generating tokens"
            ))
        })
    }

    async fn try_issue(&self, user_id: &str) -> anyhow::Result<SessionTokens> {
        self.store
            .find_by_id(user_id)
            .await
            .context("loading user")?
            .context("user does not exist")?;

        let access_token = self.access.sign(user_id).context("signing access token")?;
        let refresh_token = self.refresh.sign(user_id).context("signing refresh token")?;

        let patch = UserPatch::refresh_token(Some(refresh_token.clone())).touched(now_rfc3339());
        self.store
            .update_by_id(user_id, &patch)
            .await
            .context("persisting refresh token")?
            .context("user disappeared before refresh token was stored")?;

        tracing::debug!(user_id, "Session tokens issued");

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Check a presented refresh token and return its user id.
    ///
    /// Never mutates state; callers rotate by calling [`issue`](Self::issue).
    pub async fn verify_refresh(&self, candidate: Option<&str>) -> Result<String, AppError> {
        let candidate = candidate
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::AuthRequired)?;

        let claims = self.refresh.decode(candidate).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token failed verification");
            AppError::InvalidSession
        })?;

        let user = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::debug!(user_id = %claims.sub, "Refresh token for unknown user");
                AppError::InvalidSession
            })?;

        let matches = user
            .refresh_token
            .as_deref()
            .map(|stored| bool::from(stored.as_bytes().ct_eq(candidate.as_bytes())))
            .unwrap_or(false);

        if !matches {
            tracing::info!(user_id = %user.id, "Refresh token is not the current session");
            return Err(AppError::InvalidSession);
        }

        Ok(user.id)
    }

    /// Decode an access token. Does not touch the store.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        self.access.decode(token).map_err(|e| {
            tracing::debug!(error = %e, "Access token failed verification");
            AppError::InvalidSession
        })
    }

    /// Clear the stored refresh token. Succeeds if there was no session.
    pub async fn invalidate(&self, user_id: &str) -> Result<(), AppError> {
        let patch = UserPatch::refresh_token(None).touched(now_rfc3339());
        match self.store.update_by_id(user_id, &patch).await? {
            Some(_) => tracing::info!(user_id, "Session invalidated"),
            None => tracing::warn!(user_id, "Invalidate for unknown user"),
        }
        Ok(())
    }
}
