// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account operations: registration, login, logout, token refresh, password
//! change and profile/media updates.
//!
//! Handlers own HTTP concerns (multipart parsing, cookies, envelopes); this
//! layer owns the ordering of store, upload and session calls.

use crate::db::{UserStore, DUPLICATE_USER};
use crate::error::AppError;
use crate::models::{NewUser, UserLookup, UserPatch, UserProfile};
use crate::services::media::{StagedFile, UploadGateway};
use crate::services::password;
use crate::services::session::{SessionManager, SessionTokens};
use crate::time_utils::now_rfc3339;
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

/// Registration form fields.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(
        custom(function = "not_blank"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub full_name: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

/// Login request body. One of `username` / `email` is required.
#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Change-password request body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Update-details request body.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsInput {
    #[validate(custom(function = "not_blank"))]
    pub full_name: String,
    #[validate(
        custom(function = "not_blank"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("is required".into());
        return Err(err);
    }
    Ok(())
}

/// Successful login: the projection plus the new token pair.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub tokens: SessionTokens,
}

/// Orchestrates the record store, upload gateway and session manager.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
    uploads: UploadGateway,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        sessions: Arc<SessionManager>,
        uploads: UploadGateway,
    ) -> Self {
        Self {
            store,
            sessions,
            uploads,
        }
    }

    /// Create an account. The avatar is uploaded before anything is stored,
    /// so a failed upload leaves no partial user behind. A failed cover
    /// upload just leaves the cover empty.
    pub async fn register(
        &self,
        input: RegisterInput,
        avatar: Option<StagedFile>,
        cover_image: Option<StagedFile>,
    ) -> Result<UserProfile, AppError> {
        input.validate()?;

        let lookup = UserLookup::new(Some(&input.email), Some(&input.username));
        if self.store.find_one(&lookup).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
        }

        let avatar = avatar.ok_or_else(|| AppError::BadRequest("Avatar is required".into()))?;

        let avatar = self
            .uploads
            .upload(avatar)
            .await
            .ok_or_else(|| AppError::Upload("Failed to upload avatar image".into()))?;

        let cover_image_url = self
            .uploads
            .upload_optional(cover_image)
            .await
            .map(|media| media.url)
            .unwrap_or_default();

        let password_hash = password::hash(input.password).await?;

        let id = self
            .store
            .create(NewUser {
                email: input.email,
                username: input.username.trim().to_lowercase(),
                full_name: input.full_name.trim().to_string(),
                password_hash,
                avatar_url: avatar.url,
                cover_image_url,
            })
            .await?;

        let created = self.store.find_by_id(&id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Something went wrong while creating user {}",
                id
            ))
        })?;

        tracing::info!(user_id = %created.id, username = %created.username, "User registered");
        Ok(created.into())
    }

    /// Check credentials and start a new session.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AppError> {
        let lookup = UserLookup::new(input.email.as_deref(), input.username.as_deref());
        if lookup.is_empty() {
            return Err(AppError::BadRequest(
                "Username or email is required".into(),
            ));
        }

        let user = self
            .store
            .find_one(&lookup)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if !password::verify(input.password, user.password_hash.clone()).await? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials(
                "Invalid user credentials".into(),
            ));
        }

        let tokens = self.sessions.issue(&user.id).await?;

        let user = self
            .store
            .find_by_id(&user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            user: user.into(),
            tokens,
        })
    }

    /// End the user's session.
    pub async fn logout(&self, user_id: &str) -> Result<(), AppError> {
        self.sessions.invalidate(user_id).await
    }

    /// Exchange a refresh token for a new pair, invalidating the old one.
    pub async fn refresh(&self, candidate: Option<&str>) -> Result<SessionTokens, AppError> {
        let user_id = self.sessions.verify_refresh(candidate).await?;
        self.sessions.issue(&user_id).await
    }

    /// Replace the password after checking the old one. Nothing is written
    /// unless every check passes.
    pub async fn change_password(
        &self,
        user_id: &str,
        input: ChangePasswordInput,
    ) -> Result<(), AppError> {
        if input.new_password.trim().is_empty() {
            return Err(AppError::BadRequest("New password is required".into()));
        }
        if input.new_password != input.confirm_password {
            return Err(AppError::BadRequest(
                "New password and confirm password do not match".into(),
            ));
        }

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if !password::verify(input.old_password, user.password_hash).await? {
            return Err(AppError::InvalidCredentials("Invalid old password".into()));
        }

        let new_hash = password::hash(input.new_password).await?;
        self.store
            .update_by_id(user_id, &UserPatch::password_hash(new_hash).touched(now_rfc3339()))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// The caller's own profile.
    pub async fn current_user(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Update full name and email.
    pub async fn update_details(
        &self,
        user_id: &str,
        input: UpdateDetailsInput,
    ) -> Result<UserProfile, AppError> {
        input.validate()?;

        let patch = UserPatch::details(input.full_name.trim().to_string(), input.email)
            .touched(now_rfc3339());
        self.apply_patch(user_id, patch).await
    }

    /// Upload a new avatar, then point the record at it.
    pub async fn update_avatar(
        &self,
        user_id: &str,
        avatar: Option<StagedFile>,
    ) -> Result<UserProfile, AppError> {
        let avatar = avatar.ok_or_else(|| AppError::BadRequest("Avatar file is missing".into()))?;
        let media = self
            .uploads
            .upload(avatar)
            .await
            .ok_or_else(|| AppError::Upload("Failed to upload avatar image".into()))?;

        self.apply_patch(user_id, UserPatch::avatar_url(media.url).touched(now_rfc3339()))
            .await
    }

    /// Upload a new cover image, then point the record at it.
    pub async fn update_cover_image(
        &self,
        user_id: &str,
        cover_image: Option<StagedFile>,
    ) -> Result<UserProfile, AppError> {
        let cover_image = cover_image
            .ok_or_else(|| AppError::BadRequest("Cover image file is missing".into()))?;
        let media = self
            .uploads
            .upload(cover_image)
            .await
            .ok_or_else(|| AppError::Upload("Failed to upload cover image".into()))?;

        self.apply_patch(
            user_id,
            UserPatch::cover_image_url(media.url).touched(now_rfc3339()),
        )
        .await
    }

    async fn apply_patch(&self, user_id: &str, patch: UserPatch) -> Result<UserProfile, AppError> {
        let updated = self
            .store
            .update_by_id(user_id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        tracing::info!(user_id, fields = ?patch.field_names(), "User updated");
        Ok(updated.into())
    }
}
