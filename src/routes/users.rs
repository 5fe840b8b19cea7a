// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and profile routes.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::response::ApiResponse;
use crate::routes::forms::{json_body, read_multipart};
use crate::services::accounts::{RegisterInput, UpdateDetailsInput};
use crate::AppState;

const AVATAR_FIELD: &str = "avatar";
const COVER_IMAGE_FIELD: &str = "coverImage";

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/register", post(register))
}

/// Routes behind `require_auth` (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/current-user", get(current_user))
        .route("/update-details", patch(update_details))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
}

/// POST /register - multipart form with `avatar` (required) and
/// `coverImage` (optional) files.
async fn register(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ApiResponse<UserProfile>> {
    let mut form = read_multipart(
        multipart,
        &state.config.upload_dir,
        &[AVATAR_FIELD, COVER_IMAGE_FIELD],
    )
    .await?;

    let input = RegisterInput {
        email: form.text("email"),
        username: form.text("username"),
        full_name: form.text("fullName"),
        password: form.text("password"),
    };

    let user = state
        .accounts
        .register(input, form.file(AVATAR_FIELD), form.file(COVER_IMAGE_FIELD))
        .await?;

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        user,
        "User registered successfully",
    ))
}

/// GET /current-user
async fn current_user(Extension(user): Extension<AuthUser>) -> ApiResponse<UserProfile> {
    ApiResponse::ok(user.profile, "Current user fetched successfully")
}

/// PATCH /update-details - full name and email.
async fn update_details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<UpdateDetailsInput>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>> {
    let profile = state
        .accounts
        .update_details(&user.user_id, json_body(body)?)
        .await?;

    Ok(ApiResponse::ok(profile, "User details updated successfully"))
}

/// PATCH /avatar - multipart form with an `avatar` file.
async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<ApiResponse<UserProfile>> {
    let mut form = read_multipart(multipart, &state.config.upload_dir, &[AVATAR_FIELD]).await?;

    let profile = state
        .accounts
        .update_avatar(&user.user_id, form.file(AVATAR_FIELD))
        .await?;

    Ok(ApiResponse::ok(profile, "User avatar updated successfully"))
}

/// PATCH /cover-image - multipart form with a `coverImage` file.
async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<ApiResponse<UserProfile>> {
    let mut form =
        read_multipart(multipart, &state.config.upload_dir, &[COVER_IMAGE_FIELD]).await?;

    let profile = state
        .accounts
        .update_cover_image(&user.user_id, form.file(COVER_IMAGE_FIELD))
        .await?;

    Ok(ApiResponse::ok(profile, "Cover image updated successfully"))
}
