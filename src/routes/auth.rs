// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: login, logout, token refresh and password change.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::response::ApiResponse;
use crate::routes::cookies::{self, REFRESH_TOKEN_COOKIE};
use crate::routes::forms::json_body;
use crate::services::accounts::{ChangePasswordInput, LoginInput};
use crate::services::SessionTokens;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes behind `require_auth` (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}

/// Login response data.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Optional body for `/refresh-token` when the cookie is not available.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenBody {
    refresh_token: Option<String>,
}

fn set_session_cookies(state: &AppState, jar: CookieJar, tokens: &SessionTokens) -> CookieJar {
    cookies::with_session(
        jar,
        tokens,
        state.sessions.access_token_ttl_secs(),
        state.sessions.refresh_token_ttl_secs(),
    )
}

/// POST /login - verify credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: std::result::Result<Json<LoginInput>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let outcome = state.accounts.login(json_body(body)?).await?;

    let jar = set_session_cookies(&state, jar, &outcome.tokens);
    let data = LoginResponse {
        user: outcome.user,
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
    };

    Ok((jar, ApiResponse::ok(data, "User logged in successfully")))
}

/// POST /logout - clear the stored session and both cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state.accounts.logout(&user.user_id).await?;

    Ok((
        cookies::without_session(jar),
        ApiResponse::ok(serde_json::json!({}), "User logged out successfully"),
    ))
}

/// POST /refresh-token - rotate the session.
///
/// The refresh token comes from the cookie, or from the JSON body when no
/// cookie is present.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<SessionTokens>)> {
    let candidate = match jar.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => Some(cookie.value().to_string()),
        _ if body.is_empty() => None,
        _ => serde_json::from_slice::<RefreshTokenBody>(&body)
            .ok()
            .and_then(|b| b.refresh_token),
    };

    let tokens = state.accounts.refresh(candidate.as_deref()).await?;
    let jar = set_session_cookies(&state, jar, &tokens);

    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed successfully")))
}

/// POST /change-password
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<ChangePasswordInput>, JsonRejection>,
) -> Result<ApiResponse<serde_json::Value>> {
    state
        .accounts
        .change_password(&user.user_id, json_body(body)?)
        .await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}
