// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token authentication middleware.

use crate::error::AppError;
use crate::models::UserProfile;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Name of the access token cookie.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Authenticated user, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub profile: UserProfile,
}

/// Middleware that requires a valid access token and an existing user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = match jar.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => bearer_token(&request).ok_or(AppError::AuthRequired)?,
    };

    let claims = state.sessions.verify_access(&token)?;

    let user = state.store.find_by_id(&claims.sub).await?.ok_or_else(|| {
        tracing::info!(user_id = %claims.sub, "Access token for unknown user");
        AppError::InvalidSession
    })?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id.clone(),
        profile: user.into(),
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
