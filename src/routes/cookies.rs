// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookies.
//!
//! Both tokens travel as `HttpOnly; Secure; SameSite=Lax` cookies on `/`.
//! Removal cookies carry the same attributes so browsers match them.

use crate::middleware::auth::ACCESS_TOKEN_COOKIE;
use crate::services::SessionTokens;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the refresh token cookie.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Add both session cookies to the jar.
pub fn with_session(
    jar: CookieJar,
    tokens: &SessionTokens,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        access_ttl_secs,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        refresh_ttl_secs,
    ))
}

/// Expire both session cookies, whether or not the request carried them.
pub fn without_session(jar: CookieJar) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0))
}
