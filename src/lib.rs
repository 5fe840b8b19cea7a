// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account service: registration, login and session management
//!
//! Users register with an avatar (stored on Cloudinary), log in for an
//! access/refresh token pair, and renew or end that session. User records
//! live in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod random;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserStore;
use services::{AccountService, MediaStorage, SessionManager, UploadGateway};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub sessions: Arc<SessionManager>,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire the services together over a store and media provider.
    pub fn new(config: Config, store: Arc<dyn UserStore>, media: Arc<dyn MediaStorage>) -> Self {
        let sessions = Arc::new(SessionManager::new(&config.session, store.clone()));
        let accounts =
            AccountService::new(store.clone(), sessions.clone(), UploadGateway::new(media));
        Self {
            config,
            store,
            sessions,
            accounts,
        }
    }
}
