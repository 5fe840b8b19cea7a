// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account Service API Server
//!
//! User registration, login and session renewal backed by Firestore, with
//! avatar and cover images stored on Cloudinary.

use account_service::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, UserStore},
    services::{CloudinaryStorage, MediaStorage},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting account service");

    let store: Arc<dyn UserStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!(path = %config.upload_dir.display(), "Upload staging directory ready");

    let media: Arc<dyn MediaStorage> = Arc::new(CloudinaryStorage::new(&config.cloudinary));
    tracing::info!(cloud = %config.cloudinary.cloud_name, "Cloudinary storage initialized");

    let state = Arc::new(AppState::new(config.clone(), store, media));

    // Build router
    let app = account_service::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("account_service=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
