// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use account_service::config::Config;
use account_service::db::{FirestoreDb, MemoryStore};
use account_service::error::AppError;
use account_service::routes::create_router;
use account_service::services::{MediaStorage, UploadedMedia};
use account_service::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const BOUNDARY: &str = "account-service-test-boundary";
pub const PASSWORD: &str = "correct-horse-battery-staple";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Media storage double. Succeeds unless told to fail, and records what it saw.
#[derive(Default)]
pub struct FakeStorage {
    fail: AtomicBool,
    uploads: AtomicUsize,
}

#[allow(dead_code)]
impl FakeStorage {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStorage for FakeStorage {
    async fn store(&self, path: &Path) -> Result<UploadedMedia, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Upload("fake provider unavailable".to_string()));
        }
        assert!(path.exists(), "staged file must exist during upload");

        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        Ok(UploadedMedia {
            url: format!("https://media.test/{}/{}", n, name),
            public_id: format!("media-{}", n),
        })
    }
}

/// App wired to an in-memory store and fake media storage.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub media: Arc<FakeStorage>,
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = MemoryStore::new();
    let media = Arc::new(FakeStorage::default());
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(store.clone()),
        media.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        media,
    }
}

/// Build a multipart/form-data body.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub fn multipart_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Registration request for `username` with an avatar attached.
#[allow(dead_code)]
pub fn register_request(email: &str, username: &str) -> Request<Body> {
    let body = multipart_body(
        &[
            ("email", email),
            ("username", username),
            ("fullName", "Test User"),
            ("password", PASSWORD),
        ],
        &[("avatar", "avatar.png", &b"\x89PNG fake avatar"[..])],
    );
    multipart_request("POST", "/api/v1/users/register", body)
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// The value part of a `Set-Cookie` header.
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    let pair = set_cookie.split(';').next().unwrap();
    pair.split_once('=').unwrap().1.to_string()
}
