// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use account_service::error::AppError;
use axum::http::StatusCode;
use axum::response::IntoResponse;

async fn envelope(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_client_errors_carry_their_message() {
    let (status, body) = envelope(AppError::Conflict(
        "User already exists with this email or username".to_string(),
    ))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "User already exists with this email or username"
    );
    assert!(body.get("errors").is_none());

    let (status, body) = envelope(AppError::NotFound("User not found".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_validation_errors_are_listed() {
    let (status, body) = envelope(AppError::Validation(vec![
        "email: must be a valid email address".to_string(),
        "username: is required".to_string(),
    ]))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_faults_hide_details() {
    let (status, body) = envelope(AppError::Database("connection refused to 10.0.0.5".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");

    let (status, body) = envelope(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.to_string().contains("secret detail"));
}

#[tokio::test]
async fn test_upload_failure_message_is_shown() {
    let (status, body) = envelope(AppError::Upload("Failed to upload avatar image".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to upload avatar image");
}

#[test]
fn test_session_errors_are_unauthorized() {
    for err in [
        AppError::AuthRequired,
        AppError::InvalidSession,
        AppError::InvalidCredentials("Invalid user credentials".to_string()),
    ] {
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(!err.is_server_fault());
    }
}
