// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media upload gateway for avatar and cover images.
//!
//! Multipart files are staged on local disk as [`StagedFile`]s, then pushed to
//! external storage (Cloudinary). The local copy is removed exactly once no
//! matter how the upload ends, including when the request is dropped.

use crate::config::CloudinaryConfig;
use crate::error::AppError;
use crate::random::random_hex;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Longest file extension kept from the client-supplied name.
const MAX_EXTENSION_LEN: usize = 8;

/// A local temp file that is deleted when dropped.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    /// Write `bytes` into `dir` under a random name, keeping a sanitized
    /// extension from the original file name.
    pub async fn write(
        dir: &Path,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {}", e))
        })?;

        let mut name = random_hex(16)?;
        if let Some(ext) = original_name.and_then(sanitized_extension) {
            name.push('.');
            name.push_str(&ext);
        }

        let path = dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the local file now.
    pub async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged file");
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn sanitized_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// A file stored by the external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

/// External storage provider.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Upload the file at `path`. Must not delete it; the gateway does that.
    async fn store(&self, path: &Path) -> Result<UploadedMedia, AppError>;
}

/// Cloudinary signed-upload client.
#[derive(Clone)]
pub struct CloudinaryStorage {
    http: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryStorage {
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/auto/upload",
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Cloudinary request signature: sorted `key=value` pairs joined by `&`,
    /// followed by the API secret, SHA-256 hex encoded.
    fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
        let mut params = params.to_vec();
        params.sort_by(|a, b| a.0.cmp(b.0));
        let joined = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl MediaStorage for CloudinaryStorage {
    async fn store(&self, path: &Path) -> Result<UploadedMedia, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Upload(format!("Failed to read staged file: {}", e)))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = Self::sign(&[("timestamp", timestamp.as_str())], &self.api_secret);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Cloudinary request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("Invalid Cloudinary response: {}", e)))?;

        Ok(UploadedMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

/// Uploads staged files and always cleans them up.
#[derive(Clone)]
pub struct UploadGateway {
    storage: Arc<dyn MediaStorage>,
}

impl UploadGateway {
    pub fn new(storage: Arc<dyn MediaStorage>) -> Self {
        Self { storage }
    }

    /// Upload `file`, then delete it locally. `None` on any provider failure.
    pub async fn upload(&self, file: StagedFile) -> Option<UploadedMedia> {
        let result = self.storage.store(file.path()).await;
        file.remove().await;

        match result {
            Ok(media) => {
                tracing::info!(public_id = %media.public_id, "Media uploaded");
                Some(media)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Media upload failed");
                None
            }
        }
    }

    /// Like [`upload`](Self::upload), but a missing file is simply `None`.
    pub async fn upload_optional(&self, file: Option<StagedFile>) -> Option<UploadedMedia> {
        match file {
            Some(file) => self.upload(file).await,
            None => None,
        }
    }
}
