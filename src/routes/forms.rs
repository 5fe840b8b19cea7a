// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request body helpers: JSON with enveloped errors, and multipart forms
//! whose file parts are staged to disk.

use crate::error::{AppError, Result};
use crate::services::StagedFile;
use axum::extract::{rejection::JsonRejection, Multipart};
use axum::Json;
use std::collections::HashMap;
use std::path::Path;

/// Unwrap a JSON body, turning a rejection into a 400 envelope.
pub fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// A parsed multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    /// Text field value, empty if absent.
    pub fn text(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }

    pub fn file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

/// Read a multipart form. Parts named in `file_fields` are written to
/// `upload_dir`; empty file parts are ignored. Everything else is read as text.
pub async fn read_multipart(
    mut multipart: Multipart,
    upload_dir: &Path,
    file_fields: &[&str],
) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if file_fields.contains(&name.as_str()) {
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if data.is_empty() {
                continue;
            }
            let staged = StagedFile::write(upload_dir, file_name.as_deref(), &data).await?;
            // A repeated part replaces the earlier one, whose file is dropped
            form.files.insert(name, staged);
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}
