// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to the services that need
//! it. Nothing below reads the environment at request time.

use std::env;
use std::path::PathBuf;

/// Default access token lifetime (15 minutes).
const DEFAULT_ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;
/// Default refresh token lifetime (10 days).
const DEFAULT_REFRESH_TOKEN_EXPIRY_SECS: i64 = 10 * 24 * 60 * 60;

/// Which record store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store, for local development only. Data is lost on restart.
    Memory,
}

/// Token signing parameters for the session manager.
#[derive(Clone)]
pub struct SessionConfig {
    /// HS256 secret for access tokens
    pub access_token_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_expiry_secs: i64,
    /// HS256 secret for refresh tokens (must differ from the access secret)
    pub refresh_token_secret: Vec<u8>,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry_secs: i64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .finish_non_exhaustive()
    }
}

/// Cloudinary credentials for avatar/cover uploads.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Record store backend
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Directory where multipart uploads are staged before going to Cloudinary
    pub upload_dir: PathBuf,

    // --- Secrets ---
    pub session: SessionConfig,
    pub cloudinary: CloudinaryConfig,
}

impl Config {
    /// Config with fixed values, for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            upload_dir: env::temp_dir().join("account-service-test-uploads"),
            session: SessionConfig {
                access_token_secret: b"test_access_secret_32_bytes_min!".to_vec(),
                access_token_expiry_secs: DEFAULT_ACCESS_TOKEN_EXPIRY_SECS,
                refresh_token_secret: b"test_refresh_secret_32_bytes_min".to_vec(),
                refresh_token_expiry_secs: DEFAULT_REFRESH_TOKEN_EXPIRY_SECS,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test_api_key".to_string(),
                api_secret: "test_api_secret".to_string(),
            },
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Err(_) | Ok("firestore") => StoreBackend::Firestore,
            Ok("memory") => StoreBackend::Memory,
            Ok(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let session = SessionConfig {
            access_token_secret: required("ACCESS_TOKEN_SECRET")?.into_bytes(),
            access_token_expiry_secs: parse_or(
                "ACCESS_TOKEN_EXPIRY_SECS",
                DEFAULT_ACCESS_TOKEN_EXPIRY_SECS,
            )?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?.into_bytes(),
            refresh_token_expiry_secs: parse_or(
                "REFRESH_TOKEN_EXPIRY_SECS",
                DEFAULT_REFRESH_TOKEN_EXPIRY_SECS,
            )?,
        };

        if session.access_token_secret == session.refresh_token_secret {
            return Err(ConfigError::Invalid("REFRESH_TOKEN_SECRET"));
        }
        if session.access_token_expiry_secs <= 0 {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_EXPIRY_SECS"));
        }
        if session.refresh_token_expiry_secs <= 0 {
            return Err(ConfigError::Invalid("REFRESH_TOKEN_EXPIRY_SECS"));
        }

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            store_backend,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public/temp")),
            session,
            cloudinary: CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            },
        })
    }
}

/// Read a required, non-empty variable (whitespace trimmed).
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so everything that touches
    // them lives in this single test.
    #[test]
    fn test_config_from_env() {
        env::set_var("ACCESS_TOKEN_SECRET", "access_secret");
        env::set_var("REFRESH_TOKEN_SECRET", "refresh_secret");
        env::set_var("CLOUDINARY_CLOUD_NAME", "demo");
        env::set_var("CLOUDINARY_API_KEY", "key");
        env::set_var("CLOUDINARY_API_SECRET", "secret");
        env::set_var("STORE_BACKEND", "memory");
        env::remove_var("ACCESS_TOKEN_EXPIRY_SECS");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.session.access_token_secret, b"access_secret");
        assert_eq!(
            config.session.access_token_expiry_secs,
            DEFAULT_ACCESS_TOKEN_EXPIRY_SECS
        );
        assert_eq!(config.cloudinary.cloud_name, "demo");

        // Reusing one secret for both token kinds is rejected
        env::set_var("REFRESH_TOKEN_SECRET", "access_secret");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("REFRESH_TOKEN_SECRET"))
        ));
        env::set_var("REFRESH_TOKEN_SECRET", "refresh_secret");

        env::set_var("ACCESS_TOKEN_EXPIRY_SECS", "soon");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("ACCESS_TOKEN_EXPIRY_SECS"))
        ));
        env::remove_var("ACCESS_TOKEN_EXPIRY_SECS");

        env::remove_var("CLOUDINARY_API_SECRET");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("CLOUDINARY_API_SECRET"))
        ));
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let config = Config::test_default();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("test_access_secret"));
        assert!(!debug.contains("test_api_secret"));
    }
}
