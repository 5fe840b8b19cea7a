//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User document stored in the record store.
///
/// Holds the password hash and the current refresh token, so it is never
/// serialized into an API response. Use [`UserProfile`] for that.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Store-assigned id (also used as document ID)
    pub id: String,
    /// Email address, unique and case-sensitive as stored
    pub email: String,
    /// Username, unique and lowercased at creation
    pub username: String,
    pub full_name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Avatar URL (required)
    pub avatar_url: String,
    /// Cover image URL, empty when none was uploaded
    #[serde(default)]
    pub cover_image_url: String,
    /// The single currently-valid refresh token, if a session is active
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("avatar_url", &self.avatar_url)
            .field("cover_image_url", &self.cover_image_url)
            .field("has_session", &self.refresh_token.is_some())
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Public projection of a user. Never carries the password hash or refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
    #[serde(rename = "coverImage")]
    pub cover_image_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields for a user that has not been stored yet.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: String,
}

impl NewUser {
    /// Build the stored document. The username is lowercased here so every
    /// backend stores the same normalized form.
    pub fn into_user(self, id: String, now: String) -> User {
        User {
            id,
            email: self.email,
            username: self.username.to_lowercase(),
            full_name: self.full_name,
            password_hash: self.password_hash,
            avatar_url: self.avatar_url,
            cover_image_url: self.cover_image_url,
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Lookup by email OR username. A record matches when any provided field matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLookup {
    pub email: Option<String>,
    /// Always lowercased
    pub username: Option<String>,
}

impl UserLookup {
    /// Build a lookup, ignoring blank values and lowercasing the username.
    pub fn new(email: Option<&str>, username: Option<&str>) -> Self {
        fn clean(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        Self {
            email: clean(email).map(str::to_string),
            username: clean(username).map(str::to_lowercase),
        }
    }

    pub fn by_email(email: &str) -> Self {
        Self::new(Some(email), None)
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none()
    }

    pub fn matches(&self, user: &User) -> bool {
        self.email.as_deref() == Some(user.email.as_str())
            || self.username.as_deref() == Some(user.username.as_str())
    }
}

/// Targeted field update. Only `Some` fields are written.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// `Some(None)` clears the stored token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl std::fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPatch")
            .field("fields", &self.field_names())
            .finish()
    }
}

impl UserPatch {
    pub fn refresh_token(token: Option<String>) -> Self {
        Self {
            refresh_token: Some(token),
            ..Default::default()
        }
    }

    pub fn password_hash(hash: String) -> Self {
        Self {
            password_hash: Some(hash),
            ..Default::default()
        }
    }

    pub fn details(full_name: String, email: String) -> Self {
        Self {
            full_name: Some(full_name),
            email: Some(email),
            ..Default::default()
        }
    }

    pub fn avatar_url(url: String) -> Self {
        Self {
            avatar_url: Some(url),
            ..Default::default()
        }
    }

    pub fn cover_image_url(url: String) -> Self {
        Self {
            cover_image_url: Some(url),
            ..Default::default()
        }
    }

    /// Stamp `updated_at`.
    pub fn touched(mut self, now: String) -> Self {
        self.updated_at = Some(now);
        self
    }

    /// Stored field names this patch writes (Firestore update mask).
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.email.is_some() {
            fields.push("email");
        }
        if self.full_name.is_some() {
            fields.push("full_name");
        }
        if self.password_hash.is_some() {
            fields.push("password_hash");
        }
        if self.avatar_url.is_some() {
            fields.push("avatar_url");
        }
        if self.cover_image_url.is_some() {
            fields.push("cover_image_url");
        }
        if self.refresh_token.is_some() {
            fields.push("refresh_token");
        }
        if self.updated_at.is_some() {
            fields.push("updated_at");
        }
        fields
    }

    /// Apply this patch to an in-memory document.
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(url) = &self.avatar_url {
            user.avatar_url = url.clone();
        }
        if let Some(url) = &self.cover_image_url {
            user.cover_image_url = url.clone();
        }
        if let Some(token) = &self.refresh_token {
            user.refresh_token = token.clone();
        }
        if let Some(now) = &self.updated_at {
            user.updated_at = now.clone();
        }
    }
}
