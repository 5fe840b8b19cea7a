// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod media;
pub mod password;
pub mod session;

pub use accounts::AccountService;
pub use media::{CloudinaryStorage, MediaStorage, StagedFile, UploadGateway, UploadedMedia};
pub use session::{Claims, SessionManager, SessionTokens};
