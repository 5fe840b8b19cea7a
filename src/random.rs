// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OS-backed random identifiers.

use ring::rand::{SecureRandom, SystemRandom};

/// Return `len` random bytes from the OS RNG, hex encoded.
pub fn random_hex(len: usize) -> anyhow::Result<String> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("System RNG unavailable"))?;
    Ok(hex::encode(bytes))
}

/// New record id: 12 random bytes, 24 hex characters.
pub fn new_record_id() -> anyhow::Result<String> {
    random_hex(12)
}
