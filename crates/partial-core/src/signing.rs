//! Integrity protection for the page state field.
//!
//! The state travels through the client, so it is sealed as
//! `<hex HMAC-SHA256>.<payload>` and rejected on the way back unless the tag
//! matches.

use crate::error::{PartialError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// Server secret used to seal page state.
#[derive(Clone, PartialEq, Eq)]
pub struct StateKey {
    bytes: Arc<[u8]>,
}

impl StateKey {
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(PartialError::EmptyStateKey);
        }
        Ok(Self {
            bytes: Arc::from(bytes),
        })
    }

    /// A fresh random key. State sealed with it is only readable by holders
    /// of this same key, so every request of one site must share it.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self {
            bytes: Arc::from(&bytes[..]),
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.bytes).map_err(|_| PartialError::EmptyStateKey)
    }

    pub fn seal(&self, payload: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{tag}{SEPARATOR}{payload}"))
    }

    /// Returns the payload of a sealed value, or `TamperedState` if the tag
    /// is missing or does not match.
    pub fn open<'a>(&self, sealed: &'a str) -> Result<&'a str> {
        let (tag, payload) = sealed
            .split_once(SEPARATOR)
            .ok_or(PartialError::TamperedState)?;
        let tag = hex::decode(tag).map_err(|_| PartialError::TamperedState)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).map_err(|_| {
            tracing::warn!("page state failed verification");
            PartialError::TamperedState
        })?;
        Ok(payload)
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateKey(..)")
    }
}
