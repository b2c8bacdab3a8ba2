use crate::error::ShortenerError;
use serde::Serialize;
use std::fmt::Display;

/// The private management token of a link.
///
/// Returned once, when the link is created, and required to delete it.
/// `Debug` output is redacted so the key does not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    /// Parses a caller-supplied key. Keys are non-empty lowercase hex.
    pub fn new(key: impl Into<String>) -> Result<Self, ShortenerError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ShortenerError::InvalidSecretKey(
                "secret key cannot be empty".to_string(),
            ));
        }
        if !key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(ShortenerError::InvalidSecretKey(
                "secret key must be lowercase hex".to_string(),
            ));
        }
        Ok(Self(key))
    }

    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"<redacted>").finish()
    }
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
