use crate::secret::SecretKey;
use crate::suffix::Suffix;
use jiff::Timestamp;
use serde::Serialize;

/// A stored link record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub suffix: Suffix,
    /// The destination URL.
    pub long_url: String,
    pub secret_key: SecretKey,
    /// When the link stops resolving, if ever.
    pub expires_at: Option<Timestamp>,
    pub clicks: u64,
    pub created_at: Timestamp,
}

impl Link {
    /// A link is active while it has no expiration or the expiration is
    /// strictly after `at`.
    pub fn is_active(&self, at: Timestamp) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > at)
    }
}

/// The payload of a registry insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub suffix: Suffix,
    pub long_url: String,
    pub secret_key: SecretKey,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl NewLink {
    /// A link that never expires.
    pub fn permanent(
        suffix: Suffix,
        long_url: impl Into<String>,
        secret_key: SecretKey,
        created_at: Timestamp,
    ) -> Self {
        Self {
            suffix,
            long_url: long_url.into(),
            secret_key,
            expires_at: None,
            created_at,
        }
    }

    /// A link that stops resolving once `expires_at` has passed.
    pub fn expiring(
        suffix: Suffix,
        long_url: impl Into<String>,
        secret_key: SecretKey,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            expires_at: Some(expires_at),
            ..Self::permanent(suffix, long_url, secret_key, created_at)
        }
    }

    /// The record as it reads back right after insertion.
    pub fn into_link(self) -> Link {
        Link {
            suffix: self.suffix,
            long_url: self.long_url,
            secret_key: self.secret_key,
            expires_at: self.expires_at,
            clicks: 0,
            created_at: self.created_at,
        }
    }
}
