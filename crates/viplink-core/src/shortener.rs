use crate::link::Link;
use crate::secret::SecretKey;
use crate::suffix::Suffix;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Parameters for creating a short link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    /// The destination to be shortened.
    pub long_url: String,
    /// A caller-chosen suffix. Makes the link a VIP link, which always expires.
    pub vip_key: Option<String>,
    /// How many `ttl_unit`s a VIP link lives.
    pub ttl: Option<u32>,
    /// One of `SECONDS`, `MINUTES`, `HOURS`, `DAYS`.
    pub ttl_unit: Option<String>,
}

impl CreateLinkRequest {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            ..Self::default()
        }
    }

    pub fn vip(mut self, vip_key: impl Into<String>) -> Self {
        self.vip_key = Some(vip_key.into());
        self
    }

    pub fn ttl(mut self, ttl: u32, ttl_unit: impl Into<String>) -> Self {
        self.ttl = Some(ttl);
        self.ttl_unit = Some(ttl_unit.into());
        self
    }
}

/// The outcome of a create call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLink {
    pub short_url: String,
    pub suffix: Suffix,
    /// Present only when a new record was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<SecretKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl CreatedLink {
    /// Whether the call returned an already stored link instead of a new one.
    pub fn is_existing(&self) -> bool {
        self.secret_key.is_none()
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a short link, or returns the active link already stored for the
    /// same destination.
    async fn create(&self, request: CreateLinkRequest) -> Result<CreatedLink>;

    /// Resolves an active suffix and counts the visit.
    /// Returns `None` if the suffix does not exist or has expired.
    async fn resolve(&self, suffix: &Suffix) -> Result<Option<Link>>;

    /// Looks up a link by its secret key, whether active or not.
    async fn inspect(&self, secret_key: &SecretKey) -> Result<Option<Link>>;

    /// Deletes a link by its secret key.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, secret_key: &SecretKey) -> Result<bool>;
}
