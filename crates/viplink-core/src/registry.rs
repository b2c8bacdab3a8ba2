use crate::error::StorageError;
use crate::link::{Link, NewLink};
use crate::secret::SecretKey;
use crate::suffix::Suffix;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of a registry.
///
/// Every lookup returns `Ok(None)` when nothing matches, so callers can tell
/// "not found" apart from a storage failure.
#[async_trait]
pub trait ReadRegistry: Send + Sync + 'static {
    /// Returns the link for `suffix` if it is active at `as_of`, that is, it
    /// has no expiration or expires strictly after `as_of`.
    async fn find_by_suffix(&self, suffix: &Suffix, as_of: Timestamp) -> Result<Option<Link>>;

    /// Returns a link with the given destination, whether active or not.
    ///
    /// When several records share the destination, a permanent one is
    /// preferred, then the one expiring last.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<Link>>;

    /// Returns the link owning `secret_key`, whether active or not.
    async fn find_by_secret_key(&self, secret_key: &SecretKey) -> Result<Option<Link>>;
}

#[async_trait]
pub trait Registry: ReadRegistry {
    /// Persists a new link.
    ///
    /// Returns `Err(Conflict)` if the suffix belongs to a record still active
    /// at `link.created_at`, or if the secret key is taken by any record. A
    /// record holding the suffix that has already expired is replaced.
    async fn insert(&self, link: &NewLink) -> Result<()>;

    /// Deletes the link owning `secret_key`.
    /// Returns `true` if a record existed and was removed.
    async fn delete_by_secret_key(&self, secret_key: &SecretKey) -> Result<bool>;

    /// Adds one to the click counter of `suffix`.
    /// Returns `true` if a record was updated.
    async fn increment_clicks(&self, suffix: &Suffix) -> Result<bool>;
}

/// Schema lifecycle operations, used by tooling and tests.
#[async_trait]
pub trait RegistryAdmin: Send + Sync + 'static {
    async fn create_schema(&self) -> Result<()>;

    async fn drop_schema(&self) -> Result<()>;

    /// Removes every stored link, keeping the schema.
    async fn clear(&self) -> Result<()>;
}
