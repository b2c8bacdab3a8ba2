use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use tracing::trace;
use viplink_core::registry::{ReadRegistry, Registry, RegistryAdmin, Result};
use viplink_core::{Link, NewLink, SecretKey, StorageError, Suffix, UniqueKey};

/// In-memory implementation of the registry contract using DashMap.
///
/// Links are keyed by suffix, with two indexes pointing back at suffixes:
/// one by secret key, one by long URL. DashMap shards its locks, so
/// concurrent requests touching different suffixes do not block each other.
///
/// A `links` entry may be held while an index is updated, never the other
/// way round.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    links: DashMap<String, Link>,
    secret_keys: DashMap<String, String>,
    long_urls: DashMap<String, Vec<String>>,
}

impl InMemoryRegistry {
    /// Creates a new in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory registry with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: DashMap::with_capacity(capacity),
            secret_keys: DashMap::with_capacity(capacity),
            long_urls: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn index_long_url(&self, long_url: &str, suffix: &str) {
        self.long_urls
            .entry(long_url.to_owned())
            .or_default()
            .push(suffix.to_owned());
    }

    fn unindex_long_url(&self, long_url: &str, suffix: &str) {
        if let Entry::Occupied(mut entry) = self.long_urls.entry(long_url.to_owned()) {
            entry.get_mut().retain(|s| s != suffix);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}

#[async_trait]
impl ReadRegistry for InMemoryRegistry {
    async fn find_by_suffix(&self, suffix: &Suffix, as_of: Timestamp) -> Result<Option<Link>> {
        Ok(self
            .links
            .get(suffix.as_str())
            .filter(|link| link.is_active(as_of))
            .map(|link| link.value().clone()))
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<Link>> {
        let Some(suffixes) = self.long_urls.get(long_url).map(|s| s.value().clone()) else {
            return Ok(None);
        };

        let mut best: Option<Link> = None;
        for suffix in suffixes {
            let Some(link) = self.links.get(&suffix).map(|l| l.value().clone()) else {
                continue;
            };
            if link.long_url != long_url {
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => match (current.expires_at, link.expires_at) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(current), Some(candidate)) => candidate > current,
                },
            };
            if better {
                best = Some(link);
            }
        }
        Ok(best)
    }

    async fn find_by_secret_key(&self, secret_key: &SecretKey) -> Result<Option<Link>> {
        let Some(suffix) = self
            .secret_keys
            .get(secret_key.as_str())
            .map(|s| s.value().clone())
        else {
            return Ok(None);
        };

        Ok(self
            .links
            .get(&suffix)
            .filter(|link| link.secret_key == *secret_key)
            .map(|link| link.value().clone()))
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn insert(&self, link: &NewLink) -> Result<()> {
        // Reserve the secret key first; it must be unique across all records.
        match self.secret_keys.entry(link.secret_key.as_str().to_owned()) {
            Entry::Occupied(_) => {
                return Err(StorageError::conflict(
                    UniqueKey::SecretKey,
                    link.secret_key.as_str(),
                ))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(link.suffix.as_str().to_owned());
            }
        }

        match self.links.entry(link.suffix.as_str().to_owned()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_active(link.created_at) {
                    drop(occupied);
                    self.secret_keys.remove(link.secret_key.as_str());
                    return Err(StorageError::conflict(
                        UniqueKey::Suffix,
                        link.suffix.as_str(),
                    ));
                }
                // Expired record: reclaim the suffix.
                let replaced = occupied.insert(link.clone().into_link());
                trace!(suffix = %link.suffix, "reclaimed expired suffix");
                self.secret_keys.remove(replaced.secret_key.as_str());
                self.unindex_long_url(&replaced.long_url, replaced.suffix.as_str());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(link.clone().into_link());
            }
        }
        self.index_long_url(&link.long_url, link.suffix.as_str());

        Ok(())
    }

    async fn delete_by_secret_key(&self, secret_key: &SecretKey) -> Result<bool> {
        let Some((_, suffix)) = self.secret_keys.remove(secret_key.as_str()) else {
            return Ok(false);
        };

        let Some((suffix, link)) = self
            .links
            .remove_if(&suffix, |_, link| link.secret_key == *secret_key)
        else {
            return Ok(false);
        };

        self.unindex_long_url(&link.long_url, &suffix);
        Ok(true)
    }

    async fn increment_clicks(&self, suffix: &Suffix) -> Result<bool> {
        let Some(mut link) = self.links.get_mut(suffix.as_str()) else {
            return Ok(false);
        };
        link.clicks = link.clicks.saturating_add(1);
        Ok(true)
    }
}

#[async_trait]
impl RegistryAdmin for InMemoryRegistry {
    async fn create_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn drop_schema(&self) -> Result<()> {
        self.clear().await
    }

    async fn clear(&self) -> Result<()> {
        self.links.clear();
        self.secret_keys.clear();
        self.long_urls.clear();
        Ok(())
    }
}
