use crate::config::ShortenerSettings;
use crate::ttl::TtlPolicy;
use async_trait::async_trait;
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;
use viplink_core::{
    Clock, CreateLinkRequest, CreatedLink, Link, NewLink, Registry, SecretKey, Shortener,
    ShortenerError, StorageError, Suffix, SystemClock, UniqueKey,
};
use viplink_generator::{IdentifierAllocator, OsRandom, RandomSource};

/// A concrete implementation of the `Shortener` trait.
///
/// Creation runs as: validate, resolve the suffix (vanity or generated),
/// deduplicate by long URL, allocate a secret key, compute the lifetime of
/// VIP links, persist. The registry's own uniqueness checks are the final
/// word; a conflict reported at insert time sends the offending identifier
/// back through the allocator, bounded by `max_attempts`.
#[derive(Debug, Clone)]
pub struct ShortLinkService<R, S = OsRandom, C = SystemClock> {
    registry: Arc<R>,
    allocator: Arc<IdentifierAllocator<S>>,
    ttl: TtlPolicy,
    clock: C,
    base_url: String,
}

impl<R: Registry> ShortLinkService<R> {
    /// Creates a service backed by the OS random source and the system clock.
    pub fn new(registry: R, settings: ShortenerSettings) -> Self {
        Self::with_parts(registry, settings, OsRandom, SystemClock)
    }
}

impl<R: Registry, S: RandomSource, C: Clock> ShortLinkService<R, S, C> {
    pub fn with_parts(registry: R, settings: ShortenerSettings, source: S, clock: C) -> Self {
        Self {
            registry: Arc::new(registry),
            allocator: Arc::new(IdentifierAllocator::with_source(settings.allocator, source)),
            ttl: TtlPolicy::new(settings.ttl),
            clock,
            base_url: settings.base_url,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Checks the request shape and returns the vanity suffix, if any.
    fn validate(request: &CreateLinkRequest) -> Result<Option<Suffix>, ShortenerError> {
        if request.long_url.trim().is_empty() {
            return Err(ShortenerError::InvalidRequest(
                "longUrl is required".to_string(),
            ));
        }
        Self::validate_url(&request.long_url)?;

        match &request.vip_key {
            Some(vip_key) => Suffix::new(vip_key.as_str()).map(Some),
            None if request.ttl.is_some() || request.ttl_unit.is_some() => Err(
                ShortenerError::InvalidRequest("ttl and ttlUnit require a vipKey".to_string()),
            ),
            None => Ok(None),
        }
    }

    /// Accepts absolute http(s) URLs with a host.
    fn validate_url(long_url: &str) -> Result<(), ShortenerError> {
        let url = Url::parse(long_url)
            .map_err(|e| ShortenerError::InvalidUrl(format!("{long_url}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a host: {long_url}"
            )));
        }

        Ok(())
    }

    /// A single existence check; a vanity suffix is never retried.
    async fn claim_vanity(&self, suffix: &Suffix, now: Timestamp) -> Result<(), ShortenerError> {
        let existing = self
            .registry
            .find_by_suffix(suffix, now)
            .await
            .map_err(storage_error("find_by_suffix"))?;

        match existing {
            Some(_) => Err(ShortenerError::SuffixTaken(suffix.to_string())),
            None => Ok(()),
        }
    }

    /// Returns the stored link for `long_url` if it is still active.
    async fn find_duplicate(
        &self,
        long_url: &str,
        now: Timestamp,
    ) -> Result<Option<Link>, ShortenerError> {
        let existing = self
            .registry
            .find_by_long_url(long_url)
            .await
            .map_err(storage_error("find_by_long_url"))?;

        Ok(existing.filter(|link| link.is_active(now)))
    }

    /// Inserts `link`, re-allocating whichever identifier the registry
    /// reports as taken.
    async fn persist(&self, mut link: NewLink, vanity: bool) -> Result<NewLink, ShortenerError> {
        let max_attempts = self.allocator.settings().max_attempts.max(1);
        let mut last_conflict = UniqueKey::Suffix;

        for attempt in 1..=max_attempts {
            let result = self.registry.insert(&link).await;
            let key = match result {
                Ok(()) => return Ok(link),
                Err(StorageError::Conflict {
                    key: UniqueKey::Suffix,
                    ..
                }) if vanity => {
                    return Err(ShortenerError::SuffixTaken(link.suffix.to_string()));
                }
                Err(StorageError::Conflict { key, .. }) => key,
                Err(err) => return Err(storage_error("insert")(err)),
            };

            debug!(%key, attempt, "insert lost a race for a generated identifier");
            last_conflict = key;
            if attempt == max_attempts {
                break;
            }

            self.allocator.backoff(attempt).await;
            match key {
                UniqueKey::Suffix => {
                    link.suffix = self
                        .allocator
                        .suffix(self.registry.as_ref(), link.created_at)
                        .await?;
                }
                UniqueKey::SecretKey => {
                    link.secret_key = self.allocator.secret_key(self.registry.as_ref()).await?;
                }
            }
        }

        warn!(key = %last_conflict, attempts = max_attempts, "giving up on persisting link");
        Err(ShortenerError::RetriesExhausted {
            key: last_conflict,
            attempts: max_attempts,
        })
    }

    fn created(
        &self,
        suffix: Suffix,
        secret_key: Option<SecretKey>,
        expires_at: Option<Timestamp>,
    ) -> CreatedLink {
        CreatedLink {
            short_url: suffix.to_url(&self.base_url),
            suffix,
            secret_key,
            expires_at,
        }
    }
}

#[async_trait]
impl<R: Registry, S: RandomSource, C: Clock> Shortener for ShortLinkService<R, S, C> {
    async fn create(&self, request: CreateLinkRequest) -> Result<CreatedLink, ShortenerError> {
        let vanity = Self::validate(&request)?;
        let now = self.clock.now();

        let suffix = match &vanity {
            Some(suffix) => {
                self.claim_vanity(suffix, now).await?;
                suffix.clone()
            }
            None => self.allocator.suffix(self.registry.as_ref(), now).await?,
        };

        // the suffix resolved above is dropped unused
        if let Some(existing) = self.find_duplicate(&request.long_url, now).await? {
            debug!(suffix = %existing.suffix, "long url already shortened");
            return Ok(self.created(existing.suffix, None, existing.expires_at));
        }

        let secret_key = self.allocator.secret_key(self.registry.as_ref()).await?;

        let link = match vanity {
            Some(_) => {
                let expires_at = self
                    .ttl
                    .expires_at(now, request.ttl_unit.as_deref(), request.ttl)?;
                NewLink::expiring(suffix, request.long_url, secret_key, now, expires_at)
            }
            None => NewLink::permanent(suffix, request.long_url, secret_key, now),
        };

        let link = self.persist(link, vanity.is_some()).await?;
        info!(
            suffix = %link.suffix,
            vip = vanity.is_some(),
            expires_at = ?link.expires_at,
            "created short link"
        );

        Ok(self.created(link.suffix, Some(link.secret_key), link.expires_at))
    }

    async fn resolve(&self, suffix: &Suffix) -> Result<Option<Link>, ShortenerError> {
        let now = self.clock.now();
        let Some(mut link) = self
            .registry
            .find_by_suffix(suffix, now)
            .await
            .map_err(storage_error("find_by_suffix"))?
        else {
            return Ok(None);
        };

        let counted = self
            .registry
            .increment_clicks(suffix)
            .await
            .map_err(storage_error("increment_clicks"))?;
        if !counted {
            // deleted between the lookup and the increment
            return Ok(None);
        }

        link.clicks += 1;
        Ok(Some(link))
    }

    async fn inspect(&self, secret_key: &SecretKey) -> Result<Option<Link>, ShortenerError> {
        self.registry
            .find_by_secret_key(secret_key)
            .await
            .map_err(storage_error("find_by_secret_key"))
    }

    async fn delete(&self, secret_key: &SecretKey) -> Result<bool, ShortenerError> {
        let deleted = self
            .registry
            .delete_by_secret_key(secret_key)
            .await
            .map_err(storage_error("delete_by_secret_key"))?;

        if deleted {
            info!("deleted short link");
        }
        Ok(deleted)
    }
}

/// Logs a registry failure and converts it into an internal error.
fn storage_error(operation: &'static str) -> impl Fn(StorageError) -> ShortenerError {
    move |err| {
        error!(operation, error = %err, "registry call failed");
        err.into()
    }
}
