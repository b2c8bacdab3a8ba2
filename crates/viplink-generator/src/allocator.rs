use crate::error::AllocationError;
use crate::random::{draw_hex, OsRandom, RandomSource};
use jiff::Timestamp;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use viplink_core::{ReadRegistry, SecretKey, StorageError, Suffix, UniqueKey};

/// Configures identifier lengths and the collision retry budget.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct AllocatorSettings {
    /// Random bytes per generated suffix. The suffix is twice as long in hex.
    #[builder(default = 5)]
    pub suffix_bytes: usize,
    /// Random bytes per secret key.
    #[builder(default = 8)]
    pub secret_key_bytes: usize,
    /// Upper bound on draws per allocation, and on persist attempts per link.
    #[builder(default = 8)]
    pub max_attempts: u32,
    /// Backoff before the second attempt. Doubles per attempt, with full jitter.
    #[builder(default = Duration::from_millis(2))]
    pub backoff_base: Duration,
    #[builder(default = Duration::from_millis(100))]
    pub backoff_cap: Duration,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AllocatorSettings {
    /// Upper bound of the sleep before attempt `attempt + 1`.
    fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }
}

/// Draws random hex identifiers and resolves them against the registry.
#[derive(Debug, Clone)]
pub struct IdentifierAllocator<S = OsRandom> {
    source: S,
    settings: AllocatorSettings,
}

impl IdentifierAllocator<OsRandom> {
    /// Creates an allocator backed by the operating system RNG.
    pub fn new(settings: AllocatorSettings) -> Self {
        Self::with_source(settings, OsRandom)
    }
}

impl<S: RandomSource> IdentifierAllocator<S> {
    pub fn with_source(settings: AllocatorSettings, source: S) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &AllocatorSettings {
        &self.settings
    }

    /// Draws one identifier of `byte_len` random bytes, without any
    /// existence check.
    pub fn draw(&self, byte_len: usize) -> Result<String, AllocationError> {
        draw_hex(&self.source, byte_len)
    }

    /// Draws identifiers until `in_use` reports one as free.
    ///
    /// Collisions are retried with jittered exponential backoff, up to
    /// `max_attempts` draws. A random source failure or an error from
    /// `in_use` ends the allocation immediately.
    pub async fn allocate<F, Fut>(
        &self,
        key: UniqueKey,
        byte_len: usize,
        mut in_use: F,
    ) -> Result<String, AllocationError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, StorageError>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let candidate = self.draw(byte_len)?;
            if !in_use(candidate.clone()).await? {
                return Ok(candidate);
            }

            debug!(%key, attempt, "generated identifier collided");
            if attempt < max_attempts {
                self.backoff(attempt).await;
            }
        }

        warn!(%key, attempts = max_attempts, "identifier allocation exhausted");
        Err(AllocationError::Exhausted {
            key,
            attempts: max_attempts,
        })
    }

    /// Allocates a suffix that no link active at `as_of` is using.
    pub async fn suffix<R>(&self, registry: &R, as_of: Timestamp) -> Result<Suffix, AllocationError>
    where
        R: ReadRegistry + ?Sized,
    {
        let value = self
            .allocate(UniqueKey::Suffix, self.settings.suffix_bytes, move |candidate| async move {
                let suffix = Suffix::new_unchecked(candidate);
                let found = registry.find_by_suffix(&suffix, as_of).await?;
                Ok::<bool, StorageError>(found.is_some())
            })
            .await?;
        Ok(Suffix::new_unchecked(value))
    }

    /// Allocates a secret key that no stored link is using, expired or not.
    pub async fn secret_key<R>(&self, registry: &R) -> Result<SecretKey, AllocationError>
    where
        R: ReadRegistry + ?Sized,
    {
        let value = self
            .allocate(
                UniqueKey::SecretKey,
                self.settings.secret_key_bytes,
                move |candidate| async move {
                    let secret_key = SecretKey::new_unchecked(candidate);
                    let found = registry.find_by_secret_key(&secret_key).await?;
                    Ok::<bool, StorageError>(found.is_some())
                },
            )
            .await?;
        Ok(SecretKey::new_unchecked(value))
    }

    /// Sleeps a random duration up to the backoff ceiling for `attempt`.
    pub async fn backoff(&self, attempt: u32) {
        let ceiling = self.settings.backoff_ceiling(attempt);
        if ceiling.is_zero() {
            return;
        }
        let jitter = rand::rng().random_range(Duration::ZERO..=ceiling);
        tokio::time::sleep(jitter).await;
    }
}
