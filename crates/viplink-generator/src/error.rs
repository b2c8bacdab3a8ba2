use thiserror::Error;
use viplink_core::{ShortenerError, StorageError, UniqueKey};

#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    #[error("random source failed: {0}")]
    RandomSource(String),
    #[error("random source returned {actual} bytes, expected {expected}")]
    ShortRead { expected: usize, actual: usize },
    #[error("no unused {key} after {attempts} attempts")]
    Exhausted { key: UniqueKey, attempts: u32 },
    #[error("existence check failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<AllocationError> for ShortenerError {
    fn from(value: AllocationError) -> Self {
        match value {
            AllocationError::RandomSource(_) | AllocationError::ShortRead { .. } => {
                ShortenerError::RandomSource(value.to_string())
            }
            AllocationError::Exhausted { key, attempts } => {
                ShortenerError::RetriesExhausted { key, attempts }
            }
            AllocationError::Storage(source) => source.into(),
        }
    }
}
