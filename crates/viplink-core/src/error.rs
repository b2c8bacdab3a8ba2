use jiff::SignedDuration;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The two independently unique attributes of a stored link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    Suffix,
    SecretKey,
}

impl Display for UniqueKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueKey::Suffix => f.write_str("suffix"),
            UniqueKey::SecretKey => f.write_str("secret key"),
        }
    }
}

/// Errors returned by registry implementations.
///
/// A lookup that finds nothing is not an error; registries report it as
/// `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("{key} already exists")]
    Conflict { key: UniqueKey, value: String },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    pub fn conflict(key: UniqueKey, value: impl Into<String>) -> Self {
        Self::Conflict {
            key,
            value: value.into(),
        }
    }

    /// Returns the violated key if this is a uniqueness conflict.
    pub fn conflicting_key(&self) -> Option<UniqueKey> {
        match self {
            StorageError::Conflict { key, .. } => Some(*key),
            _ => None,
        }
    }
}

/// Coarse classification of a [`ShortenerError`] for boundary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something that can never succeed as-is.
    BadRequest,
    /// The service failed; the request itself may be fine.
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid suffix: {0}")]
    InvalidSuffix(String),
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
    #[error("unknown TTL format: {0}")]
    UnknownTtlUnit(String),
    #[error("TTL limit exceeded: requested {requested}, limit {limit}")]
    TtlLimitExceeded {
        requested: SignedDuration,
        limit: SignedDuration,
    },
    #[error("suffix already in use: {0}")]
    SuffixTaken(String),
    #[error("gave up allocating a unique {key} after {attempts} attempts")]
    RetriesExhausted { key: UniqueKey, attempts: u32 },
    #[error("random source failed: {0}")]
    RandomSource(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ShortenerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortenerError::InvalidRequest(_)
            | ShortenerError::InvalidUrl(_)
            | ShortenerError::InvalidSuffix(_)
            | ShortenerError::InvalidSecretKey(_)
            | ShortenerError::UnknownTtlUnit(_)
            | ShortenerError::TtlLimitExceeded { .. }
            | ShortenerError::SuffixTaken(_) => ErrorKind::BadRequest,
            ShortenerError::RetriesExhausted { .. }
            | ShortenerError::RandomSource(_)
            | ShortenerError::Storage(_) => ErrorKind::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::BadRequest
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        ShortenerError::Storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_requests() {
        let errors = [
            ShortenerError::InvalidRequest("x".into()),
            ShortenerError::UnknownTtlUnit("FORTNIGHTS".into()),
            ShortenerError::TtlLimitExceeded {
                requested: SignedDuration::from_hours(49),
                limit: SignedDuration::from_hours(48),
            },
            ShortenerError::SuffixTaken("promo1".into()),
        ];

        for err in errors {
            assert_eq!(err.kind(), ErrorKind::BadRequest, "{err}");
        }
    }

    #[test]
    fn storage_failures_are_internal() {
        let err: ShortenerError = StorageError::Unavailable("down".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let exhausted = ShortenerError::RetriesExhausted {
            key: UniqueKey::Suffix,
            attempts: 8,
        };
        assert!(!exhausted.is_client_error());
    }

    #[test]
    fn conflict_reports_its_key() {
        let err = StorageError::conflict(UniqueKey::SecretKey, "00ff");
        assert_eq!(err.conflicting_key(), Some(UniqueKey::SecretKey));
        assert_eq!(err.to_string(), "secret key already exists");
        assert_eq!(StorageError::Query("boom".into()).conflicting_key(), None);
    }
}
