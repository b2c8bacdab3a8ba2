use crate::error::ShortenerError;
use serde::Serialize;
use std::fmt::Display;

/// The identifier appended to the public base URL to address a link.
///
/// Generated suffixes are lowercase hex. Vanity suffixes are chosen by the
/// caller and must be 3-64 characters of `[a-zA-Z0-9_-]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Suffix(String);

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 64;

impl Suffix {
    /// Validates a caller-supplied suffix.
    pub fn new(suffix: impl Into<String>) -> Result<Self, ShortenerError> {
        let suffix = suffix.into();
        Self::validate(&suffix)?;
        Ok(Self(suffix))
    }

    /// Creates a `Suffix` without validation.
    ///
    /// Use this only for values produced by the allocator or read back from a
    /// registry.
    pub fn new_unchecked(suffix: impl Into<String>) -> Self {
        Self(suffix.into())
    }

    /// Generates the full short URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(suffix: &str) -> Result<(), ShortenerError> {
        let len = suffix.chars().count();
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&len) {
            return Err(ShortenerError::InvalidSuffix(format!(
                "{len} characters, expected {MIN_LENGTH} to {MAX_LENGTH}"
            )));
        }

        match suffix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '-' | '_')))
        {
            Some(bad) => Err(ShortenerError::InvalidSuffix(format!(
                "'{bad}' is not allowed in a URL suffix"
            ))),
            None => Ok(()),
        }
    }
}

impl Display for Suffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_hex_suffix_is_also_a_valid_vanity_suffix() {
        let suffix = Suffix::new("0a1b2c3d4e").unwrap();
        assert_eq!(suffix.as_str().len(), 10);
    }

    #[test]
    fn vanity_length_bounds_are_inclusive() {
        assert!(Suffix::new("vip").is_ok());
        assert!(Suffix::new("v".repeat(MAX_LENGTH)).is_ok());

        for len in [0, MIN_LENGTH - 1, MAX_LENGTH + 1] {
            let err = Suffix::new("v".repeat(len)).unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidSuffix(_)), "{len}");
        }
    }

    #[test]
    fn length_counts_characters() {
        // three characters, six bytes, rejected for its alphabet not its length
        let err = Suffix::new("ééé").unwrap_err();
        assert!(err.to_string().contains("'é'"), "{err}");
    }

    #[test]
    fn path_and_query_characters_are_rejected() {
        for bad in ["promo/1", "promo?x", "promo#1", "promo%20", "promo 1", "promo.1"] {
            let err = Suffix::new(bad).unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidSuffix(_)), "{bad}");
        }
        assert!(Suffix::new("Spring_Sale-2024").is_ok());
    }

    #[test]
    fn to_url_joins_with_a_single_slash() {
        let suffix = Suffix::new("promo1").unwrap();
        assert_eq!(suffix.to_url("https://vip.ln"), "https://vip.ln/promo1");
        assert_eq!(suffix.to_url("https://vip.ln/"), "https://vip.ln/promo1");
    }
}
