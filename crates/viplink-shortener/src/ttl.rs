use jiff::{SignedDuration, Timestamp};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use typed_builder::TypedBuilder;
use viplink_core::ShortenerError;

/// The unit a VIP link's lifetime is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TtlUnit {
    pub fn duration(self) -> SignedDuration {
        match self {
            TtlUnit::Seconds => SignedDuration::from_secs(1),
            TtlUnit::Minutes => SignedDuration::from_mins(1),
            TtlUnit::Hours => SignedDuration::from_hours(1),
            TtlUnit::Days => SignedDuration::from_hours(24),
        }
    }
}

impl FromStr for TtlUnit {
    type Err = ShortenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SECONDS" => Ok(TtlUnit::Seconds),
            "MINUTES" => Ok(TtlUnit::Minutes),
            "HOURS" => Ok(TtlUnit::Hours),
            "DAYS" => Ok(TtlUnit::Days),
            other => Err(ShortenerError::UnknownTtlUnit(other.to_string())),
        }
    }
}

impl Display for TtlUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TtlUnit::Seconds => f.write_str("SECONDS"),
            TtlUnit::Minutes => f.write_str("MINUTES"),
            TtlUnit::Hours => f.write_str("HOURS"),
            TtlUnit::Days => f.write_str("DAYS"),
        }
    }
}

/// Defaults and ceiling for VIP link lifetimes.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct TtlSettings {
    /// Unit used when the request names none.
    #[builder(default = TtlUnit::Hours)]
    pub default_unit: TtlUnit,
    /// Count used when the request gives none, or zero.
    #[builder(default = 10)]
    pub default_count: u32,
    /// Longest lifetime a VIP link may have, whatever the unit.
    #[builder(default = SignedDuration::from_hours(48))]
    pub max_lifetime: SignedDuration,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Turns a requested unit and count into an expiration instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtlPolicy {
    settings: TtlSettings,
}

impl TtlPolicy {
    pub fn new(settings: TtlSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TtlSettings {
        &self.settings
    }

    /// Resolves the lifetime for a request.
    ///
    /// A missing unit falls back to the default unit; a missing or zero count
    /// to the default count. The product must not exceed `max_lifetime`.
    pub fn lifetime(
        &self,
        unit: Option<&str>,
        count: Option<u32>,
    ) -> Result<SignedDuration, ShortenerError> {
        let unit = match unit {
            Some(token) => token.parse::<TtlUnit>()?,
            None => self.settings.default_unit,
        };
        let count = match count {
            None | Some(0) => self.settings.default_count,
            Some(count) => count,
        };

        let lifetime = i32::try_from(count)
            .map_or(SignedDuration::MAX, |count| unit.duration().saturating_mul(count));

        if lifetime > self.settings.max_lifetime {
            return Err(ShortenerError::TtlLimitExceeded {
                requested: lifetime,
                limit: self.settings.max_lifetime,
            });
        }

        Ok(lifetime)
    }

    /// The instant a link created at `now` with this unit and count expires.
    pub fn expires_at(
        &self,
        now: Timestamp,
        unit: Option<&str>,
        count: Option<u32>,
    ) -> Result<Timestamp, ShortenerError> {
        let lifetime = self.lifetime(unit, count)?;
        now.checked_add(lifetime).map_err(|_| ShortenerError::TtlLimitExceeded {
            requested: lifetime,
            limit: self.settings.max_lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TtlPolicy {
        TtlPolicy::default()
    }

    #[test]
    fn parses_known_units() {
        assert_eq!("SECONDS".parse::<TtlUnit>().unwrap(), TtlUnit::Seconds);
        assert_eq!("MINUTES".parse::<TtlUnit>().unwrap(), TtlUnit::Minutes);
        assert_eq!("HOURS".parse::<TtlUnit>().unwrap(), TtlUnit::Hours);
        assert_eq!("DAYS".parse::<TtlUnit>().unwrap(), TtlUnit::Days);
    }

    #[test]
    fn unknown_unit_is_rejected_whatever_the_count() {
        for count in [None, Some(0), Some(1), Some(1000)] {
            let err = policy().lifetime(Some("FORTNIGHTS"), count).unwrap_err();
            assert!(matches!(err, ShortenerError::UnknownTtlUnit(ref unit) if unit == "FORTNIGHTS"));
        }
        // tokens are case-sensitive
        assert!(policy().lifetime(Some("hours"), Some(1)).is_err());
    }

    #[test]
    fn defaults_to_ten_hours() {
        assert_eq!(
            policy().lifetime(None, None).unwrap(),
            SignedDuration::from_hours(10)
        );
        assert_eq!(
            policy().lifetime(None, Some(0)).unwrap(),
            SignedDuration::from_hours(10)
        );
    }

    #[test]
    fn default_count_applies_to_explicit_unit() {
        assert_eq!(
            policy().lifetime(Some("MINUTES"), None).unwrap(),
            SignedDuration::from_mins(10)
        );
    }

    #[test]
    fn ceiling_is_inclusive() {
        assert_eq!(
            policy().lifetime(Some("HOURS"), Some(48)).unwrap(),
            SignedDuration::from_hours(48)
        );
        let err = policy().lifetime(Some("HOURS"), Some(49)).unwrap_err();
        assert!(matches!(err, ShortenerError::TtlLimitExceeded { .. }));
    }

    #[test]
    fn ceiling_is_checked_in_absolute_time() {
        assert_eq!(
            policy().lifetime(Some("DAYS"), Some(2)).unwrap(),
            SignedDuration::from_hours(48)
        );
        assert!(policy().lifetime(Some("DAYS"), Some(3)).is_err());
        assert!(policy().lifetime(Some("SECONDS"), Some(172_800)).is_ok());
        assert!(policy().lifetime(Some("SECONDS"), Some(172_801)).is_err());
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let err = policy().lifetime(Some("DAYS"), Some(u32::MAX)).unwrap_err();
        assert!(matches!(err, ShortenerError::TtlLimitExceeded { .. }));
    }

    #[test]
    fn expires_at_adds_lifetime_to_now() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let expires_at = policy().expires_at(now, Some("DAYS"), Some(2)).unwrap();
        assert_eq!(expires_at.duration_since(now), SignedDuration::from_hours(48));
    }

    #[test]
    fn custom_settings() {
        let policy = TtlPolicy::new(
            TtlSettings::builder()
                .default_unit(TtlUnit::Minutes)
                .default_count(30)
                .max_lifetime(SignedDuration::from_hours(1))
                .build(),
        );

        assert_eq!(
            policy.lifetime(None, None).unwrap(),
            SignedDuration::from_mins(30)
        );
        assert!(policy.lifetime(Some("HOURS"), Some(2)).is_err());
    }
}
