use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// Whole seconds, as used for the `exp` claim of identity tokens.
    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        self.0.whole_seconds()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Minimum length check shared by usernames and passwords.
#[must_use]
pub fn has_min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

#[cfg(test)]
mod tests {
    use crate::util::{PositiveDuration, has_min_chars};
    use time::Duration;

    #[test]
    fn positive_duration() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-5)).is_err());
        assert_eq!(
            PositiveDuration::new(Duration::minutes(2))
                .unwrap()
                .whole_seconds(),
            120
        );
    }

    #[test]
    fn min_chars_counts_characters_not_bytes() {
        assert!(has_min_chars("abc", 3));
        assert!(!has_min_chars("ab", 3));
        assert!(has_min_chars("äöü", 3));
    }
}
