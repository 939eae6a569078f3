pub mod post;
pub mod user;

use crate::{
    model::{
        post::{MissingFieldError, TooManyLikesError},
        user::{InvalidPasswordError, InvalidUsernameError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData, num::ParseIntError, str::FromStr};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    Password(#[from] InvalidPasswordError),
    #[error(transparent)]
    MissingField(#[from] MissingFieldError),
    #[error(transparent)]
    Likes(#[from] TooManyLikesError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BloglistEpoch;
impl Epoch for BloglistEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type BloglistSnowflake = Snowflake<BloglistEpoch>;
pub type BloglistSnowflakeGenerator = SnowflakeGenerator<BloglistEpoch>;

/// Typed, opaque identifier. Two ids are the same identity iff their snowflakes are equal.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(BloglistSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: BloglistSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> BloglistSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BloglistSnowflake::from_str(s).map(Self::new)
    }
}

impl<Marker> From<BloglistSnowflake> for Id<Marker> {
    fn from(value: BloglistSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(BloglistSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, user::UserMarker};

    #[test]
    fn id_string_round_trip() {
        let id: Id<UserMarker> = "1234567890123".parse().unwrap();
        assert_eq!(u64::from(id), 1_234_567_890_123);
        assert_eq!(id.to_string(), "1234567890123");
        assert!("12a".parse::<Id<UserMarker>>().is_err());
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"1234567890123\"".to_owned()
        );
    }
}
