use crate::{
    credential::PasswordDigest,
    model::{
        Id, ModelValidationError,
        post::{PostMarker, PostSummary},
    },
    util::has_min_chars,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const PASSWORD_MIN_LEN: usize = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// A registered account. Only ever handed out through [`PublicUser`] or [`UserProfile`],
/// which carry no password hash.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub name: String,
    pub password_hash: PasswordDigest,
    pub blogs: Vec<Id<PostMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub name: String,
    pub password_hash: PasswordDigest,
}

/// Registration payload as received from clients.
#[derive(Clone, Eq, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_name: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Id<UserMarker>,
    pub user_name: Username,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Id<UserMarker>,
    pub user_name: Username,
    pub name: String,
    pub blogs: Vec<PostSummary>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidUsernameError {
    #[error("User validation failed: userName: Path `userName` is required.")]
    Missing,
    #[error(
        "User validation failed: userName: Path `userName` (`{0}`) is shorter than the minimum allowed length ({min}).",
        min = USERNAME_MIN_LEN
    )]
    TooShort(String),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error(
    "User validation failed: password: Path `password` is missing or is shorter than the minimum allowed length ({min}).",
    min = PASSWORD_MIN_LEN
)]
pub struct InvalidPasswordError;

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        if has_min_chars(&username, USERNAME_MIN_LEN) {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError::TooShort(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner).map_err(|err| match err {
            InvalidUsernameError::TooShort(username) => {
                de::Error::invalid_value(Unexpected::Str(&username), &"Username")
            }
            InvalidUsernameError::Missing => de::Error::missing_field("userName"),
        })
    }
}

/// Checked registration input. The password is still plaintext here and must be hashed
/// before a [`CreateUser`] can be built.
#[derive(Clone, Eq, PartialEq)]
pub struct ValidRegistration {
    pub username: Username,
    pub name: String,
    pub password: String,
}

impl Debug for ValidRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidRegistration")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Registration {
    pub fn validate(self) -> Result<ValidRegistration, ModelValidationError> {
        let username = Username::new(self.user_name.ok_or(InvalidUsernameError::Missing)?)?;
        let password = self
            .password
            .filter(|password| has_min_chars(password, PASSWORD_MIN_LEN))
            .ok_or(InvalidPasswordError)?;

        Ok(ValidRegistration {
            username,
            name: self.name.unwrap_or_default(),
            password,
        })
    }
}

impl User {
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            user_name: self.username.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        ModelValidationError,
        user::{InvalidPasswordError, InvalidUsernameError, Registration, Username},
    };

    fn registration(user_name: Option<&str>, password: Option<&str>) -> Registration {
        Registration {
            user_name: user_name.map(str::to_owned),
            name: Some("Test User".to_owned()),
            password: password.map(str::to_owned),
        }
    }

    #[test]
    fn username_min_length() {
        assert!(Username::new("abc".to_owned()).is_ok());
        assert_eq!(
            Username::new("12".to_owned()),
            Err(InvalidUsernameError::TooShort("12".to_owned()))
        );
    }

    #[test]
    fn username_deserialize_rejects_short() {
        assert!(serde_json::from_str::<Username>("\"root\"").is_ok());
        assert!(serde_json::from_str::<Username>("\"ro\"").is_err());
    }

    #[test]
    fn registration_validation() {
        let valid = registration(Some("mluukkai"), Some("salainen"))
            .validate()
            .unwrap();
        assert_eq!(valid.username.get(), "mluukkai");
        assert_eq!(valid.name, "Test User");

        assert_eq!(
            registration(None, Some("salainen")).validate().err(),
            Some(ModelValidationError::Username(InvalidUsernameError::Missing))
        );
        assert!(matches!(
            registration(Some("ml"), Some("salainen")).validate(),
            Err(ModelValidationError::Username(InvalidUsernameError::TooShort(_)))
        ));
        assert_eq!(
            registration(Some("mluukkai"), None).validate().err(),
            Some(ModelValidationError::Password(InvalidPasswordError))
        );
        assert_eq!(
            registration(Some("mluukkai"), Some("12")).validate().err(),
            Some(ModelValidationError::Password(InvalidPasswordError))
        );
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = registration(Some("ml"), Some("salainen")).validate().unwrap_err();
        assert!(err.to_string().starts_with("User validation failed: userName:"));

        let err = registration(Some("mluukkai"), None).validate().unwrap_err();
        assert!(err.to_string().starts_with("User validation failed: password:"));
    }
}
