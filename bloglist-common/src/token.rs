//! Stateless identity tokens.
//!
//! A token is an HS256 JWT carrying `{ "userName", "id" }` and, only when a lifetime is
//! configured, an `exp` claim. There is no server-side record of issued tokens; validity
//! is purely the signature (and expiry, if embedded).

use crate::{
    model::{
        Id,
        user::{UserMarker, Username},
    },
    util::PositiveDuration,
};
use http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::UtcDateTime;
use tracing::trace;

pub const BEARER_PREFIX: &str = "bearer ";

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("The token signing secret is empty")]
    EmptySecret,
    #[error("Identity token could not be signed: {0}")]
    Sign(errors::Error),
    #[error("Identity token is invalid: {0}")]
    InvalidToken(errors::Error),
}

/// The identity a token vouches for.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "userName")]
    pub username: Username,
    pub id: Id<UserMarker>,
}

#[derive(Serialize, Deserialize)]
struct TokenPayload {
    #[serde(flatten)]
    identity: IdentityClaims,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// The process-wide signing secret. Never printed.
#[derive(Clone, Eq, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);

impl TokenSecret {
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(secret)
    }
}

impl Debug for TokenSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenSecret").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub secret: TokenSecret,
    /// `None` issues tokens without expiry.
    pub lifetime: Option<PositiveDuration>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Option<PositiveDuration>,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Result<Self, TokenError> {
        let secret = config.secret.0.as_bytes();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(ALGORITHM);
        // `exp` is only checked when present.
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime: config.lifetime,
        })
    }

    pub fn issue(&self, identity: &IdentityClaims) -> Result<String, TokenError> {
        self.issue_at(identity, UtcDateTime::now())
    }

    fn issue_at(&self, identity: &IdentityClaims, now: UtcDateTime) -> Result<String, TokenError> {
        let payload = TokenPayload {
            identity: identity.clone(),
            exp: self
                .lifetime
                .map(|lifetime| now.unix_timestamp().saturating_add(lifetime.whole_seconds())),
        };

        jsonwebtoken::encode(&Header::new(ALGORITHM), &payload, &self.encoding_key)
            .map_err(TokenError::Sign)
    }

    pub fn decode(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenPayload>(token, &self.decoding_key, &self.validation)
            .map_err(TokenError::InvalidToken)?;

        Ok(data.claims.identity)
    }
}

impl Debug for TokenService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &ALGORITHM)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Pulls the raw token out of an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. A missing header, a value that is not
/// visible ASCII, any other scheme or an empty token all yield `None`.
#[must_use]
pub fn extract(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;

    let (scheme, token) = (value.get(..BEARER_PREFIX.len())?, value.get(BEARER_PREFIX.len()..)?);
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        trace!("Authorization header does not use the bearer scheme");
        return None;
    }

    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use crate::{
        model::user::Username,
        token::{IdentityClaims, TokenConfig, TokenError, TokenSecret, TokenService, extract},
        util::PositiveDuration,
    };
    use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
    use time::{Duration, UtcDateTime};

    fn service(secret: &str, lifetime: Option<Duration>) -> TokenService {
        TokenService::new(TokenConfig {
            secret: TokenSecret::new(secret.to_owned()),
            lifetime: lifetime.and_then(PositiveDuration::new),
        })
        .unwrap()
    }

    fn claims() -> IdentityClaims {
        IdentityClaims {
            username: Username::new("mluukkai".to_owned()).unwrap(),
            id: 1_234_567_u64.into(),
        }
    }

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn decode_recovers_issued_claims() {
        let tokens = service("sekret", None);
        let token = tokens.issue(&claims()).unwrap();

        assert_eq!(tokens.decode(&token).unwrap(), claims());
    }

    #[test]
    fn issue_without_lifetime_is_deterministic() {
        let tokens = service("sekret", None);
        assert_eq!(
            tokens.issue(&claims()).unwrap(),
            tokens.issue(&claims()).unwrap()
        );
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = service("sekret", None).issue(&claims()).unwrap();

        assert!(matches!(
            service("another sekret", None).decode(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let tokens = service("sekret", None);

        for token in ["", "abc", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.e30."] {
            assert!(matches!(
                tokens.decode(token),
                Err(TokenError::InvalidToken(_))
            ));
        }
    }

    #[test]
    fn swapped_payload_is_rejected() {
        let tokens = service("sekret", None);
        let token = tokens.issue(&claims()).unwrap();
        let other = tokens
            .issue(&IdentityClaims {
                username: Username::new("hellas".to_owned()).unwrap(),
                id: 42_u64.into(),
            })
            .unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = other.split('.').nth(1).unwrap();

        assert!(matches!(
            tokens.decode(&parts.join(".")),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn lifetime_embeds_expiry() {
        let tokens = service("sekret", Some(Duration::hours(1)));
        let fresh = tokens.issue(&claims()).unwrap();
        assert_eq!(tokens.decode(&fresh).unwrap(), claims());

        let stale = tokens
            .issue_at(&claims(), UtcDateTime::now() - Duration::hours(2))
            .unwrap();
        assert!(matches!(
            tokens.decode(&stale),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            TokenService::new(TokenConfig {
                secret: TokenSecret::new(String::new()),
                lifetime: None,
            }),
            Err(TokenError::EmptySecret)
        ));
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let secret = TokenSecret::new("hunter2".to_owned());
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn extract_bearer_any_case() {
        assert_eq!(extract(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(extract(&headers("bearer abc123")), Some("abc123"));
        assert_eq!(extract(&headers("BEARER abc123")), Some("abc123"));
    }

    #[test]
    fn extract_rejects_other_shapes() {
        assert_eq!(extract(&HeaderMap::new()), None);
        assert_eq!(extract(&headers("Basic xyz")), None);
        assert_eq!(extract(&headers("Bearer")), None);
        assert_eq!(extract(&headers("Bearer ")), None);
        assert_eq!(extract(&headers("Bearerabc123")), None);
    }
}
