//! Authentication of requests and ownership checks.

use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use bloglist_common::{
    model::{Id, user::UserMarker},
    token::{self, IdentityClaims, TokenError, TokenService},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token in the Authorization header")]
    MissingToken,
    #[error("{0}")]
    InvalidToken(TokenError),
}

/// Whether updating a post requires its owner.
///
/// The permissive default lets anyone update an existing post and turns an update of an
/// unknown id into an insert owned by the caller. Strict mode authenticates every update,
/// rejects unknown ids and non-owners.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UpdatePolicy {
    pub strict_ownership_on_update: bool,
}

#[derive(Debug)]
pub struct AuthorizationGuard {
    tokens: TokenService,
}

impl AuthorizationGuard {
    #[must_use]
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolves the bearer token of a request to the identity it was issued for.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<IdentityClaims, AuthError> {
        let Some(raw) = token::extract(headers) else {
            debug!("Rejecting request without bearer token");
            return Err(AuthError::MissingToken);
        };

        self.tokens.decode(raw).map_err(|err| {
            debug!(error = %err, "Rejecting request with invalid token");
            AuthError::InvalidToken(err)
        })
    }

    /// Ids are opaque: ownership holds only for the identical id.
    #[must_use]
    pub fn authorize_ownership(user_id: Id<UserMarker>, owner_id: Id<UserMarker>) -> bool {
        user_id == owner_id
    }
}

/// Extractor for handlers that require a valid identity token.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    claims: IdentityClaims,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.claims.id
    }

    #[must_use]
    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthorizationGuard>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Arc::<AuthorizationGuard>::from_ref(state).authenticate(&parts.headers)?;

        Ok(Self { claims })
    }
}
