use crate::server::auth::{AuthError, AuthorizationGuard, UpdatePolicy};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bloglist_common::{
    credential::CredentialError,
    model::{
        Id, ModelValidationError,
        post::PostMarker,
        user::{UserMarker, Username},
    },
    token::TokenError,
};
use bloglist_db::{Repository, RepositoryError};
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

pub mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub repository: Arc<dyn Repository>,
    pub guard: Arc<AuthorizationGuard>,
    pub update_policy: UpdatePolicy,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

/// The complete application with state, request tracing and CORS applied. Any origin may
/// call the API.
pub fn app(state: ServerState) -> Router {
    routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Machine-readable error category sent to clients.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    DuplicateKey,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unknown endpoint: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error("duplicate key: userName {0:?} is already taken")]
    DuplicateUsername(Username),
    #[error("token missing or invalid: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("token missing or invalid: user {0} no longer exists")]
    UnknownUser(Id<UserMarker>),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("blog entry {post} belongs to another user")]
    NotOwner { post: Id<PostMarker> },
    #[error("blog {0} not found")]
    PostByIdNotFound(Id<PostMarker>),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] JoinError),
}

impl From<RepositoryError> for ServerError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::DuplicateUsername(username) => Self::DuplicateUsername(username),
            other => Self::Repository(other),
        }
    }
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_) => ErrorKind::NotFound,
            ServerError::JsonRejection(_) | ServerError::Validation(_) => {
                ErrorKind::ValidationError
            }
            ServerError::DuplicateUsername(_) => ErrorKind::DuplicateKey,
            ServerError::Unauthorized(_)
            | ServerError::UnknownUser(_)
            | ServerError::InvalidCredentials => ErrorKind::Unauthorized,
            ServerError::NotOwner { .. } => ErrorKind::Forbidden,
            ServerError::JsonResponse(_)
            | ServerError::Repository(_)
            | ServerError::Credential(_)
            | ServerError::Token(_)
            | ServerError::Blocking(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationError | ErrorKind::DuplicateKey => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    kind: ErrorKind,
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        error!(error = %self, %status, "Replying with error");

        // Internal failures are only described in the log.
        let error = if kind == ErrorKind::Internal {
            "internal server error".to_owned()
        } else {
            self.to_string()
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            kind,
            error,
        };
        (status, Json(error_response)).into_response()
    }
}
