use async_trait::async_trait;
use bloglist_common::{
    model::{
        BloglistSnowflakeGenerator, Id, ModelValidationError,
        post::{CreatePost, Post, PostMarker},
        user::{CreateUser, User, UserMarker, Username},
    },
    snowflake::{ProcessId, SnowflakeTimestampError, WorkerId},
};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::record::DbDataError;

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Username {0:?} is already taken")]
    DuplicateUsername(Username),
    #[error("User with id {0} does not exist")]
    MissingUser(Id<UserMarker>),
    #[error("Post with id {0} already exists")]
    DuplicatePostId(Id<PostMarker>),
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Record(#[from] DbDataError),
    #[error("Could not generate an id: {0}")]
    IdGeneration(#[from] SnowflakeTimestampError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Durable storage for users and posts.
///
/// Implementations own their consistency. Callers append a post to its owner's list only
/// after [`Repository::create_post`] returned, and surface a failure of that step instead
/// of compensating.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_user_by_id(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &Username) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Fails with [`RepositoryError::DuplicateUsername`] if the name is taken.
    async fn create_user(&self, user: CreateUser) -> Result<User>;

    async fn append_user_post(&self, user_id: Id<UserMarker>, post_id: Id<PostMarker>)
    -> Result<()>;

    async fn remove_user_post(&self, user_id: Id<UserMarker>, post_id: Id<PostMarker>)
    -> Result<()>;

    async fn find_post_by_id(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// Posts in the order they were first stored.
    async fn list_posts(&self) -> Result<Vec<Post>>;

    /// Never touches an existing post: an id collision is
    /// [`RepositoryError::DuplicatePostId`].
    async fn create_post(&self, post: CreatePost) -> Result<Post>;

    /// Inserts the post with `post.id`, or overwrites the editable fields of the stored one.
    /// The owner of a stored post is kept.
    async fn save_post(&self, post: Post) -> Result<Post>;

    /// Returns whether a post was removed.
    async fn delete_post_by_id(&self, post_id: Id<PostMarker>) -> Result<bool>;
}

/// Snowflake source shared by the repository implementations.
#[derive(Debug)]
pub(crate) struct IdSource {
    generator: Mutex<BloglistSnowflakeGenerator>,
}

impl IdSource {
    pub(crate) fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            generator: Mutex::new(BloglistSnowflakeGenerator::new(worker_id, process_id)),
        }
    }

    pub(crate) fn next<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }
}
