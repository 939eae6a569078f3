use bloglist_common::{
    credential::PasswordDigest,
    model::{
        ModelValidationError,
        post::Post,
        user::{User, Username},
    },
};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("Invalid database value: {0}")]
pub struct DbDataError(pub &'static str);

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: i64,
    pub user_snowflake: i64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserPostRecord {
    pub user_snowflake: i64,
    pub post_snowflake: i64,
}

impl UserRecord {
    /// Builds the user with the ids of the posts it owns.
    pub(crate) fn into_user(self, blogs: Vec<i64>) -> Result<User, ModelValidationError> {
        Ok(User {
            id: self.user_snowflake.cast_unsigned().into(),
            username: Username::new(self.username)?,
            name: self.name,
            password_hash: PasswordDigest::from_stored(self.password_hash),
            blogs: blogs
                .into_iter()
                .map(|post_snowflake| post_snowflake.cast_unsigned().into())
                .collect(),
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = DbDataError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            title: value.title,
            author: value.author,
            url: value.url,
            likes: u64::try_from(value.likes).map_err(|_| DbDataError("negative like count"))?,
            user: value.user_snowflake.cast_unsigned().into(),
        })
    }
}

/// Like counts are stored as `BIGINT`.
pub(crate) fn likes_to_db(likes: u64) -> Result<i64, DbDataError> {
    i64::try_from(likes).map_err(|_| DbDataError("like count does not fit into BIGINT"))
}
