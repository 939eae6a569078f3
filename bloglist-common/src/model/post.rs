use crate::model::{
    Id, ModelValidationError,
    user::{PublicUser, UserMarker},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A stored blog entry. `user` is the owner and never changes after creation.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: u64,
    pub user: Id<UserMarker>,
}

/// A post together with the public part of its owner, as listed by the API.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PopulatedPost {
    pub id: Id<PostMarker>,
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: u64,
    pub user: Option<PublicUser>,
}

/// The part of a post embedded in a user's profile.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostSummary {
    pub id: Id<PostMarker>,
    pub title: String,
    pub author: String,
    pub url: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub content: PostContent,
    pub likes: u64,
    pub user: Id<UserMarker>,
}

/// Post fields as received from clients, before validation.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<u64>,
}

/// Validated post fields. `likes` stays optional so an update can leave the count alone.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    pub title: String,
    pub author: String,
    pub url: String,
    pub likes: Option<u64>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("Blog validation failed: {field}: Path `{field}` is required.")]
pub struct MissingFieldError {
    pub field: &'static str,
}

/// Like counts must fit into a signed 64-bit column.
pub const MAX_LIKES: u64 = i64::MAX.cast_unsigned();

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error(
    "Blog validation failed: likes: Path `likes` ({0}) is more than maximum allowed value ({max}).",
    max = MAX_LIKES
)]
pub struct TooManyLikesError(pub u64);

fn required(value: Option<String>, field: &'static str) -> Result<String, MissingFieldError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(MissingFieldError { field })
}

impl PostInput {
    pub fn validate(self) -> Result<PostContent, ModelValidationError> {
        Ok(PostContent {
            title: required(self.title, "title")?,
            url: required(self.url, "url")?,
            author: self.author.unwrap_or_default(),
            likes: self
                .likes
                .map(|likes| {
                    if likes > MAX_LIKES {
                        Err(TooManyLikesError(likes))
                    } else {
                        Ok(likes)
                    }
                })
                .transpose()?,
        })
    }
}

impl CreatePost {
    /// Missing likes are stored as zero.
    #[must_use]
    pub fn new(content: PostContent, user: Id<UserMarker>) -> Self {
        let likes = content.likes.unwrap_or(0);
        Self {
            content,
            likes,
            user,
        }
    }

    #[must_use]
    pub fn into_post(self, id: Id<PostMarker>) -> Post {
        Post {
            id,
            title: self.content.title,
            author: self.content.author,
            url: self.content.url,
            likes: self.likes,
            user: self.user,
        }
    }
}

impl Post {
    /// Overwrites the editable fields; likes only when supplied.
    pub fn apply(&mut self, content: PostContent) {
        self.title = content.title;
        self.author = content.author;
        self.url = content.url;
        if let Some(likes) = content.likes {
            self.likes = likes;
        }
    }

    #[must_use]
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            url: self.url.clone(),
        }
    }

    #[must_use]
    pub fn populate(self, owner: Option<PublicUser>) -> PopulatedPost {
        PopulatedPost {
            id: self.id,
            title: self.title,
            author: self.author,
            url: self.url,
            likes: self.likes,
            user: owner,
        }
    }
}
