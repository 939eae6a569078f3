use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, AuthorizationGuard, UpdatePolicy},
    json::Json,
};
use axum::{
    extract::State,
    routing::{delete, post},
    http::{HeaderMap, StatusCode},
};
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::{
    model::{
        Id,
        post::{CreatePost, PopulatedPost, Post, PostInput, PostMarker},
        user::{PublicUser, UserMarker},
    },
    ranking,
};
use bloglist_db::Repository;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_blogs)
        .route(BlogsPath::PATH, post(create_blog))
        .typed_get(blog_stats)
        .typed_get(get_blog)
        .typed_put(update_blog)
        .route(BlogPath::PATH, delete(delete_blog))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/blogs", rejection(ServerError))]
struct BlogsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/blogs/stats", rejection(ServerError))]
struct BlogStatsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/blogs/{id}", rejection(ServerError))]
struct BlogPath {
    id: Id<PostMarker>,
}

async fn list_blogs(
    BlogsPath(): BlogsPath,
    State(repository): State<Arc<dyn Repository>>,
) -> Result<Json<Vec<PopulatedPost>>> {
    let owners: HashMap<Id<UserMarker>, PublicUser> = repository
        .list_users()
        .await?
        .iter()
        .map(|user| (user.id, user.public()))
        .collect();

    let posts = repository
        .list_posts()
        .await?
        .into_iter()
        .map(|post| {
            let owner = owners.get(&post.user).cloned();
            post.populate(owner)
        })
        .collect();

    Ok(Json(posts))
}

async fn get_blog(
    BlogPath { id }: BlogPath,
    State(repository): State<Arc<dyn Repository>>,
) -> Result<Json<Post>> {
    let post = repository
        .find_post_by_id(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn blog_stats(
    BlogStatsPath(): BlogStatsPath,
    State(repository): State<Arc<dyn Repository>>,
) -> Result<Json<serde_json::Value>> {
    let posts = repository.list_posts().await?;
    let summary = serde_json::to_value(ranking::summarize(Some(posts.as_slice())))?;

    Ok(Json(summary))
}

async fn create_blog(
    user: AuthenticatedUser,
    BlogsPath(): BlogsPath,
    State(repository): State<Arc<dyn Repository>>,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>> {
    let content = input.validate()?;

    let owner = repository
        .find_user_by_id(user.user_id())
        .await?
        .ok_or(ServerError::UnknownUser(user.user_id()))?;

    let post = repository
        .create_post(CreatePost::new(content, owner.id))
        .await?;
    repository.append_user_post(owner.id, post.id).await?;

    info!(post_id = %post.id, user_id = %owner.id, "Created blog");
    Ok(Json(post))
}

async fn update_blog(
    BlogPath { id }: BlogPath,
    State(repository): State<Arc<dyn Repository>>,
    State(guard): State<Arc<AuthorizationGuard>>,
    State(policy): State<UpdatePolicy>,
    headers: HeaderMap,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>> {
    let content = input.validate()?;
    let existing = repository.find_post_by_id(id).await?;

    if policy.strict_ownership_on_update {
        let identity = guard.authenticate(&headers)?;
        let mut post = existing.ok_or(ServerError::PostByIdNotFound(id))?;
        if !AuthorizationGuard::authorize_ownership(identity.id, post.user) {
            debug!(post_id = %id, user_id = %identity.id, "Rejecting update by non-owner");
            return Err(ServerError::NotOwner { post: id });
        }

        post.apply(content);
        return Ok(Json(repository.save_post(post).await?));
    }

    if let Some(mut post) = existing {
        post.apply(content);
        return Ok(Json(repository.save_post(post).await?));
    }

    // Upsert: the new post still needs an owner.
    let identity = guard.authenticate(&headers)?;
    let owner = repository
        .find_user_by_id(identity.id)
        .await?
        .ok_or(ServerError::UnknownUser(identity.id))?;

    let post = repository
        .save_post(CreatePost::new(content, owner.id).into_post(id))
        .await?;
    repository.append_user_post(owner.id, post.id).await?;

    info!(post_id = %post.id, user_id = %owner.id, "Inserted blog on update");
    Ok(Json(post))
}

/// Token check, owner lookup, post lookup and ownership check, in that order. Each
/// failing step ends the request with its own rejection.
async fn delete_blog(
    user: AuthenticatedUser,
    BlogPath { id }: BlogPath,
    State(repository): State<Arc<dyn Repository>>,
) -> Result<StatusCode> {
    let user = repository
        .find_user_by_id(user.user_id())
        .await?
        .ok_or(ServerError::UnknownUser(user.user_id()))?;

    let post = repository
        .find_post_by_id(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !AuthorizationGuard::authorize_ownership(user.id, post.user) {
        debug!(post_id = %id, user_id = %user.id, "Rejecting delete by non-owner");
        return Err(ServerError::NotOwner { post: id });
    }

    repository.delete_post_by_id(id).await?;
    repository.remove_user_post(user.id, id).await?;

    info!(post_id = %id, user_id = %user.id, "Deleted blog");
    Ok(StatusCode::NO_CONTENT)
}
