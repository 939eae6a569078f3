use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::{
    credential,
    model::{
        Id,
        post::{PostMarker, PostSummary},
        user::{CreateUser, Registration, User, UserProfile},
    },
};
use bloglist_db::Repository;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use tokio::task;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_user)
        .typed_get(list_users)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/users", rejection(ServerError))]
struct UsersPath();

fn profile(user: User, posts: &HashMap<Id<PostMarker>, PostSummary>) -> UserProfile {
    let blogs = user
        .blogs
        .iter()
        .filter_map(|post_id| posts.get(post_id).cloned())
        .collect();

    UserProfile {
        id: user.id,
        user_name: user.username,
        name: user.name,
        blogs,
    }
}

async fn create_user(
    UsersPath(): UsersPath,
    State(repository): State<Arc<dyn Repository>>,
    Json(registration): Json<Registration>,
) -> Result<Json<UserProfile>> {
    let registration = registration.validate()?;

    let password = registration.password;
    let password_hash =
        task::spawn_blocking(move || credential::hash_password(&password)).await??;

    let user = repository
        .create_user(CreateUser {
            username: registration.username,
            name: registration.name,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username.get(), "Registered user");
    Ok(Json(profile(user, &HashMap::new())))
}

async fn list_users(
    UsersPath(): UsersPath,
    State(repository): State<Arc<dyn Repository>>,
) -> Result<Json<Vec<UserProfile>>> {
    let posts: HashMap<_, _> = repository
        .list_posts()
        .await?
        .iter()
        .map(|post| (post.id, post.summary()))
        .collect();

    let users = repository
        .list_users()
        .await?
        .into_iter()
        .map(|user| profile(user, &posts))
        .collect();

    Ok(Json(users))
}
