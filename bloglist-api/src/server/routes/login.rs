use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthorizationGuard, json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bloglist_common::{
    credential,
    model::user::{User, Username},
    token::IdentityClaims,
};
use bloglist_db::Repository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(login)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    user_name: Option<String>,
    password: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    user_name: Username,
    name: String,
}

async fn find_user(
    repository: &dyn Repository,
    user_name: Option<String>,
) -> Result<Option<User>> {
    let Some(Ok(username)) = user_name.map(Username::new) else {
        return Ok(None);
    };

    Ok(repository.find_user_by_username(&username).await?)
}

/// Unknown users and wrong passwords are indistinguishable to the client.
async fn login(
    LoginPath(): LoginPath,
    State(repository): State<Arc<dyn Repository>>,
    State(guard): State<Arc<AuthorizationGuard>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = find_user(repository.as_ref(), request.user_name).await?;
    let password = request.password.unwrap_or_default();

    let (user, verified) = task::spawn_blocking(move || {
        let verified =
            credential::verify_password(&password, user.as_ref().map(|user| &user.password_hash));
        (user, verified)
    })
    .await?;

    let Some(user) = user.filter(|_| verified) else {
        debug!("Rejecting login with invalid credentials");
        return Err(ServerError::InvalidCredentials);
    };

    let token = guard.tokens().issue(&IdentityClaims {
        username: user.username.clone(),
        id: user.id,
    })?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        user_name: user.username,
        name: user.name,
    }))
}
