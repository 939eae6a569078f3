#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use bloglist_api::server::{self, ServerState, auth::AuthorizationGuard, auth::UpdatePolicy};
use bloglist_common::token::{TokenConfig, TokenSecret, TokenService};
use bloglist_db::{MemoryRepository, Repository};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub repository: Arc<MemoryRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(UpdatePolicy::default())
    }

    pub fn strict() -> Self {
        Self::with_policy(UpdatePolicy {
            strict_ownership_on_update: true,
        })
    }

    pub fn with_policy(update_policy: UpdatePolicy) -> Self {
        let tokens = TokenService::new(TokenConfig {
            secret: TokenSecret::new("test secret".to_owned()),
            lifetime: None,
        })
        .unwrap();
        let repository = Arc::new(MemoryRepository::default());

        let router = server::app(ServerState {
            repository: repository.clone(),
            guard: Arc::new(AuthorizationGuard::new(tokens)),
            update_policy,
        });

        Self { router, repository }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn register(&self, user_name: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "userName": user_name, "name": "Test User", "password": password })),
        )
        .await
    }

    /// Registers a user and returns a token for them.
    pub async fn user(&self, user_name: &str) -> String {
        let (status, _) = self.register(user_name, "salainen").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "userName": user_name, "password": "salainen" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        body["token"].as_str().unwrap().to_owned()
    }

    pub async fn create_blog(&self, token: &str, blog: Value) -> (StatusCode, Value) {
        self.send(Method::POST, "/api/blogs", Some(token), Some(blog))
            .await
    }

    pub async fn post_count(&self) -> usize {
        self.repository.list_posts().await.unwrap().len()
    }
}

pub fn sample_blog() -> Value {
    json!({
        "title": "Canonical string reduction",
        "author": "Edsger W. Dijkstra",
        "url": "http://www.cs.utexas.edu/~EWD/transcriptions/EWD08xx/EWD808.html",
        "likes": 12,
    })
}
