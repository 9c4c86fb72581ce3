//! Common test utilities for API integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An app wired to an in-memory store
//! - Seeded users
//! - Session token generation
//! - Request helpers returning status and JSON body

#![allow(dead_code)]

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::Value;
use tankkeeper_api::app::{build_router, AppState};
use tankkeeper_api::config::Config;
use tankkeeper_shared::auth::jwt::{create_token, Claims};
use tankkeeper_shared::models::{User, UserRole};
use tankkeeper_shared::store::{DataStore, MemoryStore};
use tower::Service as _;
use uuid::Uuid;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub app: Router,
    pub config: Config,
}

/// A response reduced to what the tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Memory-backed app with first-contact provisioning on
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Same, with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("STORAGE_BACKEND".to_string(), "memory".to_string()),
            ("JWT_SECRET".to_string(), SECRET.to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let store = MemoryStore::new();
        let app = build_router(AppState::new(std::sync::Arc::new(store.clone()), config.clone()));

        Self { store, app, config }
    }

    /// Inserts a user directly into the store
    pub async fn user(&self, role: UserRole) -> User {
        let mut session = self.store.begin().await.unwrap();
        let user = session.insert_user(Uuid::new_v4(), role).await.unwrap();
        session.commit().await.unwrap();
        user
    }

    /// Valid session token for `user_id`
    pub fn token_for(&self, user_id: Uuid) -> String {
        create_token(&Claims::new(user_id), SECRET).unwrap()
    }

    /// Expired session token for `user_id`
    pub fn expired_token_for(&self, user_id: Uuid) -> String {
        create_token(&Claims::with_expiration(user_id, Duration::seconds(-60)), SECRET).unwrap()
    }

    /// Seeds a user with `role` and returns it with a token
    pub async fn signed_in(&self, role: UserRole) -> (User, String) {
        let user = self.user(role).await;
        let token = self.token_for(user.id);
        (user, token)
    }

    /// `POST /v1/rpc/{operation}` with an optional bearer token and JSON body
    pub async fn rpc(&self, operation: &str, token: Option<&str>, input: Option<Value>) -> TestResponse {
        let body = input.map(|v| v.to_string()).unwrap_or_default();
        self.rpc_raw(operation, token.map(|t| format!("Bearer {}", t)), body).await
    }

    /// `POST /v1/rpc/{operation}` with a raw Authorization header and body
    pub async fn rpc_raw(
        &self,
        operation: &str,
        authorization: Option<String>,
        body: String,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/v1/rpc/{}", operation))
            .header("content-type", "application/json");

        if let Some(authorization) = authorization {
            builder = builder.header("authorization", authorization);
        }

        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// `GET {uri}`
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
