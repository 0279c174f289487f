//! Test helper functions for daemon integration tests
//!
//! Builds a full router over the in-memory backend and a users file with
//! two accounts: `admin` (administrator) and `dj`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use once_cell::sync::Lazy;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use musebot_api::backend::{InMemoryBackend, PlaybackBackend};
use musebot_api::provider::{CatalogProvider, ProviderRegistry};
use musebot_api::routes::build_router;
use musebot_api::services::{hash_password, AuthConfig, AuthService, ConfigFileAuthenticator, UserEntry};
use musebot_api::websocket::{Hub, HubHandle, ServerMessage};
use musebot_api::AppState;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-32-chars!!";

/// Argon2 hashing is slow in debug builds; hash once per test binary
static USERS: Lazy<HashMap<String, UserEntry>> = Lazy::new(|| {
    let mut users = HashMap::new();
    users.insert(
        "admin".to_string(),
        UserEntry {
            password_hash: hash_password("admin-pass").unwrap(),
            administrator: true,
        },
    );
    users.insert(
        "dj".to_string(),
        UserEntry {
            password_hash: hash_password("dj-pass").unwrap(),
            administrator: false,
        },
    );
    users
});

pub fn auth_service() -> AuthService {
    let authenticator = ConfigFileAuthenticator::new(USERS.clone()).unwrap();
    AuthService::new(
        AuthConfig::new(TEST_JWT_SECRET.to_string()),
        Arc::new(authenticator),
    )
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: Arc<InMemoryBackend>,
}

impl TestApp {
    pub fn new(providers: Vec<Arc<dyn CatalogProvider>>) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }

        let state = AppState::new(
            auth_service(),
            backend.clone(),
            registry,
            Hub::spawn(),
            16,
        );
        let router = build_router(&state);
        Self {
            router,
            state,
            backend,
        }
    }

    pub async fn token(&self, username: &str) -> String {
        let password = format!("{}-pass", username);
        self.state
            .auth_service
            .login(username, &password)
            .await
            .unwrap()
            .access_token
    }

    pub async fn send(&self, request: Request<Body>) -> (axum::http::StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, body)
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Register a connection for `user` and return its mailbox
pub async fn connect(
    hub: &HubHandle,
    user: &str,
    capacity: usize,
) -> mpsc::Receiver<ServerMessage> {
    let (tx, rx) = mpsc::channel(capacity);
    hub.register(user, tx, CancellationToken::new()).await.unwrap();
    rx
}

/// Everything currently waiting in a mailbox
pub fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Queue length as the backend sees it
pub async fn queue_len(backend: &dyn PlaybackBackend) -> usize {
    backend.playback_queue().await.unwrap().len()
}
