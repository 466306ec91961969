//! Test helpers: build AppState and router over the in-memory stores.
//!
//! Run from workspace root: `cargo test -p fileshelf-api`.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use base64::Engine;
use fileshelf_api::setup::routes::setup_routes;
use fileshelf_api::setup::services::build_state;
use fileshelf_api::state::AppState;
use fileshelf_core::{Config, StoreBackend};
use fileshelf_db::Stores;
use fileshelf_storage::{LocalStorage, Storage};
use fileshelf_worker::{Dispatcher, JobQueueConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Test application: server, state and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub dispatcher: Dispatcher,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Process every queued job, as a worker would.
    pub async fn run_worker(&self) -> usize {
        self.dispatcher
            .run_until_idle(&self.state.queue)
            .await
            .expect("Failed to process jobs")
    }
}

/// Setup test app with in-memory stores and a temporary storage root.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let mut config = Config::from_lookup(|_| None).expect("Failed to build config");
    config.store_backend = StoreBackend::Memory;
    config.folder_path = temp_dir.path().to_path_buf();
    config.worker_enabled = false;

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(&config.folder_path)
            .await
            .expect("Failed to create local storage"),
    );
    let stores = Stores::in_memory(Duration::from_secs(config.session_ttl_seconds));

    let dispatcher = Dispatcher::for_stores(JobQueueConfig::from(&config), &stores, storage.clone());
    let state = build_state(config, stores, storage);
    let app = setup_routes(state.clone());

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        dispatcher,
        _temp_dir: temp_dir,
    }
}

pub fn basic_auth(email: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", email, password));
    format!("Basic {}", encoded)
}

/// Registered user with a live session.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

pub async fn register_user(client: &TestServer, email: &str, password: &str) -> TestUser {
    let response = client
        .post("/users")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let id = body["id"].as_str().expect("id").to_string();

    let token = login(client, email, password).await;
    TestUser {
        id,
        email: email.to_string(),
        token,
    }
}

pub async fn login(client: &TestServer, email: &str, password: &str) -> String {
    let response = client
        .get("/connect")
        .add_header("Authorization", basic_auth(email, password))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["token"].as_str().expect("token").to_string()
}

/// `POST /files` as `user`; returns the raw response.
pub async fn upload(
    client: &TestServer,
    user: &TestUser,
    body: Value,
) -> axum_test::TestResponse {
    client
        .post("/files")
        .add_header("X-Token", user.token.clone())
        .json(&body)
        .await
}

pub async fn create_folder(client: &TestServer, user: &TestUser, name: &str, parent: Value) -> Value {
    let response = upload(
        client,
        user,
        json!({ "name": name, "type": "folder", "parentId": parent }),
    )
    .await;
    assert_eq!(response.status_code(), 201);
    response.json()
}
