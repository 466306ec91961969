//! Registration, sessions and the current user.

mod helpers;

use helpers::{basic_auth, login, register_user, setup_test_app};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_login_me_disconnect() {
    let app = setup_test_app().await;
    let client = app.client();

    let user = register_user(client, "a@b.com", "pw").await;

    let response = client
        .get("/users/me")
        .add_header("X-Token", user.token.clone())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body, json!({ "id": user.id, "email": "a@b.com" }));

    let response = client
        .get("/disconnect")
        .add_header("X-Token", user.token.clone())
        .await;
    assert_eq!(response.status_code(), 204);
    assert!(response.as_bytes().is_empty());

    // The token is gone for good.
    let response = client
        .get("/users/me")
        .add_header("X-Token", user.token.clone())
        .await;
    assert_eq!(response.status_code(), 401);
    let response = client
        .get("/disconnect")
        .add_header("X-Token", user.token.clone())
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_each_login_gets_its_own_session() {
    let app = setup_test_app().await;
    let client = app.client();

    let user = register_user(client, "a@b.com", "pw").await;
    let second = login(client, "a@b.com", "pw").await;
    assert_ne!(user.token, second);

    client
        .get("/disconnect")
        .add_header("X-Token", user.token.clone())
        .await;

    let response = client.get("/users/me").add_header("X-Token", second).await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/users")
        .json(&json!({ "password": "pw" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["error"], "Missing email");

    let response = client
        .post("/users")
        .json(&json!({ "email": "a@b.com" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["error"], "Missing password");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = setup_test_app().await;
    let client = app.client();

    register_user(client, "a@b.com", "pw").await;
    let response = client
        .post("/users")
        .json(&json!({ "email": "a@b.com", "password": "other" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["error"], "Already exist");
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let app = setup_test_app().await;
    let client = app.client();
    register_user(client, "a@b.com", "pw").await;

    let wrong_password = client
        .get("/connect")
        .add_header("Authorization", basic_auth("a@b.com", "nope"))
        .await;
    let unknown_email = client
        .get("/connect")
        .add_header("Authorization", basic_auth("x@b.com", "pw"))
        .await;
    let malformed = client
        .get("/connect")
        .add_header("Authorization", "Basic bm9jb2xvbg==")
        .await;
    let missing = client.get("/connect").await;

    for response in [wrong_password, unknown_email, malformed, missing] {
        assert_eq!(response.status_code(), 401);
        assert_eq!(response.json::<Value>()["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_test_app().await;
    let client = app.client();

    for path in ["/users/me", "/files", "/disconnect"] {
        let response = client.get(path).await;
        assert_eq!(response.status_code(), 401, "{}", path);

        let response = client.get(path).add_header("X-Token", "bogus").await;
        assert_eq!(response.status_code(), 401, "{}", path);
    }
}

#[tokio::test]
async fn test_welcome_job_is_processed() {
    let app = setup_test_app().await;
    register_user(app.client(), "a@b.com", "pw").await;

    assert_eq!(app.run_worker().await, 1);
    assert_eq!(app.run_worker().await, 0);
}

#[tokio::test]
async fn test_status_and_stats() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get("/status").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.json::<Value>(),
        json!({ "db": true, "sessions": true, "queue": true })
    );

    let user = register_user(client, "a@b.com", "pw").await;
    helpers::create_folder(client, &user, "docs", json!(0)).await;

    let response = client.get("/stats").await;
    assert_eq!(response.json::<Value>(), json!({ "users": 1, "files": 1 }));
}
