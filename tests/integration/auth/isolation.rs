// Namespace isolation and per-account permission flags

use axum::http::StatusCode;
use mongo_admin::api::DocumentStore;
use mongo_admin::core::models::Document;
use serde_json::json;
use tempfile::TempDir;

use crate::common::*;

const BOB: &str = "bob@example.com";
const BOB_DB: &str = "ns_bob_example_com__crm";
const ALICE: &str = "alice@example.com";

#[tokio::test]
async fn test_users_cannot_reach_other_namespaces() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());

    let mut bob = TestClient::new(state.clone());
    bob.signup_and_login(BOB, "secret1").await;
    bob.post_json("/api/databases", json!({"name": "crm"})).await;

    let mut alice = TestClient::new(state);
    alice.signup_and_login(ALICE, "secret2").await;

    let listed = body_json(alice.get("/api/databases").await).await;
    assert_eq!(listed["databases"], json!([]));

    let response = alice.get(&format!("/api/collections/{}", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "Access denied to this database");

    let response = alice
        .post_json(
            "/api/document/add",
            json!({"db": BOB_DB, "collection": "leads", "doc": {"x": 1}}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = alice.get(&format!("/api/export/{}/init_collection", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Creating "ns_bob_example_com__crm" from alice's account lands in her namespace
    let response = alice.post_json("/api/databases", json!({"name": BOB_DB})).await;
    assert_eq!(
        body_json(response).await["db"],
        format!("ns_alice_example_com__{}", BOB_DB)
    );
}

#[tokio::test]
async fn test_pages_redirect_on_foreign_database() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());

    let mut bob = TestClient::new(state.clone());
    bob.signup_and_login(BOB, "secret1").await;
    bob.post_json("/api/databases", json!({"name": "crm"})).await;

    let response = bob.get(&format!("/collections/{}", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("init_collection"));

    let response = bob.get(&format!("/data/{}/init_collection", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("(1 documents)"));

    let mut alice = TestClient::new(state);
    alice.signup_and_login(ALICE, "secret2").await;

    let response = alice.get(&format!("/collections/{}", BOB_DB)).await;
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));

    let response = alice.get(&format!("/data/{}/init_collection", BOB_DB)).await;
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));

    let response = alice.get("/collections/bad%20name").await;
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));
    let html = body_text(alice.get("/dashboard").await).await;
    assert!(html.contains("Invalid database name"));
}

#[tokio::test]
async fn test_admin_sees_every_database() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());

    let mut bob = TestClient::new(state.clone());
    bob.signup_and_login(BOB, "secret1").await;
    bob.post_json("/api/databases", json!({"name": "crm"})).await;

    let mut admin = TestClient::new(state);
    admin.login_as_admin().await;

    let listed = body_json(admin.get("/api/databases").await).await;
    let databases = listed["databases"].as_array().unwrap();
    assert!(databases.contains(&json!(BOB_DB)));

    let response = admin.get(&format!("/api/collections/{}", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_revoked_permission_applies_immediately() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());

    let mut bob = TestClient::new(state.clone());
    bob.signup_and_login(BOB, "secret1").await;
    bob.post_json("/api/databases", json!({"name": "crm"})).await;

    let mut filter = Document::new();
    filter.insert("email".to_string(), json!(BOB));
    let mut set = Document::new();
    set.insert(
        "permissions".to_string(),
        json!({
            "databases": "*",
            "collections": "*",
            "can_create_db": false,
            "can_export": false
        }),
    );
    let modified = state
        .store
        .update_one(state.users.auth_db(), "users", filter, set)
        .await
        .unwrap();
    assert_eq!(modified, 1);

    let response = bob.post_json("/api/databases", json!({"name": "more"})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["message"],
        "Permission denied: can_create_db required"
    );

    let response = bob.get(&format!("/api/export/{}/init_collection", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = bob
        .post_json("/api/collection/add", json!({"db": BOB_DB, "collection": "leads"}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_account_is_rejected() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());

    let mut bob = TestClient::new(state.clone());
    bob.signup_and_login(BOB, "secret1").await;

    let mut filter = Document::new();
    filter.insert("email".to_string(), json!(BOB));
    state
        .store
        .delete_one(state.users.auth_db(), "users", filter)
        .await
        .unwrap();

    let response = bob.post_json("/api/databases", json!({"name": "crm"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "User not found");
}

async fn set_role(state: &mongo_admin::api::AppState, email: &str, role: &str) {
    let mut filter = Document::new();
    filter.insert("email".to_string(), json!(email));
    let mut set = Document::new();
    set.insert("role".to_string(), json!(role));
    state
        .store
        .update_one(state.users.auth_db(), "users", filter, set)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_role_change_applies_without_new_login() {
    let dir = TempDir::new().unwrap();
    let state = create_test_app_state(dir.path());

    let mut bob = TestClient::new(state.clone());
    bob.signup_and_login(BOB, "secret1").await;
    bob.post_json("/api/databases", json!({"name": "crm"})).await;

    let mut alice = TestClient::new(state.clone());
    alice.signup_and_login(ALICE, "secret2").await;

    set_role(&state, ALICE, "admin").await;
    let response = alice.get(&format!("/api/collections/{}", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::OK);

    set_role(&state, ALICE, "user").await;
    let response = alice.get(&format!("/api/collections/{}", BOB_DB)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = alice
        .post_json(
            "/api/document/add",
            json!({"db": BOB_DB, "collection": "leads", "doc": {"x": 1}}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = alice.get(&format!("/data/{}/init_collection", BOB_DB)).await;
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));
}
