// Common test utilities and helpers for all test modules

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mongo_admin::api::{create_router, AppState, DocumentStore, FindOptions};
use mongo_admin::auth::audit_logger::AuditLogger;
use mongo_admin::auth::session::SESSION_COOKIE;
use mongo_admin::auth::user_store::{BootstrapAdmin, UserDirectory};
use mongo_admin::config::Config;
use mongo_admin::core::errors::StoreError;
use mongo_admin::core::models::Document;
use mongo_admin::loader::upload::UploadDir;
use mongo_admin::state::{MemoryStore, MokaSessionStore};
use mongo_admin::views::Views;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@local";
pub const ADMIN_PASSWORD: &str = "password";

/// Store whose every call fails as if MongoDB were down
pub struct UnreachableStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait::async_trait]
impl DocumentStore for UnreachableStore {
    async fn ping(&self) -> Result<(), StoreError> {
        down()
    }
    async fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        down()
    }
    async fn list_collection_names(&self, _db: &str) -> Result<Vec<String>, StoreError> {
        down()
    }
    async fn create_collection(&self, _db: &str, _collection: &str) -> Result<(), StoreError> {
        down()
    }
    async fn drop_collection(&self, _db: &str, _collection: &str) -> Result<(), StoreError> {
        down()
    }
    async fn insert_one(&self, _db: &str, _collection: &str, _doc: Document) -> Result<String, StoreError> {
        down()
    }
    async fn insert_many(&self, _db: &str, _collection: &str, _docs: Vec<Document>) -> Result<u64, StoreError> {
        down()
    }
    async fn find_one(&self, _db: &str, _collection: &str, _filter: Document) -> Result<Option<Document>, StoreError> {
        down()
    }
    async fn find(
        &self,
        _db: &str,
        _collection: &str,
        _filter: Document,
        _options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        down()
    }
    async fn count_documents(&self, _db: &str, _collection: &str, _filter: Document) -> Result<u64, StoreError> {
        down()
    }
    async fn update_one(
        &self,
        _db: &str,
        _collection: &str,
        _filter: Document,
        _set: Document,
    ) -> Result<u64, StoreError> {
        down()
    }
    async fn delete_one(&self, _db: &str, _collection: &str, _filter: Document) -> Result<u64, StoreError> {
        down()
    }
}

/// In-memory store whose database listing takes `delay`, to hold a request
/// open while another one runs
pub struct SlowListingStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl DocumentStore for SlowListingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
    async fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_database_names().await
    }
    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list_collection_names(db).await
    }
    async fn create_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        self.inner.create_collection(db, collection).await
    }
    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        self.inner.drop_collection(db, collection).await
    }
    async fn insert_one(&self, db: &str, collection: &str, doc: Document) -> Result<String, StoreError> {
        self.inner.insert_one(db, collection, doc).await
    }
    async fn insert_many(&self, db: &str, collection: &str, docs: Vec<Document>) -> Result<u64, StoreError> {
        self.inner.insert_many(db, collection, docs).await
    }
    async fn find_one(&self, db: &str, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        self.inner.find_one(db, collection, filter).await
    }
    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.find(db, collection, filter, options).await
    }
    async fn count_documents(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.inner.count_documents(db, collection, filter).await
    }
    async fn update_one(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, StoreError> {
        self.inner.update_one(db, collection, filter, set).await
    }
    async fn delete_one(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.inner.delete_one(db, collection, filter).await
    }
}

/// App state over `store` with uploads under `upload_dir`
pub fn app_state_with_store(store: Arc<dyn DocumentStore + Send + Sync>, upload_dir: &Path) -> AppState {
    let mut config = Config::test_config();
    config.upload_dir = upload_dir.to_path_buf();

    let users = Arc::new(UserDirectory::new(
        store.clone(),
        config.auth_db_name.clone(),
        config.password_hash_iterations,
        BootstrapAdmin {
            username: config.bootstrap_admin_username.clone(),
            password: config.bootstrap_admin_password.clone(),
        },
    ));

    AppState {
        store,
        users,
        sessions: Arc::new(MokaSessionStore::new(Duration::from_secs(600), 1_000)),
        uploads: Arc::new(UploadDir::new(upload_dir)),
        views: Arc::new(Views::new().expect("templates compile")),
        audit_logger: Arc::new(AuditLogger::new()),
        config: Arc::new(config),
    }
}

/// App state backed by a fresh in-memory store
pub fn create_test_app_state(upload_dir: &Path) -> AppState {
    app_state_with_store(Arc::new(MemoryStore::new()), upload_dir)
}

/// A browser-like client: keeps the session cookie between requests
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new(app_state: AppState) -> Self {
        Self {
            router: create_router(app_state),
            cookie: None,
        }
    }

    /// Reuse another client's session
    pub fn cookie_from(&mut self, other: &TestClient) {
        self.cookie = other.cookie.clone();
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap().trim();
            if pair.starts_with(SESSION_COOKIE) {
                self.cookie = Some(pair.to_string());
            }
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Fetch the session's CSRF token (starting a session if needed)
    pub async fn csrf_token(&mut self) -> String {
        let response = self.get("/api/csrf-token").await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["csrf_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// JSON request carrying the CSRF header
    pub async fn send_json(&mut self, method: &str, uri: &str, body: Value) -> Response<Body> {
        let token = self.csrf_token().await;
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-CSRFToken", token)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&mut self, uri: &str, body: Value) -> Response<Body> {
        self.send_json("POST", uri, body).await
    }

    /// Urlencoded form post; `csrf_token` is added unless already present
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let token = self.csrf_token().await;
        let mut fields: Vec<(&str, &str)> = fields.to_vec();
        if !fields.iter().any(|(name, _)| *name == "csrf_token") {
            fields.push(("csrf_token", &token));
        }
        let body = serde_urlencoded::to_string(&fields).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Multipart post with text `fields` and an optional `(filename, bytes)` file.
    /// The CSRF token goes in both the header and a `csrf_token` field.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Response<Body> {
        let token = self.csrf_token().await;
        let mut fields: Vec<(&str, &str)> = fields.to_vec();
        if !fields.iter().any(|(name, _)| *name == "csrf_token") {
            fields.push(("csrf_token", &token));
        }
        let (content_type, body) = multipart_body(&fields, file);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .header("X-CSRFToken", token)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn signup(&mut self, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/signup",
            &[
                ("email", email),
                ("password", password),
                ("confirm_password", password),
            ],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Response<Body> {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }

    /// Sign up (if needed) and log in, asserting the redirect to the dashboard
    pub async fn signup_and_login(&mut self, email: &str, password: &str) {
        self.signup(email, password).await;
        let response = self.login(email, password).await;
        assert_eq!(location(&response).as_deref(), Some("/dashboard"));
    }

    pub async fn login_as_admin(&mut self) {
        let response = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(location(&response).as_deref(), Some("/dashboard"));
    }
}

const BOUNDARY: &str = "----mongo-admin-test-boundary";

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Redirect target of a response, if any
pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
