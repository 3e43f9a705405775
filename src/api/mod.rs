// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod responses;

use crate::auth::audit_logger::AuditLogger;
use crate::auth::auth_middleware::{csrf_protect, require_api_login, require_page_login};
use crate::auth::session::{session_middleware, Session};
use crate::auth::user_store::UserDirectory;
use crate::core::errors::{AdminError, StoreError};
use crate::core::models::Document;
use crate::loader::upload::UploadDir;
use crate::views::Views;

pub use crate::config::Config;

/// Application state containing all shared dependencies
///
/// All components are wrapped in Arc for shared ownership across async tasks.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore + Send + Sync>,
    pub users: Arc<UserDirectory>,
    pub sessions: Arc<dyn SessionStore + Send + Sync>,
    pub uploads: Arc<UploadDir>,
    pub views: Arc<Views>,
    pub audit_logger: Arc<AuditLogger>,
    pub config: Arc<Config>,
}

/// Read options for `DocumentStore::find`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub skip: u64,
    pub limit: Option<u64>,
    /// When false, `_id` is projected out
    pub include_id: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: None,
            include_id: true,
        }
    }
}

/// Document database operations used by the admin layer
///
/// Filters are top-level equality matches. A string `_id` in a filter that
/// parses as an ObjectId matches the ObjectId. Documents come back with `_id`
/// rendered as a string.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
    async fn list_database_names(&self) -> Result<Vec<String>, StoreError>;
    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError>;
    async fn create_collection(&self, db: &str, collection: &str) -> Result<(), StoreError>;
    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError>;
    /// Returns the inserted `_id` as a string
    async fn insert_one(&self, db: &str, collection: &str, doc: Document) -> Result<String, StoreError>;
    /// Returns the number of documents inserted
    async fn insert_many(&self, db: &str, collection: &str, docs: Vec<Document>) -> Result<u64, StoreError>;
    async fn find_one(&self, db: &str, collection: &str, filter: Document) -> Result<Option<Document>, StoreError>;
    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError>;
    async fn count_documents(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError>;
    /// `$set` the given fields on the first match; returns the modified count
    async fn update_one(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, StoreError>;
    /// Delete the first match; returns the deleted count
    async fn delete_one(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError>;
}

/// Trait for server-side session storage
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, AdminError>;
    async fn save(&self, session: Session) -> Result<(), AdminError>;
    /// Replace a live session. Returns `false`, storing nothing, when the
    /// session has expired or been removed.
    async fn update(&self, session: Session) -> Result<bool, AdminError>;
    async fn remove(&self, session_id: &str) -> Result<(), AdminError>;
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Request timeout (tower::timeout) with HandleErrorLayer
/// - Body size limit (tower-http::limit)
/// - Tracing (tower-http::trace)
/// - Session cookie load/store
/// - Login check (JSON 401 for `/api`, redirect for pages) and CSRF check
///   for state-changing API calls, as route layers
///
/// `/health`, `/login`, `/signup`, `/logout` and `/api/csrf-token` need no login.
pub fn create_router(app_state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(pages::index))
        .route("/login", get(pages::login_form).post(pages::login_submit))
        .route("/signup", get(pages::signup_form).post(pages::signup_submit))
        .route("/logout", get(pages::logout))
        .route("/health", get(handlers::health_handler))
        .route("/api/csrf-token", get(handlers::csrf_token_handler));

    let pages = Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/collections/:db_name", get(pages::collections))
        .route("/data/:db_name/:collection_name", get(pages::data_view))
        .route("/upload", get(pages::upload_form).post(pages::upload_submit))
        .route_layer(from_fn_with_state(app_state.clone(), require_page_login));

    let api = Router::new()
        .route(
            "/api/databases",
            get(handlers::list_databases_handler).post(handlers::create_database_handler),
        )
        .route("/api/collections/:db_name", get(handlers::list_collections_handler))
        .route("/api/collection/add", post(handlers::create_collection_handler))
        .route("/api/collection/create", post(handlers::create_collection_handler))
        .route("/api/collection/delete", post(handlers::delete_collection_handler))
        .route("/api/document/add", post(handlers::insert_document_handler))
        .route("/api/document/update", post(handlers::update_document_handler))
        .route("/api/document/delete", post(handlers::delete_document_handler))
        .route("/api/data/refresh", get(handlers::data_refresh_handler))
        .route(
            "/api/data/:db_name/:collection_name",
            get(handlers::collection_data_handler),
        )
        .route("/api/import", post(handlers::import_handler))
        .route(
            "/api/export/:db_name/:collection_name",
            get(handlers::export_csv_handler),
        )
        .route("/api/info", get(handlers::info_handler))
        .route("/api/metrics/overview", get(handlers::metrics_overview_handler))
        .route_layer(from_fn(csrf_protect))
        .route_layer(from_fn_with_state(app_state.clone(), require_api_login));

    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    let router = Router::new()
        .merge(public)
        .merge(pages)
        .merge(api)
        .fallback(handlers::not_found_handler)
        .layer(from_fn_with_state(app_state.clone(), session_middleware))
        .layer(middleware::tracing_layer())
        // Multipart and Json extractors carry their own 2MB default
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit));

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router.layer(middleware_stack).with_state(app_state)
}
