// Request handlers for JSON API endpoints

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::responses::{
    ApiError, CollectionCreatedResponse, CollectionDeletedResponse, CollectionPageResponse,
    CollectionsResponse, CreateDatabaseResponse, CsrfTokenResponse, DatabasesResponse,
    DeletedResponse, HealthResponse, ImportResponse, InfoResponse, InsertedResponse,
    ModifiedResponse, RefreshResponse,
};
use crate::api::{AppState, FindOptions};
use crate::auth::audit_logger::ClientInfo;
use crate::auth::auth_middleware::{ensure_db_access, require_permission};
use crate::auth::session::SessionHandle;
use crate::core::errors::AdminError;
use crate::core::models::{
    CollectionRequest, CreateDatabaseRequest, DeleteDocumentRequest, Document,
    InsertDocumentRequest, Overview, Permission, SessionUser, UpdateDocumentRequest,
};
use crate::core::pagination::{Page, PageParams, API_PAGE_SIZE, VIEW_PAGE_SIZE};
use crate::core::validation::{
    parse_json_object, validate_collection_name, validate_db_name, validate_document_structure,
};
use crate::engine::{catalog, importer, overview};
use crate::loader::export::{documents_to_csv, export_filename};

const HEALTH_PING_TIMEOUT: Duration = Duration::from_millis(800);

/// Trimmed, non-empty value of an optional request field
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `db` + `collection` pair from a request body, both required
fn require_target(
    db: Option<String>,
    collection: Option<String>,
    message: &str,
) -> Result<(String, String), AdminError> {
    match (present(db), present(collection)) {
        (Some(db), Some(collection)) => Ok((db, collection)),
        _ => Err(AdminError::MissingParameters(message.to_string())),
    }
}

/// Validate both names and check the caller may use the database
fn authorize_target(
    state: &AppState,
    user: &SessionUser,
    client: &ClientInfo,
    db_name: &str,
    collection_name: &str,
) -> Result<(), AdminError> {
    validate_db_name(db_name)?;
    validate_collection_name(collection_name)?;
    ensure_db_access(state, user, db_name, client)
}

/// Health check handler
///
/// GET /health
///
/// Never fails: a slow or unreachable database is reported in the body.
pub async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let database = match tokio::time::timeout(HEALTH_PING_TIMEOUT, app_state.store.ping()).await {
        Ok(Ok(())) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Database ping failed");
            "disconnected".to_string()
        }
        Err(_) => {
            debug!("Database ping timed out in health check");
            "slow: timeout".to_string()
        }
    };

    let status = if database == "connected" { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        database,
    })
}

/// GET /api/csrf-token
pub async fn csrf_token_handler(Extension(session): Extension<SessionHandle>) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        csrf_token: session.csrf_token(),
    })
}

/// GET /api/databases
pub async fn list_databases_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<DatabasesResponse>, ApiError> {
    let databases = catalog::list_visible_databases(app_state.store.as_ref(), &user).await?;
    info!(user = %user.display_name(), count = databases.len(), "Database list retrieved");
    Ok(Json(DatabasesResponse { databases }))
}

/// POST /api/databases
pub async fn create_database_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Option<Json<CreateDatabaseRequest>>,
) -> Result<Json<CreateDatabaseResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    require_permission(&app_state, &user, Permission::CreateDatabase, &client)?;

    let Json(request) = payload.unwrap_or_default();
    let name = present(request.name)
        .ok_or_else(|| AdminError::MissingParameters("Database name is required".to_string()))?;

    let db = catalog::create_namespaced_database(app_state.store.as_ref(), &user, &name).await?;
    Ok(Json(CreateDatabaseResponse {
        ok: true,
        db,
        message: "Database created successfully".to_string(),
    }))
}

/// GET /api/collections/{db}
pub async fn list_collections_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(db_name): Path<String>,
) -> Result<Json<CollectionsResponse>, ApiError> {
    validate_db_name(&db_name)?;
    ensure_db_access(&app_state, &user, &db_name, &ClientInfo::from_headers(&headers))?;

    let collections = app_state.store.list_collection_names(&db_name).await?;
    Ok(Json(CollectionsResponse { collections }))
}

/// POST /api/collection/add, POST /api/collection/create
pub async fn create_collection_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Option<Json<CollectionRequest>>,
) -> Result<Json<CollectionCreatedResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    require_permission(&app_state, &user, Permission::CreateCollection, &client)?;

    let Json(request) = payload.unwrap_or_default();
    let (db_name, collection_name) = require_target(
        request.db,
        request.collection,
        "Both database name and collection name are required",
    )?;
    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    app_state
        .store
        .create_collection(&db_name, &collection_name)
        .await?;

    info!(db = %db_name, collection = %collection_name, "Collection created");
    Ok(Json(CollectionCreatedResponse {
        ok: true,
        collection: collection_name,
        message: "Collection created successfully".to_string(),
    }))
}

/// POST /api/collection/delete
pub async fn delete_collection_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Option<Json<CollectionRequest>>,
) -> Result<Json<CollectionDeletedResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    require_permission(&app_state, &user, Permission::DeleteCollection, &client)?;

    let Json(request) = payload.unwrap_or_default();
    let (db_name, collection_name) = require_target(
        request.db,
        request.collection,
        "Both database name and collection name are required",
    )?;
    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    app_state
        .store
        .drop_collection(&db_name, &collection_name)
        .await?;

    info!(db = %db_name, collection = %collection_name, "Collection deleted");
    Ok(Json(CollectionDeletedResponse {
        ok: true,
        deleted: collection_name,
        message: "Collection deleted successfully".to_string(),
    }))
}

/// POST /api/document/add
///
/// `doc` may be a JSON object or a string holding one (raw editor text).
pub async fn insert_document_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Option<Json<InsertDocumentRequest>>,
) -> Result<Json<InsertedResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    let Json(request) = payload.unwrap_or_default();
    let (db_name, collection_name) = require_target(
        request.db,
        request.collection,
        "Database name and collection name are required",
    )?;

    let doc = match request.doc {
        None | Some(Value::Null) => return Err(AdminError::EmptyDocument.into()),
        Some(Value::String(raw)) => Value::Object(parse_json_object(&raw)?),
        Some(value) => value,
    };
    let doc = validate_document_structure(&doc)?.clone();

    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let inserted_id = app_state
        .store
        .insert_one(&db_name, &collection_name, doc)
        .await?;

    info!(db = %db_name, collection = %collection_name, id = %inserted_id, "Document inserted");
    Ok(Json(InsertedResponse {
        inserted_id,
        message: "Document inserted successfully".to_string(),
    }))
}

/// POST /api/document/update
///
/// `$set`s `new_values` on the first document matching `query`. `_id` is
/// never updated.
pub async fn update_document_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Option<Json<UpdateDocumentRequest>>,
) -> Result<Json<ModifiedResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    let Json(request) = payload.unwrap_or_default();
    let (db_name, collection_name) = require_target(
        request.db,
        request.collection,
        "Database name and collection name are required",
    )?;

    let query = request
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AdminError::MissingQuery("Update query is required".to_string()))?;
    let new_values: Document = request
        .new_values
        .unwrap_or_default()
        .into_iter()
        .filter(|(key, _)| key != "_id")
        .collect();
    if new_values.is_empty() {
        return Err(AdminError::EmptyUpdate.into());
    }

    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let modified = app_state
        .store
        .update_one(&db_name, &collection_name, query, new_values)
        .await?;

    info!(db = %db_name, collection = %collection_name, modified = modified, "Document updated");
    Ok(Json(ModifiedResponse {
        modified,
        message: format!("Updated {} document(s)", modified),
    }))
}

/// POST /api/document/delete
pub async fn delete_document_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Option<Json<DeleteDocumentRequest>>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    let Json(request) = payload.unwrap_or_default();
    let (db_name, collection_name) = require_target(
        request.db,
        request.collection,
        "Database name and collection name are required",
    )?;

    let query = request
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AdminError::MissingQuery("Delete query is required".to_string()))?;

    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let deleted = app_state
        .store
        .delete_one(&db_name, &collection_name, query)
        .await?;

    info!(db = %db_name, collection = %collection_name, deleted = deleted, "Document deleted");
    Ok(Json(DeletedResponse {
        deleted,
        message: format!("Deleted {} document(s)", deleted),
    }))
}

/// Query string of GET /api/data/refresh
#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    pub db: Option<String>,
    pub collection: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/data/refresh
///
/// Table refresh for the data view; `_id` is left out.
pub async fn data_refresh_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Query(params): Query<RefreshParams>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    let (db_name, collection_name) = require_target(
        params.db,
        params.collection,
        "Database name and collection name are required",
    )?;
    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let page = Page::from_params(
        &PageParams {
            page: params.page,
            limit: params.limit,
        },
        VIEW_PAGE_SIZE,
    );
    let options = FindOptions {
        skip: page.skip(),
        limit: Some(page.limit),
        include_id: false,
    };
    let documents = app_state
        .store
        .find(&db_name, &collection_name, Document::new(), options)
        .await?;
    let total = app_state
        .store
        .count_documents(&db_name, &collection_name, Document::new())
        .await?;

    Ok(Json(RefreshResponse { documents, total }))
}

/// GET /api/data/{db}/{collection}?page=&limit=
pub async fn collection_data_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path((db_name, collection_name)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<CollectionPageResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let page = Page::from_params(&params, API_PAGE_SIZE);
    let total = app_state
        .store
        .count_documents(&db_name, &collection_name, Document::new())
        .await?;
    let docs = app_state
        .store
        .find(
            &db_name,
            &collection_name,
            Document::new(),
            FindOptions {
                skip: page.skip(),
                limit: Some(page.limit),
                include_id: true,
            },
        )
        .await?;

    Ok(Json(CollectionPageResponse {
        docs,
        total,
        page: page.page,
        limit: page.limit,
    }))
}

/// Fields of the multipart upload form shared by `/api/import` and `/upload`
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<(String, Bytes)>,
    pub db_name: Option<String>,
    pub collection_name: Option<String>,
    pub file_token: Option<String>,
    pub csrf_token: Option<String>,
    pub preview: bool,
    pub import: bool,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AdminError> {
        let bad_form = |e: axum::extract::multipart::MultipartError| {
            AdminError::InvalidUpload(format!("Malformed upload form: {}", e))
        };

        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    if !filename.is_empty() {
                        form.file = Some((filename, bytes));
                    }
                }
                "db" | "db_name" => form.db_name = present(Some(field.text().await.map_err(bad_form)?)),
                "collection" | "collection_name" => {
                    form.collection_name = present(Some(field.text().await.map_err(bad_form)?))
                }
                "file_token" => form.file_token = present(Some(field.text().await.map_err(bad_form)?)),
                "csrf_token" => form.csrf_token = Some(field.text().await.map_err(bad_form)?),
                "preview" => form.preview = true,
                "import" => form.import = true,
                other => debug!(field = %other, "Ignoring unknown upload field"),
            }
        }
        Ok(form)
    }
}

/// POST /api/import (multipart: `file`, `db`, `collection`)
pub async fn import_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    require_permission(&app_state, &user, Permission::Import, &client)?;

    let form = UploadForm::read(multipart).await?;
    let (db_name, collection_name) = require_target(
        form.db_name,
        form.collection_name,
        "Database name and collection name are required",
    )?;
    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let (filename, bytes) = form.file.ok_or_else(|| {
        AdminError::InvalidUpload("Please upload a valid Excel or CSV file.".to_string())
    })?;
    let token = app_state.uploads.save(&filename, &bytes).await?;
    let inserted = importer::import_upload(
        app_state.store.as_ref(),
        &app_state.uploads,
        &token,
        &db_name,
        &collection_name,
    )
    .await?;

    Ok(Json(ImportResponse {
        ok: true,
        inserted,
        message: format!("Inserted {} documents into {}.{}", inserted, db_name, collection_name),
        db: db_name,
        collection: collection_name,
    }))
}

/// GET /api/export/{db}/{collection}
pub async fn export_csv_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path((db_name, collection_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let client = ClientInfo::from_headers(&headers);
    require_permission(&app_state, &user, Permission::Export, &client)?;
    authorize_target(&app_state, &user, &client, &db_name, &collection_name)?;

    let docs = app_state
        .store
        .find(&db_name, &collection_name, Document::new(), FindOptions::default())
        .await?;
    let body = documents_to_csv(&docs)?;

    info!(db = %db_name, collection = %collection_name, rows = docs.len(), "Collection exported");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(&db_name, &collection_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// GET /api/info
///
/// Connection diagnostics. Any failure is a 500 `{ok: false, error}`.
pub async fn info_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Response {
    let result = async {
        app_state.store.ping().await?;
        catalog::list_visible_databases(app_state.store.as_ref(), &user).await
    }
    .await;

    match result {
        Ok(databases) => Json(InfoResponse {
            ok: true,
            mongo_uri: app_state.config.masked_mongo_uri(),
            databases,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Diagnostics check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.user_message() })),
            )
                .into_response()
        }
    }
}

/// GET /api/metrics/overview
pub async fn metrics_overview_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Overview>, ApiError> {
    let databases = catalog::list_visible_databases(app_state.store.as_ref(), &user).await?;
    let overview = overview::collect_overview(app_state.store.as_ref(), databases).await;
    Ok(Json(overview))
}

/// Fallback for unknown routes
pub async fn not_found_handler() -> ApiError {
    ApiError::from_admin_error(AdminError::NotFound)
}
