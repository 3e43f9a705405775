// Response types for API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::api::middleware::new_error_id;
use crate::core::errors::AdminError;
use crate::core::models::Document;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct DatabasesResponse {
    pub databases: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateDatabaseResponse {
    pub ok: bool,
    pub db: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub collections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionCreatedResponse {
    pub ok: bool,
    pub collection: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CollectionDeletedResponse {
    pub ok: bool,
    pub deleted: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InsertedResponse {
    pub inserted_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ModifiedResponse {
    pub modified: u64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
    pub message: String,
}

/// GET /api/data/{db}/{collection}
#[derive(Debug, Serialize)]
pub struct CollectionPageResponse {
    pub docs: Vec<Document>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// GET /api/data/refresh
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub documents: Vec<Document>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub ok: bool,
    pub inserted: u64,
    pub db: String,
    pub collection: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub ok: bool,
    pub mongo_uri: String,
    pub databases: Vec<String>,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    pub error_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, error: &str, message: String) -> Self {
        Self {
            status,
            error: error.to_string(),
            message,
            error_id: None,
        }
    }

    /// Create from AdminError, logging the internal detail under a fresh error id
    pub fn from_admin_error(err: AdminError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error_id = new_error_id();

        if status.is_server_error() {
            error!(error_id = %error_id, error = %err, status = status.as_u16(), "Request failed");
        } else {
            warn!(error_id = %error_id, error = %err, status = status.as_u16(), "Request rejected");
        }

        Self {
            status,
            error: err.error_code().to_string(),
            message: err.user_message(),
            error_id: Some(error_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.error,
            message: self.message,
            error_id: self.error_id,
        });
        (self.status, body).into_response()
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        ApiError::from_admin_error(err)
    }
}

impl From<crate::core::errors::StoreError> for ApiError {
    fn from(err: crate::core::errors::StoreError) -> Self {
        ApiError::from_admin_error(AdminError::Store(err))
    }
}
