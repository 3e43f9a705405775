// Domain error types - client-facing messages never carry backend detail

use thiserror::Error;

/// Main error type for the admin service
#[derive(Error, Debug)]
pub enum AdminError {
    /// No logged-in user (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Logged in but not allowed (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Required request fields absent (HTTP 400)
    #[error("Missing parameters: {0}")]
    MissingParameters(String),

    #[error("Invalid database name: {0}")]
    InvalidDbName(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document cannot be empty")]
    EmptyDocument,

    #[error("Missing query: {0}")]
    MissingQuery(String),

    #[error("Update values cannot be empty")]
    EmptyUpdate,

    /// Rejected upload or unreadable spreadsheet (HTTP 400)
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("CSRF token validation failed")]
    CsrfMismatch,

    #[error("Resource not found")]
    NotFound,

    /// Database backend error, status depends on the kind
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Template rendering failed (HTTP 500)
    #[error("Render error: {0}")]
    Render(String),

    /// Local I/O (uploads, exports) failed (HTTP 500)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Errors raised by a `DocumentStore` backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// The server rejected the operation (duplicate collection, bad filter, ...)
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Server unreachable or connection lost
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Document could not be converted to or from the wire format
    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl AdminError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AdminError::Unauthorized(_) => 401,
            AdminError::Forbidden(_) => 403,
            AdminError::MissingParameters(_)
            | AdminError::InvalidDbName(_)
            | AdminError::InvalidCollectionName(_)
            | AdminError::InvalidDocument(_)
            | AdminError::EmptyDocument
            | AdminError::MissingQuery(_)
            | AdminError::EmptyUpdate
            | AdminError::InvalidUpload(_)
            | AdminError::CsrfMismatch => 400,
            AdminError::NotFound => 404,
            AdminError::Store(e) => e.status_code(),
            AdminError::Render(_) | AdminError::Io(_) | AdminError::ConfigurationError(_) => 500,
        }
    }

    /// Short machine-readable code carried in the `error` field
    pub fn error_code(&self) -> &'static str {
        match self {
            AdminError::Unauthorized(_) => "unauthorized",
            AdminError::Forbidden(_) => "forbidden",
            AdminError::MissingParameters(_) => "missing_parameters",
            AdminError::InvalidDbName(_) => "invalid_db_name",
            AdminError::InvalidCollectionName(_) => "invalid_collection_name",
            AdminError::InvalidDocument(_) => "invalid_document",
            AdminError::EmptyDocument => "empty_document",
            AdminError::MissingQuery(_) => "missing_query",
            AdminError::EmptyUpdate => "empty_update",
            AdminError::InvalidUpload(_) => "invalid_upload",
            AdminError::CsrfMismatch => "csrf_error",
            AdminError::NotFound => "not_found",
            AdminError::Store(e) => e.error_code(),
            AdminError::Render(_) | AdminError::Io(_) | AdminError::ConfigurationError(_) => {
                "internal_error"
            }
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            AdminError::Unauthorized(msg)
            | AdminError::Forbidden(msg)
            | AdminError::MissingParameters(msg)
            | AdminError::InvalidDbName(msg)
            | AdminError::InvalidCollectionName(msg)
            | AdminError::InvalidDocument(msg)
            | AdminError::MissingQuery(msg)
            | AdminError::InvalidUpload(msg) => msg.clone(),
            AdminError::EmptyDocument => "Document cannot be empty".to_string(),
            AdminError::EmptyUpdate => "Update values cannot be empty".to_string(),
            AdminError::CsrfMismatch => {
                "CSRF token validation failed. Please refresh the page and try again.".to_string()
            }
            AdminError::NotFound => "The requested resource does not exist".to_string(),
            AdminError::Store(e) => e.user_message(),
            AdminError::Render(_) | AdminError::Io(_) | AdminError::ConfigurationError(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}

impl StoreError {
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::AuthenticationFailed(_) => 401,
            StoreError::NotAuthorized(_) => 403,
            StoreError::OperationFailed(_) | StoreError::Conversion(_) => 400,
            StoreError::Unavailable(_) => 503,
            StoreError::Backend(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::AuthenticationFailed(_) => "authentication_failed",
            StoreError::NotAuthorized(_) => "not_authorized",
            StoreError::OperationFailed(_) | StoreError::Conversion(_) => "operation_failed",
            StoreError::Unavailable(_) => "database_unavailable",
            StoreError::Backend(_) => "database_error",
        }
    }

    /// Operation failures echo the server's reason; everything else is generic.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::AuthenticationFailed(_) => {
                "Unable to connect to MongoDB. Please check your credentials.".to_string()
            }
            StoreError::NotAuthorized(_) => {
                "You don't have permission to perform this operation.".to_string()
            }
            StoreError::OperationFailed(reason) | StoreError::Conversion(reason) => reason.clone(),
            StoreError::Unavailable(_) => {
                "Unable to connect to MongoDB. Please check your connection settings.".to_string()
            }
            StoreError::Backend(_) => {
                "An error occurred while accessing the database.".to_string()
            }
        }
    }
}
