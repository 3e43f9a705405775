// Name and document validation for store operations

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::core::errors::AdminError;
use crate::core::models::Document;

pub const MAX_DB_NAME_LEN: usize = 63;
pub const MAX_COLLECTION_NAME_LEN: usize = 255;

const RESERVED_DB_NAMES: &[&str] = &["admin", "local", "config", "system"];

static DB_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-]{1,63}$").expect("static regex"));
static COLLECTION_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-\.]{1,255}$").expect("static regex"));
static INVALID_COLLECTION_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_\-\.]").expect("static regex"));

/// Validate a database name against MongoDB's naming rules
pub fn validate_db_name(name: &str) -> Result<(), AdminError> {
    let invalid = |msg: &str| Err(AdminError::InvalidDbName(msg.to_string()));

    let name = name.trim();
    if name.is_empty() {
        return invalid("Database name cannot be empty");
    }
    if name.chars().count() > MAX_DB_NAME_LEN {
        return invalid("Database name cannot exceed 63 characters");
    }
    if RESERVED_DB_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err(AdminError::InvalidDbName(format!(
            "Database name '{}' is reserved and cannot be used",
            name
        )));
    }
    if !DB_NAME_PATTERN.is_match(name) {
        return invalid(
            "Database name can only contain letters, numbers, underscores, and hyphens",
        );
    }
    if name.starts_with('-') || name.starts_with('_') {
        return invalid("Database name cannot start with '-' or '_'");
    }
    Ok(())
}

/// Validate a collection name against MongoDB's naming rules
pub fn validate_collection_name(name: &str) -> Result<(), AdminError> {
    let invalid = |msg: &str| Err(AdminError::InvalidCollectionName(msg.to_string()));

    let name = name.trim();
    if name.is_empty() {
        return invalid("Collection name cannot be empty");
    }
    if name.chars().count() > MAX_COLLECTION_NAME_LEN {
        return invalid("Collection name cannot exceed 255 characters");
    }
    if name.starts_with("system.") {
        return invalid("Collection name cannot start with 'system.'");
    }
    if !COLLECTION_NAME_PATTERN.is_match(name) {
        return invalid(
            "Collection name can only contain letters, numbers, underscores, hyphens, and dots",
        );
    }
    Ok(())
}

/// Check a document is a non-empty object with no top-level operators.
///
/// `$oid` and `$date` are let through as extended-JSON markers.
pub fn validate_document_structure(doc: &Value) -> Result<&Document, AdminError> {
    let map = doc
        .as_object()
        .ok_or_else(|| AdminError::InvalidDocument("Document must be a JSON object".to_string()))?;

    if map.is_empty() {
        return Err(AdminError::EmptyDocument);
    }

    for key in map.keys() {
        if key.starts_with('$') && key != "$oid" && key != "$date" {
            return Err(AdminError::InvalidDocument(format!(
                "Invalid key '{}': MongoDB operators are not allowed in document fields",
                key
            )));
        }
    }
    Ok(map)
}

/// Parse a JSON object typed into a text field (document editor modal)
pub fn parse_json_object(raw: &str) -> Result<Document, AdminError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AdminError::InvalidDocument("JSON cannot be empty".to_string()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AdminError::InvalidDocument(
            "JSON must be a valid object (dictionary)".to_string(),
        )),
        Err(e) => Err(AdminError::InvalidDocument(format!("Invalid JSON format: {}", e))),
    }
}

/// Turn an arbitrary label (an uploaded file's stem) into a usable collection name
pub fn sanitize_collection_name(name: &str) -> String {
    let sanitized = INVALID_COLLECTION_CHARS.replace_all(name, "_");
    sanitized
        .trim_start_matches('.')
        .chars()
        .take(MAX_COLLECTION_NAME_LEN)
        .collect()
}
