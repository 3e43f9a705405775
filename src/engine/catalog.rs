// Database catalog operations scoped to the caller's namespace

use serde_json::json;
use tracing::info;

use crate::api::DocumentStore;
use crate::core::errors::AdminError;
use crate::core::models::{Document, SessionUser};
use crate::core::namespace::{apply_namespace, visible_databases};
use crate::core::validation::validate_db_name;

/// Collection written to make a new database exist
pub const INIT_COLLECTION: &str = "init_collection";

/// Databases `user` may see, in server order
pub async fn list_visible_databases(
    store: &(dyn DocumentStore + Send + Sync),
    user: &SessionUser,
) -> Result<Vec<String>, AdminError> {
    let all = store.list_database_names().await?;
    Ok(visible_databases(user, all))
}

/// Create `requested` inside the caller's namespace and return the full name.
///
/// MongoDB creates databases lazily, so a marker document is written to
/// `init_collection` unless that collection already exists.
pub async fn create_namespaced_database(
    store: &(dyn DocumentStore + Send + Sync),
    user: &SessionUser,
    requested: &str,
) -> Result<String, AdminError> {
    let requested = requested.trim();
    validate_db_name(requested)?;

    let db_name = apply_namespace(&user.namespace(), requested);
    validate_db_name(&db_name)?;

    let existing = store.list_collection_names(&db_name).await?;
    if !existing.iter().any(|c| c == INIT_COLLECTION) {
        let mut marker = Document::new();
        marker.insert("initialized".to_string(), json!(true));
        store.insert_one(&db_name, INIT_COLLECTION, marker).await?;
    }

    info!(db = %db_name, user = %user.display_name(), "Database created");
    Ok(db_name)
}
