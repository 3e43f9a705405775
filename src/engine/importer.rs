// Spreadsheet preview and bulk import

use std::path::PathBuf;
use tracing::info;

use crate::api::DocumentStore;
use crate::core::errors::AdminError;
use crate::loader::spreadsheet::Spreadsheet;
use crate::loader::upload::UploadDir;

/// Parse an upload off the async runtime
pub async fn read_spreadsheet(path: PathBuf) -> Result<Spreadsheet, AdminError> {
    tokio::task::spawn_blocking(move || Spreadsheet::read(&path))
        .await
        .map_err(|e| AdminError::Io(std::io::Error::other(e)))?
}

/// Load the stored upload `token` and bulk-insert every row into `db.collection`.
///
/// The upload is removed once its rows are in the database.
pub async fn import_upload(
    store: &(dyn DocumentStore + Send + Sync),
    uploads: &UploadDir,
    token: &str,
    db_name: &str,
    collection_name: &str,
) -> Result<u64, AdminError> {
    let path = uploads.resolve(token).await?;
    let sheet = read_spreadsheet(path).await?;
    let rows = sheet.into_records();
    let row_count = rows.len();

    let inserted = store.insert_many(db_name, collection_name, rows).await?;
    uploads.remove(token).await;

    info!(
        db = %db_name,
        collection = %collection_name,
        rows = row_count,
        inserted = inserted,
        "Spreadsheet imported"
    );
    Ok(inserted)
}
