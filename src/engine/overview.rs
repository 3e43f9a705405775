// Dashboard counts across the caller's databases

use futures::future::join_all;
use tracing::warn;

use crate::api::DocumentStore;
use crate::core::models::{DatabaseOverview, Document, Overview};

/// Count collections and documents per database.
///
/// A database or collection that cannot be read counts as zero.
pub async fn collect_overview(
    store: &(dyn DocumentStore + Send + Sync),
    databases: Vec<String>,
) -> Overview {
    let per_db = join_all(databases.into_iter().map(|db| database_overview(store, db))).await;

    Overview {
        databases: per_db.len() as u64,
        collections: per_db.iter().map(|d| d.collections).sum(),
        documents: per_db.iter().map(|d| d.documents).sum(),
        per_db,
    }
}

async fn database_overview(store: &(dyn DocumentStore + Send + Sync), db: String) -> DatabaseOverview {
    let collections = match store.list_collection_names(&db).await {
        Ok(names) => names,
        Err(e) => {
            warn!(db = %db, error = %e, "Could not list collections for overview");
            Vec::new()
        }
    };

    let mut documents = 0;
    for collection in &collections {
        match store.count_documents(&db, collection, Document::new()).await {
            Ok(count) => documents += count,
            Err(e) => {
                warn!(db = %db, collection = %collection, error = %e, "Could not count documents")
            }
        }
    }

    DatabaseOverview {
        collections: collections.len() as u64,
        documents,
        db,
    }
}
