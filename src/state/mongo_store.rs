// MongoDB-backed document store

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, FindOptions as MongoFindOptions};
use mongodb::{Client, Collection};
use serde_json::{Number, Value};
use std::time::Duration;
use tracing::debug;

use crate::api::{DocumentStore, FindOptions};
use crate::core::errors::StoreError;
use crate::core::models::Document;

const AUTHENTICATION_FAILED: i32 = 18;
const UNAUTHORIZED: i32 = 13;

/// Document store over the official MongoDB driver
///
/// A single `Client` is shared by every request; the driver pools connections.
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Build a client for `uri`.
    ///
    /// No connection is opened until the first operation; `timeout` bounds both
    /// connection establishment and server selection so an unreachable server
    /// surfaces as `StoreError::Unavailable` instead of hanging requests.
    pub async fn connect(uri: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await.map_err(map_error)?;
        options.app_name = Some("mongo-admin".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(map_error)?;
        Ok(Self { client })
    }

    fn collection(&self, db: &str, collection: &str) -> Collection<bson::Document> {
        self.client.database(db).collection::<bson::Document>(collection)
    }
}

/// Classify driver errors by what the caller can do about them
pub fn map_error(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Authentication { message, .. } => StoreError::AuthenticationFailed(message.clone()),
        ErrorKind::Command(cmd) if cmd.code == AUTHENTICATION_FAILED => {
            StoreError::AuthenticationFailed(cmd.message.clone())
        }
        ErrorKind::Command(cmd) if cmd.code == UNAUTHORIZED => StoreError::NotAuthorized(cmd.message.clone()),
        ErrorKind::Command(cmd) => StoreError::OperationFailed(cmd.message.clone()),
        ErrorKind::Write(WriteFailure::WriteError(write)) => StoreError::OperationFailed(write.message.clone()),
        ErrorKind::Write(WriteFailure::WriteConcernError(concern)) => {
            StoreError::OperationFailed(concern.message.clone())
        }
        ErrorKind::BulkWrite(_) | ErrorKind::InvalidArgument { .. } => StoreError::OperationFailed(err.to_string()),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StoreError::Unavailable(err.to_string()),
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            StoreError::Conversion(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

/// JSON (with extended-JSON markers such as `$oid`) to a BSON document
pub fn to_bson_document(doc: Document) -> Result<bson::Document, StoreError> {
    match Bson::try_from(Value::Object(doc)) {
        Ok(Bson::Document(d)) => Ok(d),
        Ok(other) => Err(StoreError::Conversion(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(StoreError::Conversion(e.to_string())),
    }
}

/// Like `to_bson_document`, but a string `_id` that parses as an ObjectId is matched as one
pub fn to_filter(doc: Document) -> Result<bson::Document, StoreError> {
    let mut filter = to_bson_document(doc)?;
    let oid = match filter.get("_id") {
        Some(Bson::String(id)) => ObjectId::parse_str(id).ok(),
        _ => None,
    };
    if let Some(oid) = oid {
        filter.insert("_id", oid);
    }
    Ok(filter)
}

/// BSON back to JSON for clients.
///
/// The top-level `_id` becomes a plain string. Every other ObjectId or date
/// is kept as extended JSON (`{"$oid": ..}`, `{"$date": ..}`) so a document
/// sent back through the editor keeps its types.
pub fn from_bson_document(doc: bson::Document) -> Document {
    doc.into_iter()
        .map(|(k, v)| {
            let value = match v {
                Bson::ObjectId(oid) if k == "_id" => Value::String(oid.to_hex()),
                other => bson_to_json(other),
            };
            (k, value)
        })
        .collect()
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Document(d) => Value::Object(d.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect()),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        other => other.into_relaxed_extjson(),
    }
}

fn id_to_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.into_relaxed_extjson().to_string(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        self.client
            .list_database_names(None, None)
            .await
            .map_err(map_error)
    }

    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError> {
        self.client
            .database(db)
            .list_collection_names(None)
            .await
            .map_err(map_error)
    }

    async fn create_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        self.client
            .database(db)
            .create_collection(collection, None)
            .await
            .map_err(map_error)
    }

    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        self.collection(db, collection).drop(None).await.map_err(map_error)
    }

    async fn insert_one(&self, db: &str, collection: &str, doc: Document) -> Result<String, StoreError> {
        let doc = to_bson_document(doc)?;
        let result = self
            .collection(db, collection)
            .insert_one(doc, None)
            .await
            .map_err(map_error)?;
        Ok(id_to_string(result.inserted_id))
    }

    async fn insert_many(&self, db: &str, collection: &str, docs: Vec<Document>) -> Result<u64, StoreError> {
        // The server rejects an empty batch
        if docs.is_empty() {
            return Ok(0);
        }
        let docs = docs
            .into_iter()
            .map(to_bson_document)
            .collect::<Result<Vec<_>, _>>()?;
        let result = self
            .collection(db, collection)
            .insert_many(docs, None)
            .await
            .map_err(map_error)?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn find_one(&self, db: &str, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        let filter = to_filter(filter)?;
        let found = self
            .collection(db, collection)
            .find_one(filter, None)
            .await
            .map_err(map_error)?;
        Ok(found.map(from_bson_document))
    }

    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = to_filter(filter)?;
        let mut find_options = MongoFindOptions::default();
        find_options.skip = Some(options.skip);
        find_options.limit = options.limit.map(|l| l as i64);
        if !options.include_id {
            find_options.projection = Some(doc! { "_id": 0 });
        }

        debug!(db = %db, collection = %collection, skip = options.skip, limit = ?options.limit, "find");

        let cursor = self
            .collection(db, collection)
            .find(filter, find_options)
            .await
            .map_err(map_error)?;
        let docs: Vec<bson::Document> = cursor.try_collect().await.map_err(map_error)?;
        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn count_documents(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let filter = to_filter(filter)?;
        self.collection(db, collection)
            .count_documents(filter, None)
            .await
            .map_err(map_error)
    }

    async fn update_one(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, StoreError> {
        let filter = to_filter(filter)?;
        let set = to_bson_document(set)?;
        let result = self
            .collection(db, collection)
            .update_one(filter, doc! { "$set": set }, None)
            .await
            .map_err(map_error)?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let filter = to_filter(filter)?;
        let result = self
            .collection(db, collection)
            .delete_one(filter, None)
            .await
            .map_err(map_error)?;
        Ok(result.deleted_count)
    }
}
