// In-process document store

use async_trait::async_trait;
use bson::oid::ObjectId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::api::{DocumentStore, FindOptions};
use crate::core::errors::StoreError;
use crate::core::models::Document;

type Collections = BTreeMap<String, Vec<Document>>;

/// Document store held entirely in memory
///
/// Mirrors the server behaviours the admin layer relies on: a database exists
/// only while it has a collection, every document gets a string `_id`, and
/// updates count as modified only when a value actually changes. Used for
/// `STORE_BACKEND=memory` and in tests.
#[derive(Default)]
pub struct MemoryStore {
    databases: RwLock<BTreeMap<String, Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| doc.get(key) == Some(expected))
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Assign an `_id` if missing and reject duplicates within `existing`
fn prepare_insert(existing: &[Document], mut doc: Document) -> Result<(String, Document), StoreError> {
    let id = doc
        .entry("_id".to_string())
        .or_insert_with(|| Value::String(ObjectId::new().to_hex()))
        .clone();

    if existing.iter().any(|d| d.get("_id") == Some(&id)) {
        return Err(StoreError::OperationFailed(format!(
            "E11000 duplicate key error dup key: {{ _id: {} }}",
            id
        )));
    }
    Ok((id_string(&id), doc))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.databases.read().keys().cloned().collect())
    }

    async fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .databases
            .read()
            .get(db)
            .map(|cols| cols.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        let mut dbs = self.databases.write();
        let cols = dbs.entry(db.to_string()).or_default();
        if cols.contains_key(collection) {
            return Err(StoreError::OperationFailed(format!(
                "Collection {}.{} already exists.",
                db, collection
            )));
        }
        cols.insert(collection.to_string(), Vec::new());
        Ok(())
    }

    async fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        let mut dbs = self.databases.write();
        if let Some(cols) = dbs.get_mut(db) {
            cols.remove(collection);
            if cols.is_empty() {
                dbs.remove(db);
            }
        }
        Ok(())
    }

    async fn insert_one(&self, db: &str, collection: &str, doc: Document) -> Result<String, StoreError> {
        let mut dbs = self.databases.write();
        let docs = dbs
            .entry(db.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        let (id, doc) = prepare_insert(docs, doc)?;
        docs.push(doc);
        Ok(id)
    }

    async fn insert_many(&self, db: &str, collection: &str, batch: Vec<Document>) -> Result<u64, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut dbs = self.databases.write();
        let docs = dbs
            .entry(db.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        let mut inserted = 0;
        for doc in batch {
            let (_, doc) = prepare_insert(docs, doc)?;
            docs.push(doc);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find_one(&self, db: &str, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        let dbs = self.databases.read();
        Ok(dbs
            .get(db)
            .and_then(|cols| cols.get(collection))
            .and_then(|docs| docs.iter().find(|d| matches(d, &filter)).cloned()))
    }

    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let dbs = self.databases.read();
        let Some(docs) = dbs.get(db).and_then(|cols| cols.get(collection)) else {
            return Ok(Vec::new());
        };

        let limit = options.limit.unwrap_or(u64::MAX) as usize;
        Ok(docs
            .iter()
            .filter(|d| matches(d, &filter))
            .skip(options.skip as usize)
            .take(limit)
            .map(|d| {
                if options.include_id {
                    d.clone()
                } else {
                    d.iter()
                        .filter(|(k, _)| k.as_str() != "_id")
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                }
            })
            .collect())
    }

    async fn count_documents(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let dbs = self.databases.read();
        Ok(dbs
            .get(db)
            .and_then(|cols| cols.get(collection))
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn update_one(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, StoreError> {
        let mut dbs = self.databases.write();
        let Some(doc) = dbs
            .get_mut(db)
            .and_then(|cols| cols.get_mut(collection))
            .and_then(|docs| docs.iter_mut().find(|d| matches(d, &filter)))
        else {
            return Ok(0);
        };

        if let Some(new_id) = set.get("_id") {
            if doc.get("_id") != Some(new_id) {
                return Err(StoreError::OperationFailed(
                    "Performing an update on the path '_id' would modify the immutable field '_id'"
                        .to_string(),
                ));
            }
        }

        let mut changed = false;
        for (key, value) in set {
            if doc.get(&key) != Some(&value) {
                doc.insert(key, value);
                changed = true;
            }
        }
        Ok(u64::from(changed))
    }

    async fn delete_one(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let mut dbs = self.databases.write();
        let Some(docs) = dbs.get_mut(db).and_then(|cols| cols.get_mut(collection)) else {
            return Ok(0);
        };
        match docs.iter().position(|d| matches(d, &filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
