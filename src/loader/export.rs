// CSV export of collection documents

use serde_json::Value;

use crate::core::errors::AdminError;
use crate::core::models::Document;

/// Header is the union of top-level keys in first-seen order.
///
/// Strings are written as-is, `{"$oid"}` / `{"$date"}` markers as their
/// inner text, other nested values as compact JSON, null or missing fields
/// as empty cells.
pub fn documents_to_csv(docs: &[Document]) -> Result<Vec<u8>, AdminError> {
    let mut columns: Vec<&str> = Vec::new();
    for doc in docs {
        for key in doc.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    if !columns.is_empty() {
        writer.write_record(&columns).map_err(csv_error)?;
    }
    for doc in docs {
        let row: Vec<String> = columns
            .iter()
            .map(|column| cell_text(doc.get(*column)))
            .collect();
        writer.write_record(&row).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AdminError::Io(e.into_error()))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(map)) if map.len() == 1 => match map.iter().next() {
            Some((key, Value::String(inner))) if key == "$oid" || key == "$date" => inner.clone(),
            _ => Value::Object(map.clone()).to_string(),
        },
        Some(nested) => nested.to_string(),
    }
}

fn csv_error(e: csv::Error) -> AdminError {
    AdminError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// `Content-Disposition` filename for an export
pub fn export_filename(db_name: &str, collection_name: &str) -> String {
    format!("{}_{}.csv", db_name, collection_name)
}
