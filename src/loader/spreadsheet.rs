// Spreadsheet reading for imports (CSV, XLSX, XLS)

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDateTime, SecondsFormat};
use serde_json::{json, Number, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::core::errors::AdminError;
use crate::core::models::Document;

pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];
pub const PREVIEW_ROWS: usize = 10;

/// Cell texts read as missing values
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#NA", "N/A", "NA", "n/a", "NULL", "null", "NaN", "nan", "-NaN", "None",
];

/// Lower-cased extension of `filename`, if it has one
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Csv,
    Excel,
}

impl SpreadsheetKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(SpreadsheetKind::Csv),
            "xlsx" | "xls" => Some(SpreadsheetKind::Excel),
            _ => None,
        }
    }
}

/// A parsed sheet: header row plus one document per data row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spreadsheet {
    pub headers: Vec<String>,
    pub rows: Vec<Document>,
}

impl Spreadsheet {
    /// Parse the file at `path`. Blocking; call from `spawn_blocking`.
    pub fn read(path: &Path) -> Result<Self, AdminError> {
        match SpreadsheetKind::from_path(path) {
            Some(SpreadsheetKind::Csv) => Self::read_csv(path),
            Some(SpreadsheetKind::Excel) => Self::read_excel(path),
            None => Err(AdminError::InvalidUpload(
                "Unsupported file type".to_string(),
            )),
        }
    }

    pub fn read_csv(path: &Path) -> Result<Self, AdminError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| AdminError::InvalidUpload(format!("Could not read CSV file: {}", e)))?;

        let raw_headers: Vec<String> = reader
            .headers()
            .map_err(|e| AdminError::InvalidUpload(format!("Could not read CSV header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let headers = unique_headers(raw_headers);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| AdminError::InvalidUpload(format!("Malformed CSV row: {}", e)))?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let row = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), infer_cell(record.get(i).unwrap_or(""))))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// First worksheet only
    pub fn read_excel(path: &Path) -> Result<Self, AdminError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| AdminError::InvalidUpload(format!("Could not open workbook: {}", e)))?;

        let range = match workbook.worksheet_range_at(0) {
            Some(Ok(range)) => range,
            Some(Err(e)) => {
                return Err(AdminError::InvalidUpload(format!(
                    "Could not read worksheet: {}",
                    e
                )))
            }
            None => return Ok(Self::default()),
        };

        let mut rows_iter = range.rows();
        let Some(header_row) = rows_iter.next() else {
            return Ok(Self::default());
        };
        let headers = unique_headers(header_row.iter().map(header_text).collect());

        let mut rows = Vec::new();
        for cells in rows_iter {
            if cells.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let row = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), excel_cell(cells.get(i))))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn preview(&self) -> &[Document] {
        &self.rows[..self.rows.len().min(PREVIEW_ROWS)]
    }

    pub fn into_records(self) -> Vec<Document> {
        self.rows
    }
}

/// Blank headers become `Unnamed: <i>`; repeats get `.1`, `.2`, ... suffixes.
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (i, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        seen.insert(name.clone(), 0);
        headers.push(name);
    }
    headers
}

/// Type a text cell: missing, integer, float, boolean, else the text itself
pub fn infer_cell(raw: &str) -> Value {
    let text = raw.trim();
    if NA_VALUES.contains(&text) {
        return Value::Null;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        return float_value(f);
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Dates become extended-JSON `{"$date": ...}` so they are stored as BSON dates
fn date_value(datetime: NaiveDateTime) -> Value {
    json!({ "$date": datetime.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true) })
}

fn excel_cell(cell: Option<&Data>) -> Value {
    match cell {
        None | Some(Data::Empty) | Some(Data::Error(_)) => Value::Null,
        Some(Data::Int(i)) => Value::Number((*i).into()),
        Some(Data::Float(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::Number((*f as i64).into())
        }
        Some(Data::Float(f)) => float_value(*f),
        Some(Data::Bool(b)) => Value::Bool(*b),
        Some(Data::String(s)) => infer_cell(s),
        Some(cell @ (Data::DateTime(_) | Data::DateTimeIso(_))) => match cell.as_datetime() {
            Some(datetime) => date_value(datetime),
            None => Value::String(cell.to_string()),
        },
        Some(other) => Value::String(other.to_string()),
    }
}
