// Reading uploaded spreadsheets

use mongo_admin::loader::spreadsheet::{allowed_file, infer_cell, Spreadsheet, PREVIEW_ROWS};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

fn csv_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_cell_typing() {
    assert_eq!(infer_cell("42"), json!(42));
    assert_eq!(infer_cell("-7"), json!(-7));
    assert_eq!(infer_cell("2.5"), json!(2.5));
    assert_eq!(infer_cell("True"), json!(true));
    assert_eq!(infer_cell("NaN"), Value::Null);
    assert_eq!(infer_cell("N/A"), Value::Null);
    assert_eq!(infer_cell(""), Value::Null);
    assert_eq!(infer_cell("00123abc"), json!("00123abc"));
}

#[test]
fn test_allowed_extensions() {
    assert!(allowed_file("report.XLSX"));
    assert!(allowed_file("legacy.xls"));
    assert!(!allowed_file("report.xlsx.exe"));
    assert!(!allowed_file("csv"));
}

#[test]
fn test_duplicate_and_blank_headers() {
    let file = csv_file("id,name,name,\n1,a,b,c\n");
    let sheet = Spreadsheet::read(file.path()).unwrap();
    assert_eq!(sheet.headers, vec!["id", "name", "name.1", "Unnamed: 3"]);

    let row = &sheet.rows[0];
    assert_eq!(row["name.1"], json!("b"));
    assert_eq!(row["Unnamed: 3"], json!("c"));
}

#[test]
fn test_preview_and_records() {
    let mut contents = String::from("n\n");
    for n in 0..25 {
        contents.push_str(&format!("{}\n", n));
    }
    let file = csv_file(&contents);
    let sheet = Spreadsheet::read(file.path()).unwrap();

    assert_eq!(sheet.preview().len(), PREVIEW_ROWS);
    let records = sheet.into_records();
    assert_eq!(records.len(), 25);
    assert_eq!(records[24]["n"], json!(24));
}

/// Workbook with a typed "People" sheet followed by a sheet that must be ignored
fn people_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("people.xlsx");
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let joined = ExcelDateTime::from_ymd(2024, 3, 15).unwrap();

    let people = workbook.add_worksheet();
    people.set_name("People").unwrap();
    for (col, header) in ["name", "age", "active", "joined", "name"].into_iter().enumerate() {
        people.write_string(0, col as u16, header).unwrap();
    }
    people.write_string(0, 6, "note").unwrap();

    people.write_string(1, 0, "Ada").unwrap();
    people.write_number(1, 1, 36).unwrap();
    people.write_boolean(1, 2, true).unwrap();
    people.write_datetime_with_format(1, 3, &joined, &date_format).unwrap();
    people.write_string(1, 4, "Lovelace").unwrap();
    people.write_string(1, 5, "unlabelled").unwrap();
    people.write_string(1, 6, "N/A").unwrap();

    people.write_string(2, 0, "Bob").unwrap();
    people.write_number(2, 1, 41.5).unwrap();
    people.write_boolean(2, 2, false).unwrap();

    // Row 3 stays blank and is skipped
    people.write_string(4, 0, "Cy").unwrap();

    let archive = workbook.add_worksheet();
    archive.set_name("Archive").unwrap();
    archive.write_string(0, 0, "ignored").unwrap();
    archive.write_string(1, 0, "never imported").unwrap();

    workbook.save(&path).unwrap();
    path
}

#[test]
fn test_xlsx_reads_first_sheet_only() {
    let dir = TempDir::new().unwrap();
    let sheet = Spreadsheet::read(&people_workbook(dir.path())).unwrap();

    assert_eq!(
        sheet.headers,
        vec!["name", "age", "active", "joined", "name.1", "Unnamed: 5", "note"]
    );
    assert_eq!(sheet.rows.len(), 3);
    assert_eq!(sheet.rows[2]["name"], json!("Cy"));
}

#[test]
fn test_xlsx_cells_are_typed() {
    let dir = TempDir::new().unwrap();
    let sheet = Spreadsheet::read(&people_workbook(dir.path())).unwrap();

    let ada = &sheet.rows[0];
    assert_eq!(ada["age"], json!(36));
    assert_eq!(ada["active"], json!(true));
    assert_eq!(ada["name.1"], json!("Lovelace"));
    assert_eq!(ada["Unnamed: 5"], json!("unlabelled"));
    assert_eq!(ada["note"], Value::Null);

    let bob = &sheet.rows[1];
    assert_eq!(bob["age"], json!(41.5));
    assert_eq!(bob["active"], json!(false));
    assert_eq!(bob["joined"], Value::Null);
    assert_eq!(bob["name.1"], Value::Null);
}

#[test]
fn test_xlsx_dates_become_extended_json_dates() {
    let dir = TempDir::new().unwrap();
    let sheet = Spreadsheet::read(&people_workbook(dir.path())).unwrap();

    assert_eq!(
        sheet.rows[0]["joined"],
        json!({ "$date": "2024-03-15T00:00:00.000Z" })
    );
}
