// File handling for spreadsheet import and CSV export

pub mod export;
pub mod spreadsheet;
pub mod upload;
