// Store-level operations shared by the JSON API and the HTML pages

pub mod catalog;
pub mod importer;
pub mod overview;
