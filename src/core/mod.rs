pub mod errors;
pub mod models;
pub mod namespace;
pub mod pagination;
pub mod validation;
