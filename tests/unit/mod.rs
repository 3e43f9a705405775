#[path = "../common/mod.rs"]
mod common;

pub mod api;
pub mod core;
pub mod loader;
