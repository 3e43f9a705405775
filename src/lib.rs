// Library root for Mongo Admin

pub mod core;
pub mod state;
pub mod engine;
pub mod loader;
pub mod auth;
pub mod api;
pub mod views;
pub mod config;
