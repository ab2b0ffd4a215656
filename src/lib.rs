pub mod api;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod geo;
pub mod models;
pub mod observability;
pub mod prediction;
pub mod state;
pub mod store;
