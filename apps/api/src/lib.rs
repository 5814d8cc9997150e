//! Content management and full-text search service, plus a typed client for
//! its REST API.

pub mod client;
pub mod config;
pub mod content;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod search;
pub mod state;

pub use client::{ClientError, ContentClient};
pub use routes::build_router;
pub use state::AppState;
