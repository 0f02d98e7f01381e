//! HTTP reception endpoint for chunked artifact deployment.
//!
//! This crate hosts the reception pipeline:
//! - Request authentication and metadata parsing
//! - Chunk staging
//! - Background assembly (completion detection, merge, verification,
//!   publish, post-publish command)
//! - Request-driven expiration sweeping

pub mod assembly;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
