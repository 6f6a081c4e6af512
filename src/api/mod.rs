//! HTTP surface over the analysis pipeline.
//!
//! `api_router()` returns a `Router` that can be mounted on any axum server;
//! `serve()` binds it using `AppConfig` and runs until shutdown.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
