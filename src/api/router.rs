//! HTTP router.
//!
//! Public routes only: `/`, `/health`, and the `/api/` group. CORS origins
//! come from `AppConfig::cors_origins`; a single `*` allows any origin.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::AppConfig;
use crate::pipeline::structuring::LabReportAnalyzer;

/// Build the API router around a shared analyzer.
pub fn api_router(analyzer: Arc<LabReportAnalyzer>, config: AppConfig) -> Router {
    build_router(ApiContext::new(analyzer, config))
}

fn build_router(ctx: ApiContext) -> Router {
    let cors = cors_layer(&ctx.config.cors_origins);

    let api = Router::new()
        .route("/status", get(endpoints::status::status))
        .route("/models", get(endpoints::status::models))
        .route("/analyze", post(endpoints::analyze::analyze));

    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .nest("/api", api)
        .with_state(ctx)
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
