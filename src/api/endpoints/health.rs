//! Service banner and health check.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{availability_label, ApiContext};

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub health: &'static str,
}

/// `GET /`: service banner.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Labtrend lab report analysis API",
        version: crate::config::APP_VERSION,
        health: "/health",
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: BTreeMap<&'static str, &'static str>,
    pub timestamp: String,
}

/// `GET /health`: liveness plus generation service availability.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let available = ctx.ollama_available().await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        services: BTreeMap::from([("ollama", availability_label(available))]),
        timestamp: chrono::Local::now().to_rfc3339(),
    }))
}
