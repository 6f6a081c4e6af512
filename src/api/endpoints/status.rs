//! Generation service status and model endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{availability_label, ApiContext, ApiResponse};

#[derive(Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: ServiceStatus,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub ollama: &'static str,
    pub ollama_model: String,
    pub ollama_url: String,
}

/// `GET /api/status`
pub async fn status(State(ctx): State<ApiContext>) -> Result<Json<StatusResponse>, ApiError> {
    let available = ctx.ollama_available().await?;

    Ok(Json(StatusResponse {
        success: true,
        status: ServiceStatus {
            ollama: availability_label(available),
            ollama_model: ctx.analyzer.model_name().to_string(),
            ollama_url: ctx.config.ollama_base_url.clone(),
        },
    }))
}

#[derive(Serialize)]
pub struct ModelsData {
    pub current_model: String,
    pub available_models: Vec<String>,
}

/// `GET /api/models`: 503 while the generation service is down.
pub async fn models(
    State(ctx): State<ApiContext>,
) -> Result<Json<ApiResponse<ModelsData>>, ApiError> {
    if !ctx.ollama_available().await? {
        return Err(ApiError::ServiceUnavailable(
            "Ollama server is not available".into(),
        ));
    }

    let model = ctx.analyzer.model_name().to_string();
    Ok(Json(ApiResponse::ok(
        "Models retrieved",
        ModelsData {
            current_model: model.clone(),
            available_models: vec![model],
        },
    )))
}
