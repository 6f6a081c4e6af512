//! Direct text analysis.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AnalysisData, AnalyzeRequest, ApiContext, ApiResponse};
use crate::pipeline::extraction::ExtractedContent;

/// `POST /api/analyze`: run the full pipeline on caller-supplied content.
///
/// The pipeline makes blocking HTTP calls, so it runs on the blocking pool.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalysisData>>, ApiError> {
    tracing::info!(
        text_len = req.text.chars().count(),
        tables = req.tables.len(),
        "Analyzing direct input"
    );

    let content = ExtractedContent::from_direct_input(req.text, req.tables);
    let analyzer = ctx.analyzer.clone();
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&content)).await??;

    Ok(Json(ApiResponse::ok(
        "Text analyzed successfully",
        AnalysisData::from(outcome),
    )))
}
