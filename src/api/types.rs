//! Shared state and wire types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::config::AppConfig;
use crate::models::CanonicalRecord;
use crate::pipeline::extraction::Table;
use crate::pipeline::structuring::{AnalysisOutcome, AnalysisSource, LabReportAnalyzer};

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub analyzer: Arc<LabReportAnalyzer>,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(analyzer: Arc<LabReportAnalyzer>, config: AppConfig) -> Self {
        Self {
            analyzer,
            config: Arc::new(config),
        }
    }

    /// Probe the generation service off the async executor.
    pub async fn ollama_available(&self) -> Result<bool, ApiError> {
        let analyzer = self.analyzer.clone();
        Ok(tokio::task::spawn_blocking(move || analyzer.llm_available()).await?)
    }
}

pub fn availability_label(available: bool) -> &'static str {
    if available {
        "available"
    } else {
        "unavailable"
    }
}

// ═══════════════════════════════════════════════════════════
// Request / response bodies
// ═══════════════════════════════════════════════════════════

/// Success envelope shared by the `/api` endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
        }
    }
}

/// `POST /api/analyze` body.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Canonical record plus how it was produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub processing_metadata: ProcessingMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    pub source: AnalysisSource,
    pub ollama_available: bool,
    pub warnings: Vec<String>,
    pub processing_timestamp: String,
}

impl From<AnalysisOutcome> for AnalysisData {
    fn from(outcome: AnalysisOutcome) -> Self {
        Self {
            record: outcome.record,
            processing_metadata: ProcessingMetadata {
                source: outcome.source,
                ollama_available: outcome.llm_available,
                warnings: outcome.warnings,
                processing_timestamp: chrono::Local::now().to_rfc3339(),
            },
        }
    }
}
