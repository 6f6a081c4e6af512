use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::AnalysisError;
use crate::models::CanonicalRecord;

/// Text-generation service abstraction (allows mocking).
pub trait LlmClient {
    /// Availability probe. Any failure means unavailable.
    fn is_available(&self) -> bool;

    /// Single generation round trip, no retry.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AnalysisError>;
}

/// Which degradation tier produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    /// The LLM returned a usable JSON object.
    Llm,
    /// The LLM responded but its output was unusable.
    Heuristic,
    /// The LLM was unavailable or returned nothing.
    Fallback,
}

impl std::fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AnalysisSource::Llm => "llm",
            AnalysisSource::Heuristic => "heuristic",
            AnalysisSource::Fallback => "fallback",
        })
    }
}

/// Complete result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub record: CanonicalRecord,
    pub source: AnalysisSource,
    pub llm_available: bool,
    /// Soft failures encountered on the way (nulled fields, dropped rows,
    /// rejected sub-documents).
    pub warnings: Vec<String>,
}

// ═══════════════════════════════════════════════════════════
// Raw (pre-validation) analysis shape
// ═══════════════════════════════════════════════════════════

/// The three-key object recovered from the LLM response, before field
/// validation. Values that need coercion are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAnalysis {
    pub patient_info: RawPatientInfo,
    pub latest_results: Vec<RawLabResult>,
    pub test_categories: Vec<RawTestCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPatientInfo {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    pub age: Option<Value>,
    pub gender: Option<Value>,
    pub date_of_birth: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub last_test_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLabResult {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub test_name: Option<String>,
    pub value: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub unit: Option<String>,
    pub reference_range: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawTestCategory {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient_text_list")]
    pub tests: Vec<String>,
}

fn value_as_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept strings, numbers, and booleans as text; anything else is absent.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_as_text(Value::deserialize(deserializer)?))
}

fn lenient_text_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(value_as_text).collect(),
        _ => Vec::new(),
    })
}
