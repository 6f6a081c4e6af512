use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Whether the extraction collaborator managed to read the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    #[default]
    Success,
    Error,
}

/// A table recovered from the document, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, deserialize_with = "cells")]
    pub headers: Vec<String>,
    #[serde(default, deserialize_with = "rows")]
    pub rows: Vec<Vec<String>>,
}

/// Raw text/table content of one document, as handed over by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub status: ExtractionStatus,
}

impl ExtractedContent {
    /// Content supplied directly by a caller rather than read from a file.
    pub fn from_direct_input(text: String, tables: Vec<Table>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("text_length".into(), Value::from(text.chars().count()));
        metadata.insert("extraction_method".into(), Value::from("direct_input"));
        Self {
            text,
            tables,
            metadata,
            status: ExtractionStatus::Success,
        }
    }

    /// Content for a document the extractor could not read.
    pub fn failed(reason: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".into(), Value::from(reason));
        Self {
            metadata,
            status: ExtractionStatus::Error,
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ExtractionStatus::Error
    }
}

/// Document-to-content extraction engine (PDF text + tables).
///
/// Implementations never fail: an unreadable document yields content with
/// `status = Error`.
pub trait ContentExtractor {
    fn extract(&self, path: &std::path::Path) -> ExtractedContent;
}

/// Table cells arrive as strings, numbers, or nulls depending on the engine.
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn cells<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.into_iter().map(cell_text).collect())
}

fn rows<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error> {
    let rows = Option::<Vec<Vec<Value>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_cells_accept_mixed_types() {
        let table: Table = serde_json::from_value(serde_json::json!({
            "headers": ["Test", "Result", null],
            "rows": [["Hemoglobin", 14.2, null]]
        }))
        .unwrap();
        assert_eq!(table.headers, vec!["Test", "Result", ""]);
        assert_eq!(table.rows[0], vec!["Hemoglobin", "14.2", ""]);
    }

    #[test]
    fn missing_fields_default() {
        let content: ExtractedContent = serde_json::from_str("{}").unwrap();
        assert!(content.text.is_empty());
        assert!(content.tables.is_empty());
        assert_eq!(content.status, ExtractionStatus::Success);
    }

    #[test]
    fn error_status_parses() {
        let content: ExtractedContent =
            serde_json::from_str(r#"{"text": "", "status": "error"}"#).unwrap();
        assert!(content.is_error());
    }

    #[test]
    fn direct_input_records_metadata() {
        let content = ExtractedContent::from_direct_input("Glucose 5.4".into(), vec![]);
        assert_eq!(content.metadata["text_length"], 11);
        assert_eq!(content.metadata["extraction_method"], "direct_input");
        assert!(!content.is_error());
    }

    #[test]
    fn failed_content_carries_reason() {
        let content = ExtractedContent::failed("encrypted pdf");
        assert!(content.is_error());
        assert_eq!(content.metadata["error"], "encrypted pdf");
    }
}
