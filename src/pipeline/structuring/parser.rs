use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{AnalysisSource, RawAnalysis, RawPatientInfo, RawTestCategory};
use super::AnalysisError;

/// Top-level keys a usable LLM response must carry.
pub const REQUIRED_KEYS: [&str; 3] = ["patientInfo", "latestResults", "testCategories"];

/// Date stamped on placeholder records.
const PLACEHOLDER_TEST_DATE: &str = "2024-01-15";

static REASONING_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("reasoning block pattern is valid")
});

/// Outcome of parsing one LLM response. Always carries a three-key analysis.
#[derive(Debug)]
pub struct ParsedResponse {
    pub analysis: RawAnalysis,
    pub source: AnalysisSource,
    /// Why the structured path was abandoned, when it was.
    pub failure: Option<AnalysisError>,
}

/// Parse an LLM response, degrading to the heuristic placeholder when the
/// response holds no usable JSON object. Never fails.
pub fn parse_analysis_response(response: &str) -> ParsedResponse {
    match extract_analysis(response) {
        Ok(analysis) => ParsedResponse {
            analysis,
            source: AnalysisSource::Llm,
            failure: None,
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                kind = ?e.kind(),
                response_len = response.len(),
                "LLM response unusable, using heuristic placeholder"
            );
            ParsedResponse {
                analysis: heuristic_placeholder(),
                source: AnalysisSource::Heuristic,
                failure: Some(e),
            }
        }
    }
}

/// Locate, parse, and shape-check the JSON object in an LLM response.
pub fn extract_analysis(response: &str) -> Result<RawAnalysis, AnalysisError> {
    let cleaned = strip_reasoning_blocks(response);
    let json_str = find_json_object(&cleaned)
        .ok_or_else(|| AnalysisError::MalformedResponse("No JSON object found".into()))?;

    let value: Value =
        serde_json::from_str(json_str).map_err(|e| AnalysisError::JsonParsing(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(AnalysisError::MalformedResponse("JSON is not an object".into()));
    };

    let missing: Vec<&'static str> = REQUIRED_KEYS
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingKeys(missing));
    }

    let patient_info = match take(&mut object, "patientInfo") {
        Value::Null => RawPatientInfo::default(),
        v @ Value::Object(_) => serde_json::from_value(v).map_err(|_| {
            AnalysisError::UnexpectedShape {
                key: "patientInfo",
                expected: "an object",
            }
        })?,
        _ => {
            return Err(AnalysisError::UnexpectedShape {
                key: "patientInfo",
                expected: "an object",
            })
        }
    };

    Ok(RawAnalysis {
        patient_info,
        latest_results: parse_array_lenient(take(&mut object, "latestResults"), "latestResults")?,
        test_categories: parse_array_lenient(
            take(&mut object, "testCategories"),
            "testCategories",
        )?,
    })
}

fn take(object: &mut Map<String, Value>, key: &str) -> Value {
    object.remove(key).unwrap_or(Value::Null)
}

/// Parse an array leniently and skip items that fail to deserialize.
/// `null` reads as an empty list; any other non-array is a shape error.
fn parse_array_lenient<T: for<'de> Deserialize<'de>>(
    value: Value,
    key: &'static str,
) -> Result<Vec<T>, AnalysisError> {
    match value {
        Value::Null => Ok(vec![]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()),
        _ => Err(AnalysisError::UnexpectedShape {
            key,
            expected: "a list",
        }),
    }
}

/// Remove complete `<think>…</think>` reasoning blocks.
pub fn strip_reasoning_blocks(response: &str) -> Cow<'_, str> {
    REASONING_BLOCK.replace_all(response, "")
}

/// Return the first balanced top-level `{…}` span.
///
/// Braces inside JSON string literals (with backslash escapes) do not count.
/// An opening brace that is never closed yields `None`.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Placeholder for a response that arrived but could not be used.
pub fn heuristic_placeholder() -> RawAnalysis {
    RawAnalysis {
        patient_info: RawPatientInfo {
            id: Some("extracted_patient".into()),
            name: Some("Patient Name".into()),
            last_test_date: Some(PLACEHOLDER_TEST_DATE.into()),
            ..RawPatientInfo::default()
        },
        latest_results: vec![],
        test_categories: vec![RawTestCategory {
            id: Some("blood".into()),
            name: Some("Complete Blood Count".into()),
            description: Some("Blood cell counts and basic blood chemistry".into()),
            color: Some("hsl(var(--chart-primary))".into()),
            tests: vec![],
        }],
    }
}

/// Content-independent record used when the LLM is unavailable.
pub fn static_fallback() -> RawAnalysis {
    RawAnalysis {
        patient_info: RawPatientInfo {
            id: Some("fallback_patient".into()),
            name: Some("Unknown Patient".into()),
            last_test_date: Some(PLACEHOLDER_TEST_DATE.into()),
            ..RawPatientInfo::default()
        },
        latest_results: vec![],
        test_categories: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> String {
        r#"Here is the extracted data:

```json
{
  "patientInfo": {
    "id": "MRN-2231",
    "name": "John Doe",
    "age": 45,
    "gender": "male",
    "dateOfBirth": "1979-03-15",
    "lastTestDate": "2024-01-20"
  },
  "latestResults": [
    {
      "id": "result_1",
      "testName": "Hemoglobin",
      "value": 14.2,
      "unit": "g/dL",
      "referenceRange": {"min": 13.5, "max": 17.5},
      "status": "normal",
      "date": "2024-01-20",
      "category": "blood"
    },
    {
      "testName": "LDL Cholesterol",
      "value": 162,
      "unit": "mg/dL",
      "referenceRange": {"min": 0, "max": 130},
      "status": "high",
      "date": "2024-01-20",
      "category": "lipid"
    }
  ],
  "testCategories": [
    {
      "id": "blood",
      "name": "Complete Blood Count",
      "description": "Blood cell counts",
      "color": "hsl(var(--chart-primary))",
      "tests": ["hemoglobin"]
    }
  ]
}
```

Let me know if you need anything else. {"note": "trailing"}"#
            .to_string()
    }

    #[test]
    fn parse_full_response_takes_structured_path() {
        let parsed = parse_analysis_response(&sample_response());
        assert_eq!(parsed.source, AnalysisSource::Llm);
        assert!(parsed.failure.is_none());

        let analysis = parsed.analysis;
        assert_eq!(analysis.patient_info.id.as_deref(), Some("MRN-2231"));
        assert_eq!(analysis.patient_info.age, Some(json!(45)));
        assert_eq!(analysis.latest_results.len(), 2);
        assert_eq!(
            analysis.latest_results[1].test_name.as_deref(),
            Some("LDL Cholesterol")
        );
        assert_eq!(analysis.test_categories.len(), 1);
        assert_eq!(analysis.test_categories[0].tests, vec!["hemoglobin"]);
    }

    #[test]
    fn scanner_stops_at_first_balanced_object() {
        let text = r#"prefix {"a": {"b": 1}} middle {"c": 2} suffix"#;
        assert_eq!(find_json_object(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn scanner_ignores_braces_in_strings() {
        let text = r#"{"note": "range {low} \"quoted}\" end", "x": 1} tail}"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"note": "range {low} \"quoted}\" end", "x": 1}"#)
        );
    }

    #[test]
    fn scanner_rejects_unbalanced_object() {
        assert_eq!(find_json_object(r#"{"patientInfo": {"id": 1}"#), None);
        assert_eq!(find_json_object("no braces at all"), None);
    }

    #[test]
    fn reasoning_blocks_are_stripped() {
        let response = format!(
            "<think>The user wants {{json}}. Let me think about {{braces}}.</think>\n{}",
            json!({"patientInfo": {}, "latestResults": [], "testCategories": []})
        );
        let parsed = parse_analysis_response(&response);
        assert_eq!(parsed.source, AnalysisSource::Llm);
    }

    #[test]
    fn prose_response_uses_heuristic_placeholder() {
        let parsed = parse_analysis_response("The patient's hemoglobin is 14.2 g/dL, within range.");
        assert_eq!(parsed.source, AnalysisSource::Heuristic);
        assert!(matches!(
            parsed.failure,
            Some(AnalysisError::MalformedResponse(_))
        ));
        assert_eq!(
            parsed.analysis.patient_info.id.as_deref(),
            Some("extracted_patient")
        );
        assert!(parsed.analysis.latest_results.is_empty());
        assert_eq!(parsed.analysis.test_categories.len(), 1);
        assert_eq!(parsed.analysis.test_categories[0].id.as_deref(), Some("blood"));
        assert_eq!(
            parsed.analysis.patient_info.last_test_date.as_deref(),
            Some("2024-01-15")
        );
    }

    #[test]
    fn invalid_json_uses_heuristic_placeholder() {
        let parsed = parse_analysis_response("{patientInfo: oops, latestResults: []}");
        assert_eq!(parsed.source, AnalysisSource::Heuristic);
        assert!(matches!(parsed.failure, Some(AnalysisError::JsonParsing(_))));
    }

    #[test]
    fn missing_keys_use_heuristic_placeholder() {
        let response = json!({"patientInfo": {"name": "A"}, "latestResults": []}).to_string();
        let parsed = parse_analysis_response(&response);
        assert_eq!(parsed.source, AnalysisSource::Heuristic);
        match parsed.failure {
            Some(AnalysisError::MissingKeys(keys)) => assert_eq!(keys, vec!["testCategories"]),
            other => panic!("expected MissingKeys, got {other:?}"),
        }
        assert!(parsed.analysis.latest_results.is_empty());
    }

    #[test]
    fn wrong_container_type_is_structural_failure() {
        let response =
            json!({"patientInfo": {}, "latestResults": "none found", "testCategories": []})
                .to_string();
        let err = extract_analysis(&response).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnexpectedShape { key: "latestResults", .. }
        ));
    }

    #[test]
    fn null_sections_read_as_empty() {
        let response =
            json!({"patientInfo": null, "latestResults": null, "testCategories": null}).to_string();
        let analysis = extract_analysis(&response).unwrap();
        assert_eq!(analysis, RawAnalysis::default());
    }

    #[test]
    fn non_object_items_are_skipped() {
        let response = json!({
            "patientInfo": {},
            "latestResults": ["Hemoglobin 14.2", {"testName": "ALT", "value": 30}, 7],
            "testCategories": []
        })
        .to_string();
        let analysis = extract_analysis(&response).unwrap();
        assert_eq!(analysis.latest_results.len(), 1);
        assert_eq!(analysis.latest_results[0].test_name.as_deref(), Some("ALT"));
    }

    #[test]
    fn extra_top_level_keys_are_allowed() {
        let response = json!({
            "patientInfo": {},
            "latestResults": [],
            "testCategories": [],
            "trendData": {"x": []}
        })
        .to_string();
        assert!(extract_analysis(&response).is_ok());
    }

    #[test]
    fn static_fallback_has_no_categories() {
        let fallback = static_fallback();
        assert_eq!(
            fallback.patient_info.id.as_deref(),
            Some("fallback_patient")
        );
        assert_eq!(
            fallback.patient_info.name.as_deref(),
            Some("Unknown Patient")
        );
        assert_eq!(
            fallback.patient_info.last_test_date.as_deref(),
            Some("2024-01-15")
        );
        assert!(fallback.test_categories.is_empty());
        assert!(fallback.latest_results.is_empty());
    }
}
