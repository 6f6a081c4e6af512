// Field-level validation for LLM-extracted lab analyses.
// Applied between parse_analysis_response() and record formatting.
// Bad values are clamped to null or reset to a default; rows without a usable
// test name or numeric value are dropped. Only a malformed dateOfBirth rejects
// the patient sub-document as a whole.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use super::types::{RawAnalysis, RawLabResult, RawPatientInfo, RawTestCategory};
use super::AnalysisError;
use crate::models::{Gender, LabCategory, LabStatus, ReferenceRange};

/// Oldest plausible patient age.
const MAX_AGE: i64 = 150;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("ISO date pattern is valid"));

/// Patient fields that survived validation. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedPatient {
    pub id: Option<String>,
    pub name: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub last_test_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLabResult {
    pub id: Option<String>,
    pub test_name: String,
    pub value: f64,
    pub unit: String,
    pub reference_range: ReferenceRange,
    pub status: LabStatus,
    pub date: Option<NaiveDate>,
    pub category: LabCategory,
}

/// Result of validating a raw analysis.
#[derive(Debug)]
pub struct ValidatedAnalysis {
    /// `Err` when the patient sub-document was rejected as a whole.
    pub patient: Result<ValidatedPatient, AnalysisError>,
    pub results: Vec<ValidatedLabResult>,
    pub categories: Vec<RawTestCategory>,
    pub warnings: Vec<String>,
}

/// Validate every field of a raw analysis. Never aborts the batch.
pub fn validate_analysis(raw: RawAnalysis) -> ValidatedAnalysis {
    let mut warnings = Vec::new();

    let patient = validate_patient_info(&raw.patient_info, &mut warnings);
    if let Err(e) = &patient {
        warnings.push(format!("Patient info rejected: {e}"));
    }

    let results = validate_lab_results(raw.latest_results, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            warning_count = warnings.len(),
            kept_results = results.len(),
            "Field validation warnings detected"
        );
    }

    ValidatedAnalysis {
        patient,
        results,
        categories: raw.test_categories,
        warnings,
    }
}

/// Validate patient fields. Soft failures null the field and add a warning;
/// a malformed `dateOfBirth` rejects the whole sub-document.
pub fn validate_patient_info(
    raw: &RawPatientInfo,
    warnings: &mut Vec<String>,
) -> Result<ValidatedPatient, AnalysisError> {
    let date_of_birth = validate_date_of_birth(raw.date_of_birth.as_ref())?;

    let age = match raw.age.as_ref() {
        None => None,
        Some(value) => match validate_age(value) {
            Ok(age) => Some(age),
            Err(e) => {
                warnings.push(e.to_string());
                None
            }
        },
    };

    let gender = match raw.gender.as_ref() {
        None => None,
        Some(value) => match normalize_gender(value) {
            Ok(gender) => gender,
            Err(e) => {
                warnings.push(e.to_string());
                None
            }
        },
    };

    Ok(ValidatedPatient {
        id: non_empty(raw.id.as_deref()),
        name: non_empty(raw.name.as_deref()),
        age,
        gender,
        date_of_birth,
        last_test_date: soft_date("lastTestDate", raw.last_test_date.as_deref(), warnings),
    })
}

/// Coerce an age to an integer within [0, 150].
pub fn validate_age(value: &Value) -> Result<u8, AnalysisError> {
    let invalid = |reason: String| AnalysisError::InvalidField {
        field: "age",
        reason,
    };

    let age = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(format!("'{value}' is not a number")))?;

    if !(0..=MAX_AGE).contains(&age) {
        return Err(invalid(format!("{age} is outside 0-{MAX_AGE}")));
    }
    // 0..=150 always fits
    u8::try_from(age).map_err(|_| invalid(format!("{age} is outside 0-{MAX_AGE}")))
}

/// Lower-case and map `male`/`female`/`m`/`f`; empty means unknown.
pub fn normalize_gender(value: &Value) -> Result<Option<Gender>, AnalysisError> {
    let Value::String(s) = value else {
        return Err(AnalysisError::InvalidField {
            field: "gender",
            reason: format!("'{value}' is not text"),
        });
    };
    match s.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "male" | "m" => Ok(Some(Gender::Male)),
        "female" | "f" => Ok(Some(Gender::Female)),
        other => Err(AnalysisError::InvalidField {
            field: "gender",
            reason: format!("'{other}' is not one of male, female, m, f"),
        }),
    }
}

/// `dateOfBirth` must be absent, empty, or a real `YYYY-MM-DD` date.
pub fn validate_date_of_birth(value: Option<&Value>) -> Result<Option<NaiveDate>, AnalysisError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            parse_iso_date(s).map(Some).ok_or_else(|| AnalysisError::InvalidDateOfBirth(s.clone()))
        }
        Some(other) => Err(AnalysisError::InvalidDateOfBirth(other.to_string())),
    }
}

/// Validate lab rows, dropping those without a test name or numeric value.
pub fn validate_lab_results(
    raw: Vec<RawLabResult>,
    warnings: &mut Vec<String>,
) -> Vec<ValidatedLabResult> {
    raw.into_iter()
        .filter_map(|row| validate_lab_result(row, warnings))
        .collect()
}

fn validate_lab_result(
    raw: RawLabResult,
    warnings: &mut Vec<String>,
) -> Option<ValidatedLabResult> {
    let Some(test_name) = non_empty(raw.test_name.as_deref()) else {
        warnings.push(
            AnalysisError::InvalidField {
                field: "testName",
                reason: "empty test name, result dropped".into(),
            }
            .to_string(),
        );
        return None;
    };

    let Some(value) = raw.value.as_ref().and_then(coerce_number) else {
        warnings.push(
            AnalysisError::InvalidField {
                field: "value",
                reason: format!("'{test_name}' has no numeric value, result dropped"),
            }
            .to_string(),
        );
        return None;
    };

    let reference_range = match raw.reference_range.as_ref() {
        None | Some(Value::Null) => ReferenceRange::default(),
        Some(range) => parse_reference_range(range).unwrap_or_else(|| {
            warnings.push(
                AnalysisError::InvalidField {
                    field: "referenceRange",
                    reason: format!("'{test_name}' range unreadable, using default"),
                }
                .to_string(),
            );
            ReferenceRange::default()
        }),
    };

    let status = enum_or_default::<LabStatus>("status", raw.status.as_deref(), warnings);
    let category = enum_or_default::<LabCategory>("category", raw.category.as_deref(), warnings);

    Some(ValidatedLabResult {
        id: non_empty(raw.id.as_deref()),
        unit: raw.unit.as_deref().map(str::trim).unwrap_or_default().to_string(),
        date: soft_date("date", raw.date.as_deref(), warnings),
        test_name,
        value,
        reference_range,
        status,
        category,
    })
}

/// `{min, max}` with numeric bounds; swapped when reversed.
fn parse_reference_range(value: &Value) -> Option<ReferenceRange> {
    let min = value.get("min").and_then(coerce_number)?;
    let max = value.get("max").and_then(coerce_number)?;
    Some(if min <= max {
        ReferenceRange { min, max }
    } else {
        ReferenceRange { min: max, max: min }
    })
}

/// JSON numbers and numeric strings; non-finite values are rejected.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// Case-insensitive enum parse; unknown values reset to the default.
fn enum_or_default<T>(field: &'static str, raw: Option<&str>, warnings: &mut Vec<String>) -> T
where
    T: FromStr + Default,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return T::default();
    };
    T::from_str(&raw.to_lowercase()).unwrap_or_else(|_| {
        warnings.push(
            AnalysisError::InvalidField {
                field,
                reason: format!("'{raw}' not recognised, using default"),
            }
            .to_string(),
        );
        T::default()
    })
}

/// Optional date field: unparsable values fall back to the default.
fn soft_date(field: &'static str, raw: Option<&str>, warnings: &mut Vec<String>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_iso_date(raw);
    if parsed.is_none() {
        warnings.push(
            AnalysisError::InvalidField {
                field,
                reason: format!("'{raw}' is not YYYY-MM-DD, using default"),
            }
            .to_string(),
        );
    }
    parsed
}

/// Strict `YYYY-MM-DD` that is also a real calendar date.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !ISO_DATE.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
