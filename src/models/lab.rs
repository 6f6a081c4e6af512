use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{Gender, LabCategory, LabStatus, TrendStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    pub id: String,
    pub name: String,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub last_test_date: NaiveDate,
}

/// Clinically expected interval for a lab value. Always `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ReferenceRange {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    pub id: String,
    pub test_name: String,
    pub value: f64,
    pub unit: String,
    pub reference_range: ReferenceRange,
    pub status: LabStatus,
    pub date: NaiveDate,
    pub category: LabCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub tests: Vec<String>,
}

/// One synthetic month of history for a lab test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Calendar month, `YYYY-MM`.
    pub date: String,
    pub value: f64,
    pub test_name: String,
    pub status: TrendStatus,
}

/// The schema-complete record handed to the formatting consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub patient_info: PatientInfo,
    pub latest_results: Vec<LabResult>,
    pub test_categories: Vec<TestCategory>,
    /// Keyed by test name, lower-cased with spaces removed.
    pub trend_data: BTreeMap<String, Vec<TrendPoint>>,
}
