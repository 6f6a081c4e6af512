use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::Rng;

use super::categories::CategoryTable;
use super::trend::{synthesize_trend, trend_key};
use super::FormatError;
use crate::models::{CanonicalRecord, LabResult, PatientInfo, TestCategory, TrendPoint};
use crate::pipeline::structuring::{RawTestCategory, ValidatedAnalysis, ValidatedLabResult, ValidatedPatient};

const DEFAULT_PATIENT_NAME: &str = "Unknown Patient";
const DEFAULT_CATEGORY_COLOR: &str = "hsl(var(--chart-primary))";

/// Canonicalizes validated analyses into schema-complete records.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    categories: CategoryTable,
}

impl RecordFormatter {
    pub fn new(categories: CategoryTable) -> Self {
        Self { categories }
    }

    /// Build the canonical record. Any formatting failure yields the
    /// empty-but-valid record instead of an error.
    pub fn format<R: Rng + ?Sized>(
        &self,
        analysis: &ValidatedAnalysis,
        today: NaiveDate,
        rng: &mut R,
    ) -> CanonicalRecord {
        match self.try_format(analysis, today, rng) {
            Ok(record) => {
                tracing::debug!(
                    results = record.latest_results.len(),
                    trends = record.trend_data.len(),
                    "Record formatted"
                );
                record
            }
            Err(e) => {
                tracing::warn!(error = %e, "Record formatting failed, returning empty record");
                self.empty_record(today)
            }
        }
    }

    fn try_format<R: Rng + ?Sized>(
        &self,
        analysis: &ValidatedAnalysis,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<CanonicalRecord, FormatError> {
        let default_patient = ValidatedPatient::default();
        let patient = analysis.patient.as_ref().unwrap_or(&default_patient);

        let mut trend_data: BTreeMap<String, Vec<TrendPoint>> = BTreeMap::new();
        for result in &analysis.results {
            let series = synthesize_trend(&result.test_name, result.value, today, rng)?;
            trend_data.insert(trend_key(&result.test_name), series);
        }

        Ok(CanonicalRecord {
            patient_info: format_patient_info(patient, today, rng),
            latest_results: analysis
                .results
                .iter()
                .map(|r| format_lab_result(r, today, rng))
                .collect(),
            test_categories: self.format_test_categories(&analysis.categories),
            trend_data,
        })
    }

    /// Upstream categories with defaults filled in; the default table when
    /// none are supplied.
    fn format_test_categories(&self, categories: &[RawTestCategory]) -> Vec<TestCategory> {
        if categories.is_empty() {
            return self.categories.to_vec();
        }
        categories.iter().map(format_test_category).collect()
    }

    /// Complete record carrying no patient data.
    pub fn empty_record(&self, today: NaiveDate) -> CanonicalRecord {
        CanonicalRecord {
            patient_info: PatientInfo {
                id: "empty".into(),
                name: "No Data".into(),
                age: None,
                gender: None,
                date_of_birth: None,
                last_test_date: today,
            },
            latest_results: vec![],
            test_categories: self.categories.to_vec(),
            trend_data: BTreeMap::new(),
        }
    }
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self::new(CategoryTable::standard())
    }
}

fn format_patient_info<R: Rng + ?Sized>(
    patient: &ValidatedPatient,
    today: NaiveDate,
    rng: &mut R,
) -> PatientInfo {
    PatientInfo {
        id: patient.id.clone().unwrap_or_else(|| short_id("p", rng)),
        name: patient
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_PATIENT_NAME.into()),
        age: patient.age,
        gender: patient.gender,
        date_of_birth: patient.date_of_birth,
        last_test_date: patient.last_test_date.unwrap_or(today),
    }
}

fn format_lab_result<R: Rng + ?Sized>(
    result: &ValidatedLabResult,
    today: NaiveDate,
    rng: &mut R,
) -> LabResult {
    LabResult {
        id: result.id.clone().unwrap_or_else(|| short_id("r", rng)),
        test_name: result.test_name.clone(),
        value: result.value,
        unit: result.unit.clone(),
        reference_range: result.reference_range,
        status: result.status,
        date: result.date.unwrap_or(today),
        category: result.category,
    }
}

fn format_test_category(raw: &RawTestCategory) -> TestCategory {
    let text = |field: &Option<String>, default: &str| {
        field
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let mut tests: Vec<String> = Vec::with_capacity(raw.tests.len());
    for test in &raw.tests {
        if !tests.contains(test) {
            tests.push(test.clone());
        }
    }

    TestCategory {
        id: text(&raw.id, "unknown"),
        name: text(&raw.name, "Unknown Category"),
        description: text(&raw.description, ""),
        color: text(&raw.color, DEFAULT_CATEGORY_COLOR),
        tests,
    }
}

/// `{prefix}_` followed by 8 hex chars drawn from `rng`.
fn short_id<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.gen();
    let id = uuid::Builder::from_random_bytes(bytes).into_uuid().simple().to_string();
    format!("{prefix}_{}", &id[..8])
}
