//! Default test categories used when an analysis supplies none.
//!
//! Built once at start-up and handed to the formatter; never mutated.

use crate::models::TestCategory;

/// Immutable, non-empty table of test categories.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    categories: Vec<TestCategory>,
}

impl CategoryTable {
    /// The four standard panels: blood, lipid, liver, kidney.
    pub fn standard() -> Self {
        Self {
            categories: vec![
                category(
                    "blood",
                    "Complete Blood Count",
                    "Blood cell counts and basic blood chemistry",
                    "hsl(var(--chart-primary))",
                    &["hemoglobin", "hematocrit", "wbc", "platelets"],
                ),
                category(
                    "lipid",
                    "Lipid Panel",
                    "Cholesterol and triglyceride levels",
                    "hsl(var(--chart-secondary))",
                    &["totalCholesterol", "hdl", "ldl", "triglycerides"],
                ),
                category(
                    "liver",
                    "Liver Function",
                    "Liver enzyme and protein levels",
                    "hsl(var(--chart-tertiary))",
                    &["alt", "ast", "bilirubin", "albumin"],
                ),
                category(
                    "kidney",
                    "Kidney Function",
                    "Kidney function markers",
                    "hsl(var(--chart-quaternary))",
                    &["creatinine", "bun", "gfr"],
                ),
            ],
        }
    }

    /// A custom table. `None` when `categories` is empty.
    pub fn custom(categories: Vec<TestCategory>) -> Option<Self> {
        (!categories.is_empty()).then_some(Self { categories })
    }

    pub fn categories(&self) -> &[TestCategory] {
        &self.categories
    }

    pub fn to_vec(&self) -> Vec<TestCategory> {
        self.categories.clone()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn category(id: &str, name: &str, description: &str, color: &str, tests: &[&str]) -> TestCategory {
    TestCategory {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        color: color.into(),
        tests: tests.iter().map(|t| t.to_string()).collect(),
    }
}
