use crate::pipeline::extraction::{ExtractedContent, Table};

/// Characters of document text embedded in the prompt.
pub const PROMPT_TEXT_LIMIT: usize = 2000;

/// Header names listed per table in the summary.
const SUMMARY_HEADER_LIMIT: usize = 5;

/// Tables dumped verbatim as structured data.
const TABLE_DUMP_LIMIT: usize = 3;

pub const ANALYSIS_OUTPUT_CONTRACT: &str = r#"Respond with ONLY a single valid JSON object in exactly this format:
{
  "patientInfo": {
    "id": "extracted_or_generated_id",
    "name": "Patient Name",
    "age": age_number_or_null,
    "gender": "male | female | null",
    "dateOfBirth": "YYYY-MM-DD or null",
    "lastTestDate": "YYYY-MM-DD"
  },
  "latestResults": [
    {
      "id": "unique_id",
      "testName": "Test Name",
      "value": numeric_value,
      "unit": "unit",
      "referenceRange": {"min": min_value, "max": max_value},
      "status": "normal | high | low | critical",
      "date": "YYYY-MM-DD",
      "category": "blood | lipid | liver | kidney | metabolic"
    }
  ],
  "testCategories": [
    {
      "id": "category_id",
      "name": "Category Name",
      "description": "Category Description",
      "color": "hsl(var(--chart-primary))",
      "tests": ["test1", "test2"]
    }
  ]
}

RULES:
1. Extract patient information from the text.
2. Find every test result with its value, unit, and reference range.
3. Derive status from the reference range: below min is low, above max is high.
4. category MUST be one of: blood, lipid, liver, kidney, metabolic.
5. Group the tests found into testCategories.
6. Use null for any field that is not present in the document.
7. Output ONLY the JSON object. No explanations, no Markdown fences."#;

/// Build the analysis prompt for one document's extracted content.
///
/// Deterministic: identical content always yields an identical prompt.
pub fn build_analysis_prompt(content: &ExtractedContent) -> String {
    let text: String = content.text.chars().take(PROMPT_TEXT_LIMIT).collect();

    let summaries = content
        .tables
        .iter()
        .map(summarize_table)
        .collect::<Vec<_>>()
        .join("\n");

    let dumped = &content.tables[..content.tables.len().min(TABLE_DUMP_LIMIT)];
    // Serializing plain strings cannot fail.
    let table_dump = serde_json::to_string_pretty(dumped).unwrap_or_else(|_| "[]".into());

    format!(
        r#"You are a medical data analyst. Analyze the following medical lab report and extract structured information.

TEXT CONTENT:
{text}

TABLES FOUND:
{summaries}

DETAILED TABLE DATA:
{table_dump}

{ANALYSIS_OUTPUT_CONTRACT}
"#
    )
}

/// One-line description of a table: first header names and row count.
pub fn summarize_table(table: &Table) -> String {
    let headers = table
        .headers
        .iter()
        .take(SUMMARY_HEADER_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Table with headers: {headers} and {} rows", table.rows.len())
}
