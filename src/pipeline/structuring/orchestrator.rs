use chrono::NaiveDate;
use rand::Rng;

use super::parser::{parse_analysis_response, static_fallback};
use super::prompt::build_analysis_prompt;
use super::types::{AnalysisOutcome, AnalysisSource, LlmClient, RawAnalysis};
use super::validation::validate_analysis;
use super::AnalysisError;
use crate::pipeline::extraction::{ContentExtractor, ExtractedContent};
use crate::pipeline::formatting::RecordFormatter;

/// Orchestrates the lab report analysis pipeline:
/// probe → prompt → LLM → parse → validate → format
pub struct LabReportAnalyzer {
    llm: Box<dyn LlmClient + Send + Sync>,
    model_name: String,
    formatter: RecordFormatter,
}

impl LabReportAnalyzer {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, model_name: &str) -> Self {
        Self::with_formatter(llm, model_name, RecordFormatter::default())
    }

    pub fn with_formatter(
        llm: Box<dyn LlmClient + Send + Sync>,
        model_name: &str,
        formatter: RecordFormatter,
    ) -> Self {
        Self {
            llm,
            model_name: model_name.to_string(),
            formatter,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Availability of the generation service, as seen by this analyzer.
    pub fn llm_available(&self) -> bool {
        self.llm.is_available()
    }

    /// Analyze extracted content using today's date and the thread RNG.
    pub fn analyze(&self, content: &ExtractedContent) -> Result<AnalysisOutcome, AnalysisError> {
        let today = chrono::Local::now().date_naive();
        self.analyze_with(content, today, &mut rand::thread_rng())
    }

    /// Extract a document and analyze the result.
    pub fn analyze_document(
        &self,
        extractor: &dyn ContentExtractor,
        path: &std::path::Path,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let content = extractor.extract(path);
        self.analyze(&content)
    }

    /// Deterministic entry point: `today` and `rng` drive every generated
    /// id, default date, and trend point.
    pub fn analyze_with<R: Rng + ?Sized>(
        &self,
        content: &ExtractedContent,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let span = tracing::info_span!(
            "analyze_report",
            text_len = content.text.len(),
            tables = content.tables.len()
        );
        let _enter = span.enter();

        if content.is_error() {
            let reason = content
                .metadata
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("extraction reported an error");
            tracing::warn!(reason, "Rejecting failed extraction before prompting");
            return Err(AnalysisError::ExtractionFailed(reason.to_string()));
        }

        let llm_available = self.llm.is_available();
        let (raw, source, mut warnings) = if llm_available {
            self.run_llm(content)
        } else {
            tracing::warn!(model = %self.model_name, "Ollama unavailable, using static fallback");
            (
                static_fallback(),
                AnalysisSource::Fallback,
                vec!["Ollama service unavailable".to_string()],
            )
        };

        let validated = validate_analysis(raw);
        warnings.extend(validated.warnings.iter().cloned());
        let record = self.formatter.format(&validated, today, rng);

        tracing::info!(
            source = %source,
            results = record.latest_results.len(),
            warnings = warnings.len(),
            "Lab report analyzed"
        );

        Ok(AnalysisOutcome {
            record,
            source,
            llm_available,
            warnings,
        })
    }

    /// Single generation attempt. Transport failures degrade to the static
    /// fallback, unusable responses to the heuristic placeholder.
    fn run_llm(&self, content: &ExtractedContent) -> (RawAnalysis, AnalysisSource, Vec<String>) {
        let prompt = build_analysis_prompt(content);
        tracing::debug!(prompt_len = prompt.len(), model = %self.model_name, "Prompt built");

        let response = match self.llm.generate(&self.model_name, &prompt) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, kind = ?e.kind(), "LLM generation failed, using static fallback");
                return (
                    static_fallback(),
                    AnalysisSource::Fallback,
                    vec![format!("Generation failed: {e}")],
                );
            }
        };

        let parsed = parse_analysis_response(&response);
        let warnings = parsed
            .failure
            .map(|e| vec![format!("LLM response unusable: {e}")])
            .unwrap_or_default();
        (parsed.analysis, parsed.source, warnings)
    }
}
