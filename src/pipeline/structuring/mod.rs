pub mod types;
pub mod prompt;
pub mod parser;
pub mod validation;
pub mod ollama;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use validation::*;
pub use ollama::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned an empty response")]
    EmptyResponse,

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("LLM response is missing required keys: {0:?}")]
    MissingKeys(Vec<&'static str>),

    #[error("LLM response key '{key}' is not {expected}")]
    UnexpectedShape {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid dateOfBirth '{0}', expected YYYY-MM-DD")]
    InvalidDateOfBirth(String),

    #[error("Content extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Coarse failure class, used to pick the degradation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Service unreachable, non-200, timeout, or nothing returned.
    Transport,
    /// No JSON object in the response, or it does not parse.
    Parse,
    /// Valid JSON with the wrong top-level shape.
    Structural,
    /// A single bad value; clamped or dropped.
    Field,
    /// A sub-document rejected as a whole.
    Record,
    /// Unusable input, rejected before any work is done.
    Input,
}

impl AnalysisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::OllamaConnection(_)
            | AnalysisError::OllamaError { .. }
            | AnalysisError::Timeout(_)
            | AnalysisError::HttpClient(_)
            | AnalysisError::EmptyResponse => FailureKind::Transport,
            AnalysisError::MalformedResponse(_) | AnalysisError::JsonParsing(_) => {
                FailureKind::Parse
            }
            AnalysisError::MissingKeys(_) | AnalysisError::UnexpectedShape { .. } => {
                FailureKind::Structural
            }
            AnalysisError::InvalidField { .. } => FailureKind::Field,
            AnalysisError::InvalidDateOfBirth(_) => FailureKind::Record,
            AnalysisError::ExtractionFailed(_) => FailureKind::Input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_classified() {
        assert_eq!(
            AnalysisError::OllamaConnection("http://localhost:11434".into()).kind(),
            FailureKind::Transport
        );
        assert_eq!(AnalysisError::Timeout(120).kind(), FailureKind::Transport);
        assert_eq!(AnalysisError::EmptyResponse.kind(), FailureKind::Transport);
    }

    #[test]
    fn parse_and_structure_errors_classified() {
        assert_eq!(
            AnalysisError::MalformedResponse("no object".into()).kind(),
            FailureKind::Parse
        );
        assert_eq!(
            AnalysisError::MissingKeys(vec!["testCategories"]).kind(),
            FailureKind::Structural
        );
    }

    #[test]
    fn date_of_birth_is_record_level() {
        let err = AnalysisError::InvalidDateOfBirth("15/03/1979".into());
        assert_eq!(err.kind(), FailureKind::Record);
        assert!(err.to_string().contains("15/03/1979"));
    }
}
