use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::AnalysisError;
use crate::config::{
    GenerationOptions, DEFAULT_OLLAMA_BASE_URL, GENERATE_TIMEOUT_SECS, PROBE_TIMEOUT_SECS,
};

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    options: GenerationOptions,
    probe_timeout_secs: u64,
    generate_timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str) -> Result<Self, AnalysisError> {
        Self::with_timeouts(base_url, PROBE_TIMEOUT_SECS, GENERATE_TIMEOUT_SECS)
    }

    pub fn with_timeouts(
        base_url: &str,
        probe_timeout_secs: u64,
        generate_timeout_secs: u64,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(generate_timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            options: GenerationOptions::default(),
            probe_timeout_secs,
            generate_timeout_secs,
        })
    }

    /// Default Ollama instance at localhost:11434.
    pub fn default_local() -> Result<Self, AnalysisError> {
        Self::new(DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error, timeout_secs: u64) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(timeout_secs)
        } else if e.is_connect() {
            AnalysisError::OllamaConnection(self.base_url.clone())
        } else {
            AnalysisError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

impl LlmClient for OllamaClient {
    fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.probe_timeout_secs))
            .send()
        {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "Ollama probe rejected");
                false
            }
            Err(e) => {
                let e = self.map_send_error(e, self.probe_timeout_secs);
                tracing::debug!(error = %e, "Ollama probe failed");
                false
            }
        }
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, AnalysisError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e, self.generate_timeout_secs))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| AnalysisError::HttpClient(format!("Unreadable generate body: {e}")))?;

        if parsed.response.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(parsed.response)
    }
}

/// Mock LLM client for testing. Returns a configurable response.
pub struct MockLlmClient {
    available: bool,
    response: Result<String, String>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockLlmClient {
    /// An available service that answers every prompt with `response`.
    pub fn new(response: &str) -> Self {
        Self {
            available: true,
            response: Ok(response.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A service that fails the availability probe.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            response: Err("connection refused".into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// An available service whose generate call fails.
    pub fn failing(reason: &str) -> Self {
        Self {
            available: true,
            response: Err(reason.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of generate calls made so far.
    pub fn generate_calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl LlmClient for MockLlmClient {
    fn is_available(&self) -> bool {
        self.available
    }

    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.response {
            Ok(text) if text.trim().is_empty() => Err(AnalysisError::EmptyResponse),
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(AnalysisError::HttpClient(reason.clone())),
        }
    }
}
