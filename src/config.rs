/// Application-level constants
pub const APP_NAME: &str = "Labtrend";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Ollama instance and model.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama2";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Availability probe timeout (`GET /api/tags`).
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Single-attempt generation timeout (`POST /api/generate`).
pub const GENERATE_TIMEOUT_SECS: u64 = 120;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,labtrend_lib=debug"
    } else {
        "info"
    }
}

/// Sampling options sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct GenerationOptions {
    pub num_predict: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            num_predict: 2000,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub bind_address: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            ollama_base_url: non_empty("OLLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            ollama_model: non_empty("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into()),
            bind_address: non_empty("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.into()),
            cors_origins: parse_origins(
                &non_empty("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into()),
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
