pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use pipeline::structuring::{LabReportAnalyzer, OllamaClient};

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env();

    // The blocking HTTP client must be built and dropped outside the runtime,
    // so `analyzer` outlives `block_on`.
    let ollama = match OllamaClient::new(&app_config.ollama_base_url) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create Ollama client: {e}");
            std::process::exit(1);
        }
    };
    let analyzer = Arc::new(LabReportAnalyzer::new(
        Box::new(ollama),
        &app_config.ollama_model,
    ));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    let result = runtime.block_on(api::serve(app_config, analyzer.clone()));
    drop(runtime);

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
