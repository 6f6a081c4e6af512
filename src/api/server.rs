//! Server lifecycle: bind, serve, and shut down gracefully on Ctrl+C or
//! SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::router::api_router;
use crate::config::AppConfig;
use crate::pipeline::structuring::LabReportAnalyzer;

/// Serve the API until a shutdown signal arrives.
pub async fn serve(config: AppConfig, analyzer: Arc<LabReportAnalyzer>) -> Result<(), String> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|e| format!("Invalid bind address '{}': {e}", config.bind_address))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    tracing::info!(
        %addr,
        model = %config.ollama_model,
        ollama_url = %config.ollama_base_url,
        origins = ?config.cors_origins,
        "API server started"
    );

    let app = api_router(analyzer, config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    tracing::info!("API server stopped");
    Ok(())
}

/// Wait for Ctrl+C (or SIGTERM on unix).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::MockLlmClient;

    #[tokio::test]
    async fn invalid_bind_address_is_rejected() {
        let config = AppConfig {
            bind_address: "not-an-address".into(),
            ..AppConfig::default()
        };
        let analyzer = Arc::new(LabReportAnalyzer::new(
            Box::new(MockLlmClient::unavailable()),
            "llama2",
        ));
        let err = serve(config, analyzer).await.unwrap_err();
        assert!(err.contains("Invalid bind address"));
    }
}
