//! Document Analyzer Server
//!
//! Upload PDF and Word documents, then ask about their character count,
//! image count, and image details.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use doc_analyzer::config::Config;
use doc_analyzer::routes;
use doc_analyzer::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and the config variables it sets are seen
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Document Analyzer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        max_upload_mb = config.upload.max_upload_mb,
        session_idle_minutes = config.session.idle_minutes,
        preview_max_px = config.preview.max_px,
        "Configuration loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.host, config.server.port))?;

    let app = routes::router(AppState::new(config)).layer(TraceLayer::new_for_http());

    tracing::info!("Document Analyzer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "doc_analyzer=debug,tower_http=debug";

/// Log filter from `RUST_LOG`, falling back to debug for this crate
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_from_dotenv_file_is_used() {
        let path = std::env::temp_dir().join(format!("doc-analyzer-{}.env", std::process::id()));
        std::fs::write(&path, "RUST_LOG=doc_analyzer=trace\n").unwrap();

        std::env::remove_var("RUST_LOG");
        assert!(log_filter().to_string().contains("doc_analyzer=debug"));

        dotenvy::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let filter = log_filter().to_string();
        assert!(filter.contains("doc_analyzer=trace"));
        assert!(!filter.contains("tower_http"));
        std::env::remove_var("RUST_LOG");
    }
}
