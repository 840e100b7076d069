//! mentor-web: Main Entry Point

use anyhow::Context;
use clap::Parser;
use mentor_core::config::load_environment;
use mentor_core::Settings;
use mentor_web::{create_router, AppState, ServerConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mentor-web-server")]
#[command(about = "HTTP server for the mentor assistant")]
struct Cli {
    /// Port to listen on (defaults to AGENTIC_PORT, then 5001)
    #[arg(long, short)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = load_environment();

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mentor_web=debug,mentor_chat=debug")),
        )
        .init();

    if let Some(path) = loaded {
        info!(path = %path, "Loaded environment file");
    }

    let cli = Cli::parse();
    let settings = Settings::from_env();
    settings.log_summary();

    let config = ServerConfig {
        host: cli.host,
        port: cli.port.unwrap_or(settings.port),
    };

    let state = Arc::new(AppState::new(settings).await?);
    let tool_count = state.agent.registry().len().await;
    info!(tools = tool_count, "Mentor assistant ready");

    let app = create_router(state.clone());
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.persist_memory().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
