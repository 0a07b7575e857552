//! piezo Binary Entry Point
//!
//! Runs the probing agent with its HTTP control server.
//! Core functionality is provided by the `piezo` library crate.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use piezo::{
    AgentBuilder, AppConfig,
    server::{AppState, create_router},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// piezo - Periodic HTTP Probing Agent
#[derive(Parser, Debug)]
#[command(name = "piezo", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (optional; defaults apply when absent)
    #[arg(short, long, default_value = "configs/piezo.yaml", env = "PIEZO_CONFIG")]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "PIEZO_BIND")]
    bind: Option<String>,

    /// Port to run the HTTP control server on (overrides config file)
    #[arg(long, env = "PIEZO_PORT")]
    port: Option<u16>,

    /// HTTP connect timeout for polling in milliseconds
    #[arg(long, env = "PIEZO_CONNECT_TIMEOUT")]
    connect_timeout: Option<u64>,

    /// HTTP request timeout for polling in milliseconds
    #[arg(long, env = "PIEZO_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Number of fetch workers
    #[arg(long, env = "PIEZO_WORKER_COUNT")]
    worker_count: Option<usize>,

    /// Register Kestrel as a result receiver
    #[arg(long, env = "PIEZO_ENABLE_KESTREL")]
    enable_kestrel: bool,

    /// Kestrel host:port address
    #[arg(long, env = "PIEZO_KESTREL_HOST")]
    kestrel_host: Option<String>,

    /// Name of the Kestrel queue
    #[arg(long, env = "PIEZO_KESTREL_QUEUE")]
    kestrel_queue: Option<String>,
}

impl Cli {
    /// Apply CLI/env overrides (CLI > ENV > config file).
    fn apply(self, config: &mut AppConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ms) = self.connect_timeout {
            config.fetch.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.request_timeout {
            config.fetch.request_timeout = Duration::from_millis(ms);
        }
        if let Some(workers) = self.worker_count {
            config.fetch.workers = workers;
        }
        if self.enable_kestrel {
            config.receivers.kestrel.enabled = true;
        }
        if let Some(host) = self.kestrel_host {
            config.receivers.kestrel.host = host;
        }
        if let Some(queue) = self.kestrel_queue {
            config.receivers.kestrel.queue = queue;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,piezo=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("piezo - Periodic HTTP Probing Agent");

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load_or_default(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    tracing::info!(
        "Server: {}:{}, workers: {}, connect timeout: {:?}, request timeout: {:?}",
        config.server.bind,
        config.server.port,
        config.fetch.workers,
        config.fetch.connect_timeout,
        config.fetch.request_timeout,
    );

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    let handles = AgentBuilder::new(config).build()?;
    let app = create_router(AppState {
        control: handles.control.clone(),
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Control server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    handles.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
