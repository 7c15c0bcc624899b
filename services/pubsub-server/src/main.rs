use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pubsub_registry::{DispatchConfig, Registry};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pubsub_server::config;
use pubsub_server::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pubsub-server")]
struct Cli {
    /// Path to the server's TOML config file.
    #[arg(long, default_value = "/etc/pubsub/server.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let cli = Cli::parse();
    let config = config::load_config_from_path(&cli.config).expect("failed to load config");

    let registry = Registry::new(config.service_uri.clone(), config.default_cookie.clone());
    let dispatch_config = DispatchConfig {
        send_timeout: Duration::from_secs(config.dispatch.send_timeout_secs),
        retry_budget: Duration::from_secs(config.dispatch.retry_budget_secs),
    };
    let upstream_peers: HashSet<_> = config.upstream_peers.iter().cloned().collect();
    let state = AppState::new(registry, config.subscribers_uri.clone(), dispatch_config.clone(), upstream_peers);

    pubsub_server::startup::self_subscribe_to_upstream_peers(&state, &config.upstream_peers).await;
    pubsub_server::startup::spawn_upstream_push_reactor(state.clone(), dispatch_config);

    let router = pubsub_server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind).await.expect("failed to bind");
    info!(addr = %config.bind, service = %config.service_uri, "pubsub server listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await.expect("server error");
    info!("server shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
