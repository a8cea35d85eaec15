//! Narrate server binary: serves the `/validate-audio-length` endpoint.
//!
//! Starts an axum HTTP server with structured logging and graceful shutdown
//! on SIGTERM/SIGINT.

use narrate_runtime::{init_tracing, resolve_config_path, shutdown_signal};
use narrate_server::{app, config, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path("NARRATE_CONFIG_PATH");
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    init_tracing(&config.logging.level, config.logging.json, std::io::stdout);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    tracing::info!(
        max_duration_secs = config.budget.max_duration_secs,
        words_per_second = config.budget.words_per_second,
        placeholder = %config.budget.placeholder,
        "duration budget"
    );

    let app = app(AppState::new(config.budget));
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting narrate server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("narrate server shut down");
}
