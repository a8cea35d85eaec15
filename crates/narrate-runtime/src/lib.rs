//! Startup plumbing shared by the narrate binaries: config path resolution,
//! tracing initialization and shutdown signals.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Resolves the configuration file path for a binary.
///
/// The first CLI argument wins, then `env_var`. Returns the path (if any)
/// together with where it came from, for the startup log.
pub fn resolve_config_path(env_var: &str) -> (Option<String>, &'static str) {
    resolve_from(std::env::args().nth(1), std::env::var(env_var).ok())
}

fn resolve_from(cli_arg: Option<String>, env_value: Option<String>) -> (Option<String>, &'static str) {
    if let Some(path) = cli_arg.filter(|value| !value.trim().is_empty()) {
        return (Some(path), "cli-arg");
    }

    if let Some(path) = env_value.filter(|value| !value.trim().is_empty()) {
        return (Some(path), "env-var");
    }

    (None, "default")
}

/// Installs the global tracing subscriber.
///
/// `level` is an `EnvFilter` directive; an invalid directive falls back to
/// `info`.
pub fn init_tracing<W>(level: &str, json: bool, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .init();
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
