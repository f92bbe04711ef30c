//! chunkvault server binary.

use anyhow::{Context, Result};
use chunkvault_core::config::AppConfig;
use chunkvault_engine::{RetentionSweeper, connect_with_retry};
use chunkvault_server::{AppState, create_router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// chunkvault - chunked object storage server
#[derive(Parser, Debug)]
#[command(name = "chunkvaultd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "CHUNKVAULT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file, then `CHUNKVAULT_` env vars.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(config_path = %path, "No config file found, using defaults and environment");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("CHUNKVAULT_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("chunkvault v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    chunkvault_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Without a reachable store nothing can be served.
    let store = connect_with_retry(&config.storage, &config.connect)
        .await
        .context("failed to connect to object store")?;
    tracing::info!(backend = store.backend_name(), "Object store connected");

    if config.retention.enabled {
        let sweeper = RetentionSweeper::new(
            store.clone(),
            &config.retention,
            config.engine.operation_timeout(),
        )
        .context("invalid retention configuration")?;
        sweeper.spawn(chunkvault_server::metrics::record_sweep);
        tracing::info!(
            window_secs = config.retention.window_secs,
            interval_secs = config.retention.sweep_interval_secs,
            "Retention sweeper spawned"
        );
    } else {
        tracing::info!("Retention disabled");
    }

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, store).context("failed to build application state")?;
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkvault_core::config::StorageConfig;

    #[test]
    fn load_config_reads_toml_sections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "127.0.0.1:9999"

[storage]
type = "memory"

[engine]
max_chunk_size = 1024

[retention]
enabled = false
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.engine.max_chunk_size, 1024);
        assert!(!config.retention.enabled);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(&path, "[quota]\nunit_size_bytes = 0\n").unwrap();

        assert!(load_config(path.to_str().unwrap()).is_err());
    }
}
