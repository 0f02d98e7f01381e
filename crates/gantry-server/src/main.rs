//! Gantry deployment receiver binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use gantry_core::InstanceId;
use gantry_core::config::AppConfig;
use gantry_server::{AppState, create_router};
use gantry_staging::StagingStore;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gantry - chunked artifact deployment receiver
#[derive(Parser, Debug)]
#[command(name = "gantryd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "GANTRY_CONFIG",
        default_value = "config/gantry.toml"
    )]
    config: String,
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

    tracing::info!("Gantry v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override
    // everything).
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("GANTRY_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // The identity is never persisted: a restart orphans previously staged
    // files until the sweeper reclaims them.
    let instance = InstanceId::generate();
    tracing::info!(instance = %instance, "Instance identity generated");

    let staging = StagingStore::open(&config.staging.path, instance)
        .await
        .context("failed to open staging directory")?;
    tracing::info!(path = %config.staging.path.display(), "Staging directory ready");

    let state = AppState::new(config, staging).context("invalid configuration")?;

    let addr: SocketAddr = state
        .config
        .server
        .bind
        .parse()
        .context("invalid bind address")?;

    tracing::info!(path = %state.config.server.path, "Listening on {}", addr);

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
