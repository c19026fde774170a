//! Address preview server.
//!
//! Exposes the address resolution pipeline over HTTP for the local front end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parcelpack::api::{build_router, AppState};
use parcelpack::config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Property feasibility preview server")]
struct Args {
    /// Optional TOML config file; flags and env vars override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Mapbox access token for the primary geocoder
    #[arg(long, env = "MAPBOX_TOKEN", hide_env_values = true)]
    mapbox_token: Option<String>,

    /// Omit diagnostic detail from 500 responses (still logged)
    #[arg(long)]
    redact_errors: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)
                .with_context(|| format!("Loading {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if self.mapbox_token.is_some() {
            config.mapbox_token = self.mapbox_token;
        }
        if self.redact_errors {
            config.expose_error_detail = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,parcelpack=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Args::parse().into_config()?;

    let state = AppState::from_config(&config)?;
    info!(
        "Primary geocoder: {}",
        if state.pipeline.geocoder().has_primary() {
            "mapbox"
        } else {
            "disabled (no MAPBOX_TOKEN)"
        }
    );
    info!(
        "{} constraint layer(s) configured; survey diagram tool {}",
        config.constraint_layers.len(),
        if state.sg.is_configured() {
            "enabled"
        } else {
            "not configured"
        }
    );

    let app = build_router(Arc::new(state), &config.allowed_origins);

    let listen = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!("Preview server running on http://{}", listen);
    axum::serve(listener, app).await?;

    Ok(())
}
