//! HTTP surface for the pipeline.

mod handlers;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::sg::SgFetcher;

/// State shared across handlers. Immutable after start-up.
pub struct AppState {
    pub pipeline: Pipeline,
    pub sg: SgFetcher,
    pub port: u16,
    pub expose_error_detail: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            pipeline: Pipeline::new(config)?,
            sg: SgFetcher::new(config.sg.clone()),
            port: config.port,
            expose_error_detail: config.expose_error_detail,
        })
    }
}

pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/process_address", post(handlers::process_address_handler))
        .route("/api/sg_fetch", post(handlers::sg_fetch_handler))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
