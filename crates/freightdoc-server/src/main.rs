use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, Method};
use axum::routing::post;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use freightdoc_core::FreightConfig;

mod handlers;
mod models;
mod state;

use state::AppState;

/// Base64 inflates uploads by a third; 50MB covers any contract we see.
const BODY_LIMIT: usize = 50 * 1024 * 1024;

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/parse-pdf", post(handlers::parse_pdf))
        .route("/parse-excel", post(handlers::parse_excel))
        .route("/inspect-pdf", post(handlers::inspect))
        .layer(axum::extract::DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("FREIGHTDOC_CONFIG") {
        Ok(path) => FreightConfig::from_file(Path::new(&path))
            .with_context(|| format!("Failed to read config file {}", path))?,
        Err(_) => FreightConfig::default(),
    };

    let addr: SocketAddr = std::env::var("FREIGHTDOC_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("FREIGHTDOC_ADDR must be host:port")?;

    let app = app(Arc::new(AppState { config }));

    info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
