use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use trackql_common::config::AppConfig;
use trackql_core::{GatewayPolicy, QueryGateway};

mod backend;
mod graphql;

struct AppState {
    gateway: QueryGateway,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading configuration; report the outcome once logging is up.
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(path) => tracing::info!("Loaded .env from: {:?}", path),
        Err(e) => tracing::warn!("Failed to load .env file: {}. Using system environment variables.", e),
    }
    tracing::debug!("Effective configuration:\n{}", config.to_toml()?);
    tracing::info!("Using storage backend: {:?}", config.storage.backend);
    tracing::info!(
        "List cap: {} (groups uncapped), store timeout: {}ms",
        config.gateway.list_cap,
        config.gateway.store_timeout_ms
    );

    let store = backend::open_store(&config.storage).await?;
    let gateway = QueryGateway::new(store, GatewayPolicy::from(&config.gateway));
    let state = Arc::new(AppState { gateway });

    let app = app(state, config.server.max_body_bytes);

    let http_addr: SocketAddr = config.server.http_addr.parse()?;
    tracing::info!("HTTP API listening on {}", http_addr);
    tracing::info!("Query endpoints: http://{}/graphql/ (interactive), http://{}/graphql/api/", http_addr, http_addr);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("trackql server stopped.");
    Ok(())
}

fn app(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/version", get(version))
        .route(
            "/graphql/",
            get(graphql::handlers::graphql_get).post(graphql::handlers::graphql_post),
        )
        .route("/graphql/api/", post(graphql::handlers::api_post))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_bytes))
                .into_inner(),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}

async fn root() -> &'static str {
    "trackql is running."
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build_time": env!("BUILD_TIME"),
        "endpoints": ["/graphql/", "/graphql/api/"],
    }))
}
