use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gemini_relay::config::Config;
use gemini_relay::routes;
use gemini_relay::services::dispatcher::Dispatcher;
use gemini_relay::services::gemini::GeminiClient;
use gemini_relay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::from_env().context("reading configuration from environment")?;
    info!(
        port = config.port,
        api_key_configured = config.api_key.is_configured(),
        models = ?config.models,
        upstream_timeout_secs = config.upstream_timeout.as_secs(),
        "server starting"
    );
    if !config.api_key.is_configured() {
        warn!("GOOGLE_API_KEY is not set; /chat will answer 500 until it is");
    }

    let backend = Arc::new(GeminiClient::new(config.api_base.clone(), config.upstream_timeout));
    let dispatcher = Dispatcher::from_config(backend, &config);
    let state = Arc::new(AppState::new(dispatcher));

    let app = routes::create_router(&config.static_dir).with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("Server running on http://localhost:{}", config.port);
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gemini_relay=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
