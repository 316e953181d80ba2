// src/routes/mod.rs
pub mod chat;
pub mod health;

use std::path::Path;

use crate::state::SharedState;
use axum::{
    Router,
    routing::{get, post},
};
use chat::chat_handler;
use health::health_handler;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// API routes plus the single-page shell. Unknown paths get `index.html`.
pub fn create_router(static_dir: impl AsRef<Path>) -> Router<SharedState> {
    let static_dir = static_dir.as_ref();
    let shell = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .fallback_service(shell)
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}
