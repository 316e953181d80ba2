use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{debug, warn};

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse},
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "unreadable chat request body");
        AppError::BadRequest(rejection.body_text())
    })?;

    let message = payload.message.unwrap_or_default();
    let preview: String = message.chars().take(50).collect();
    debug!(%preview, "received chat request");

    let reply = state.dispatcher.dispatch(&message).await?;
    Ok(Json(ChatResponse { reply }))
}
