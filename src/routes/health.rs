use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};

use crate::{message::HealthResponse, state::SharedState};

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        api_key_configured: state.dispatcher.is_configured(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
