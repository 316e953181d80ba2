mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use common::spawn_server;
use gemini_relay::config::Credential;
use gemini_relay::error::UpstreamErrorKind;
use gemini_relay::services::dispatcher::Dispatcher;
use gemini_relay::services::gemini::{
    GeminiClient, GenerateContentResponse, GenerationConfig, GenerationPayload, GenerativeBackend,
};
use gemini_relay::services::retry::RetryPolicy;
use serde_json::json;

const KEY: &str = "secret-key";

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, GenerationPayload)>>>,
}

/// Upstream stand-in: flash is overloaded, everything else echoes the prompt.
async fn generate(
    State(seen): State<Seen>,
    Path(target): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(payload): Json<GenerationPayload>,
) -> Response {
    let prompt = payload.contents[0].parts[0].text.clone();
    seen.requests
        .lock()
        .unwrap()
        .push((target.clone(), query.get("key").cloned(), payload));

    if target.starts_with("gemini-1.5-flash") {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": {
                    "code": 503,
                    "message": "The model is overloaded. Please try again later.",
                    "status": "UNAVAILABLE"
                }
            })),
        )
            .into_response();
    }
    Json(GenerateContentResponse::from_text(format!("{target} says: {prompt}"))).into_response()
}

async fn upstream() -> (String, Seen) {
    let seen = Seen::default();
    let router = Router::new()
        .route("/v1beta/models/{target}", post(generate))
        .with_state(seen.clone());
    (format!("{}/v1beta", spawn_server(router).await), seen)
}

async fn fixed_upstream(status: StatusCode, body: &'static str) -> String {
    let router = Router::new().route(
        "/v1beta/models/{target}",
        post(move || async move { (status, body) }),
    );
    format!("{}/v1beta", spawn_server(router).await)
}

fn payload(text: &str) -> GenerationPayload {
    GenerationPayload::new(text, GenerationConfig::default())
}

#[tokio::test]
async fn posts_payload_to_the_model_endpoint_with_key() {
    let (base, seen) = upstream().await;
    let client = GeminiClient::new(base, Duration::from_secs(5));

    let response = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap();
    assert_eq!(response.text(), Some("gemini-pro:generateContent says: hi"));

    let requests = seen.requests.lock().unwrap();
    let (target, key, sent) = &requests[0];
    assert_eq!(target, "gemini-pro:generateContent");
    assert_eq!(key.as_deref(), Some(KEY));
    assert_eq!(sent, &payload("hi"));
}

#[tokio::test]
async fn overload_body_is_classified() {
    let (base, _) = upstream().await;
    let client = GeminiClient::new(base, Duration::from_secs(5));
    let err = client
        .generate_content("gemini-1.5-flash", KEY, &payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, UpstreamErrorKind::Overloaded);
    assert_eq!(err.message, "The model is overloaded. Please try again later.");
}

#[tokio::test]
async fn quota_body_is_classified() {
    let base = fixed_upstream(
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"error":{"code":429,"message":"You exceeded your current quota.","status":"RESOURCE_EXHAUSTED"}}"#,
    )
    .await;
    let client = GeminiClient::new(base, Duration::from_secs(5));
    let err = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, UpstreamErrorKind::QuotaExceeded);
}

#[tokio::test]
async fn non_json_error_reports_the_status() {
    let base = fixed_upstream(StatusCode::BAD_GATEWAY, "upstream exploded").await;
    let client = GeminiClient::new(base, Duration::from_secs(5));
    let err = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, UpstreamErrorKind::Other);
    assert_eq!(err.message, "API error: 502");
}

#[tokio::test]
async fn error_without_message_reports_the_status() {
    let base = fixed_upstream(StatusCode::BAD_REQUEST, r#"{"error":{"code":400}}"#).await;
    let client = GeminiClient::new(base, Duration::from_secs(5));
    let err = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.message, "API error: 400");
}

#[tokio::test]
async fn success_without_candidates_is_not_an_error() {
    let base = fixed_upstream(StatusCode::OK, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).await;
    let client = GeminiClient::new(base, Duration::from_secs(5));
    let response = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap();
    assert_eq!(response.text(), None);
}

#[tokio::test]
async fn slow_upstream_hits_the_timeout() {
    let router = Router::new().route(
        "/v1beta/models/{target}",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(GenerateContentResponse::from_text("too late"))
        }),
    );
    let base = format!("{}/v1beta", spawn_server(router).await);
    let client = GeminiClient::new(base, Duration::from_millis(200));

    let err = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, UpstreamErrorKind::Other);
    assert!(err.message.contains("timed out"), "{}", err.message);
}

#[tokio::test]
async fn connection_errors_do_not_leak_the_key() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GeminiClient::new(format!("http://{addr}/v1beta"), Duration::from_secs(2));
    let err = client
        .generate_content("gemini-pro", KEY, &payload("hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, UpstreamErrorKind::Other);
    assert!(!err.message.contains(KEY));
}

#[tokio::test]
async fn dispatcher_falls_back_over_http() {
    let (base, seen) = upstream().await;
    let client = Arc::new(GeminiClient::new(base, Duration::from_secs(5)));
    let dispatcher = Dispatcher::new(client, Credential::new(Some(KEY.to_string())))
        .with_retry_policy(RetryPolicy::immediate(3));

    let reply = dispatcher.dispatch("ping").await.unwrap();
    assert_eq!(reply, "gemini-1.5-pro:generateContent says: ping");

    let targets: Vec<String> = seen
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|(target, _, _)| target.clone())
        .collect();
    assert_eq!(
        targets,
        vec!["gemini-1.5-flash:generateContent", "gemini-1.5-pro:generateContent"]
    );
}
