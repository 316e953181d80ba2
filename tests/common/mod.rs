#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use gemini_relay::config::Credential;
use gemini_relay::error::UpstreamError;
use gemini_relay::routes::create_router;
use gemini_relay::services::dispatcher::Dispatcher;
use gemini_relay::services::gemini::{GenerateContentResponse, GenerationPayload, GenerativeBackend};
use gemini_relay::services::retry::RetryPolicy;
use gemini_relay::state::AppState;

pub const TEST_KEY: &str = "test-key";

pub type Outcome = Result<GenerateContentResponse, UpstreamError>;

/// In-memory upstream. Answers with `respond(model, call_index)` and keeps
/// a log of every call.
pub struct ScriptedBackend {
    respond: Box<dyn Fn(&str, usize) -> Outcome + Send + Sync>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub api_key: String,
    pub payload: GenerationPayload,
}

impl ScriptedBackend {
    pub fn new(respond: impl Fn(&str, usize) -> Outcome + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always(outcome: Outcome) -> Arc<Self> {
        Self::new(move |_, _| outcome.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.payload.contents[0].parts[0].text.clone())
            .collect()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        payload: &GenerationPayload,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                model: model.to_string(),
                api_key: api_key.to_string(),
                payload: payload.clone(),
            });
            calls.len() - 1
        };
        (self.respond)(model, index)
    }
}

pub fn reply(text: &str) -> Outcome {
    Ok(GenerateContentResponse::from_text(text))
}

pub fn overloaded() -> Outcome {
    Err(UpstreamError::classify("The model is overloaded. Please try again later."))
}

pub fn failure(message: &str) -> Outcome {
    Err(UpstreamError::classify(message))
}

pub fn dispatcher(backend: Arc<ScriptedBackend>, key: Option<&str>) -> Dispatcher {
    Dispatcher::new(backend, Credential::new(key.map(str::to_string)))
        .with_retry_policy(RetryPolicy::immediate(3))
}

pub fn static_dir() -> String {
    format!("{}/public", env!("CARGO_MANIFEST_DIR"))
}

pub fn app(backend: Arc<ScriptedBackend>, key: Option<&str>) -> Router {
    create_router(static_dir()).with_state(Arc::new(AppState::new(dispatcher(backend, key))))
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
