// src/services/relay_client.rs
//! Client side of `/chat`: what the browser shell does, as a library.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

const UNAVAILABLE: &str = "Service temporarily unavailable. Please try again in a moment.";
const GENERIC_FAILURE: &str = "Failed to get AI response";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Please enter a message")]
    EmptyMessage,
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Unable to connect to the server. Please check if the server is running.")]
    Connection,
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl RelayError {
    /// Overload and unavailability errors are worth a second try.
    pub fn offers_retry(&self) -> bool {
        let text = self.to_string();
        text.contains("overloaded") || text.contains("temporarily unavailable")
    }
}

/// A failed send, holding on to exactly what was sent so it can be resent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{error}")]
pub struct RelayFailure {
    pub error: RelayError,
    message: String,
}

impl RelayFailure {
    fn empty() -> Self {
        Self { error: RelayError::EmptyMessage, message: String::new() }
    }

    pub fn offers_retry(&self) -> bool {
        self.error.offers_retry()
    }

    pub fn original_message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

pub fn summarize_prompt(text: &str) -> String {
    format!("Summarize: {text}")
}

pub fn generate_prompt(content_type: &str, text: &str) -> String {
    format!("Generate {content_type}: {text}")
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Send user input. Input is trimmed; blank input never leaves the client.
    pub async fn send(&self, input: &str) -> Result<String, RelayFailure> {
        let message = input.trim();
        if message.is_empty() {
            return Err(RelayFailure::empty());
        }
        self.post(message).await.map_err(|error| RelayFailure {
            error,
            message: message.to_string(),
        })
    }

    /// Resend the message of a failed exchange, byte for byte.
    pub async fn retry(&self, failure: &RelayFailure) -> Result<String, RelayFailure> {
        self.send(failure.original_message()).await
    }

    pub async fn summarize(&self, text: &str) -> Result<String, RelayFailure> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayFailure::empty());
        }
        self.send(&summarize_prompt(text)).await
    }

    pub async fn generate(&self, content_type: &str, text: &str) -> Result<String, RelayFailure> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayFailure::empty());
        }
        self.send(&generate_prompt(content_type, text)).await
    }

    async fn post(&self, message: &str) -> Result<String, RelayError> {
        debug!(chars = message.chars().count(), "posting to /chat");
        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&json!({ "message": message }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "could not reach chat server");
                RelayError::Connection
            })?;

        let status = response.status();
        let body: Option<ReplyBody> = response.json().await.ok();

        if status.is_success() {
            return body
                .and_then(|b| b.reply)
                .ok_or_else(|| RelayError::InvalidResponse("missing reply".to_string()));
        }

        let message = match body.and_then(|b| b.error) {
            Some(error) => error,
            None if status == StatusCode::SERVICE_UNAVAILABLE => UNAVAILABLE.to_string(),
            None => GENERIC_FAILURE.to_string(),
        };
        warn!(status = status.as_u16(), %message, "chat request failed");
        Err(RelayError::Server { status: status.as_u16(), message })
    }
}
