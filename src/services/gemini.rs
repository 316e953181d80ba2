// src/services/gemini.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Body of a `generateContent` call. Built once per chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerationPayload {
    pub fn new(message: &str, config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: message.to_string() }],
            }],
            generation_config: config,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![CandidatePart { text: Some(text.into()) }],
                }),
            }],
        }
    }

    /// Text of the first part of the first candidate, if non-empty.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

/// Anything that can run one generation call against one model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        payload: &GenerationPayload,
    ) -> Result<GenerateContentResponse, UpstreamError>;
}

/// reqwest client for the Generative Language REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        payload: &GenerationPayload,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        debug!(model, "calling generateContent");

        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(model, self.timeout, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(model, self.timeout, e))?;
        trace!(model, %status, body_len = body.len(), "generateContent responded");

        let envelope: ResponseEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(UpstreamError::classify(format!("API error: {}", status.as_u16())));
            }
            Err(e) => {
                return Err(UpstreamError::classify(format!(
                    "Invalid response from model API: {e}"
                )));
            }
        };

        let parsed = GenerateContentResponse { candidates: envelope.candidates };
        if status.is_success() && parsed.text().is_some() {
            return Ok(parsed);
        }
        if let Some(message) = envelope.error.and_then(|e| e.message) {
            return Err(UpstreamError::classify(message));
        }
        if !status.is_success() {
            return Err(UpstreamError::classify(format!("API error: {}", status.as_u16())));
        }
        Ok(parsed)
    }
}

// The request URL carries the key, so it never goes into the message.
fn transport_error(model: &str, timeout: Duration, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::classify(format!(
            "Request to {model} timed out after {}s",
            timeout.as_secs()
        ))
    } else {
        UpstreamError::classify(err.without_url().to_string())
    }
}
