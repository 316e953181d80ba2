// src/services/dispatcher.rs
use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::gemini::{GenerationConfig, GenerationPayload, GenerativeBackend};
use super::retry::RetryPolicy;
use crate::config::{Config, Credential, default_models};
use crate::error::DispatchError;

/// Drives one chat message through model fallback and the outer retry loop.
///
/// Immutable once built; share it behind an `Arc` between requests.
pub struct Dispatcher {
    backend: Arc<dyn GenerativeBackend>,
    credential: Credential,
    models: Vec<String>,
    generation: GenerationConfig,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("credential", &self.credential)
            .field("models", &self.models)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn GenerativeBackend>, credential: Credential) -> Self {
        Self {
            backend,
            credential,
            models: default_models(),
            generation: GenerationConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(backend: Arc<dyn GenerativeBackend>, config: &Config) -> Self {
        Self::new(backend, config.api_key.clone()).with_models(config.models.clone())
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credential.is_configured()
    }

    /// Validate, then run the fallback pass under the retry policy.
    pub async fn dispatch(&self, message: &str) -> Result<String, DispatchError> {
        if message.trim().is_empty() {
            warn!("rejecting empty message");
            return Err(DispatchError::InvalidInput);
        }
        let Some(api_key) = self.credential.usable() else {
            warn!("GOOGLE_API_KEY is missing or still the placeholder");
            return Err(DispatchError::Misconfigured);
        };

        let payload = GenerationPayload::new(message, self.generation);
        let span = info_span!("dispatch", request_id = %Uuid::new_v4());

        async {
            info!(chars = message.chars().count(), "dispatching chat message");
            let result = self
                .retry
                .run(|attempt| {
                    debug!(attempt = attempt + 1, "starting fallback pass");
                    self.try_models(api_key, &payload)
                })
                .await;
            match &result {
                Ok(reply) => info!(reply_chars = reply.chars().count(), "got reply"),
                Err(err) => warn!(error = %err, "dispatch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// One pass over the candidate list. Overloaded models are skipped;
    /// any other failure ends the pass.
    async fn try_models(
        &self,
        api_key: &str,
        payload: &GenerationPayload,
    ) -> Result<String, DispatchError> {
        for model in &self.models {
            info!(model = %model, "trying model");
            match self.backend.generate_content(model, api_key, payload).await {
                Ok(response) => match response.text() {
                    Some(text) => {
                        info!(model = %model, "model answered");
                        return Ok(text.to_string());
                    }
                    None => {
                        warn!(model = %model, "model returned no text, trying next model");
                    }
                },
                Err(err) if err.is_overloaded() => {
                    warn!(model = %model, error = %err, "model overloaded, trying next model");
                }
                Err(err) => {
                    warn!(model = %model, error = %err, "model failed");
                    return Err(err.into());
                }
            }
        }
        Err(DispatchError::AllModelsOverloaded)
    }
}
