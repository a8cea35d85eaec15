use crate::config::ValidationConfig;
use crate::error::AgentError;
use crate::ports::{TextValidator, ValidatedText};
use async_trait::async_trait;
use narrate_budget::TrimRequest;
use serde::Deserialize;
use std::time::Duration;

/// Path of the validation endpoint, relative to the service base URL.
pub const VALIDATE_PATH: &str = "/validate-audio-length";

#[derive(Debug, Deserialize)]
struct ValidationReply {
    validated_text: Option<String>,
    audio_length: Option<f64>,
}

/// HTTP client for the `/validate-audio-length` endpoint.
#[derive(Debug, Clone)]
pub struct ValidationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ValidationClient {
    pub fn new(config: &ValidationConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client error: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}{}", config.url.trim_end_matches('/'), VALIDATE_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextValidator for ValidationClient {
    /// Submits `text` for validation.
    ///
    /// A successful reply without `validated_text` is treated as approval of
    /// the original text.
    async fn validate(&self, text: &str) -> Result<ValidatedText, AgentError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&TrimRequest::new(text))
            .send()
            .await
            .map_err(|e| AgentError::Validation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Validation(format!(
                "{} returned {}",
                self.endpoint, status
            )));
        }

        let reply: ValidationReply = response
            .json()
            .await
            .map_err(|e| AgentError::Validation(format!("invalid response body: {e}")))?;

        Ok(ValidatedText {
            text: reply.validated_text.unwrap_or_else(|| text.to_string()),
            audio_length: reply.audio_length,
        })
    }
}
