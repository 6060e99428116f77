//! Client for the hosted messages API used for scoring, summaries and the
//! connectivity check.

use std::time::Duration;

use curator_logging::{curator_debug, curator_warn};
use serde::{Deserialize, Serialize};

use crate::types::{map_reqwest_error, FailureKind, ServiceError};

pub const API_VERSION: &str = "2023-06-01";
pub const CONNECTIVITY_PROMPT: &str = "Test message. Respond with just \"OK\".";

/// Endpoints, models and limits of the external services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub messages_base_url: String,
    pub speech_base_url: String,
    pub scoring_model: String,
    pub scoring_max_tokens: u32,
    pub summary_model: String,
    pub summary_max_tokens: u32,
    pub connectivity_max_tokens: u32,
    pub voice_id: String,
    pub speech_model: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub summary_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            messages_base_url: "https://api.anthropic.com".to_string(),
            speech_base_url: "https://api.elevenlabs.io".to_string(),
            scoring_model: "claude-3-haiku-20240307".to_string(),
            scoring_max_tokens: 50,
            summary_model: "claude-3-5-sonnet-20241022".to_string(),
            summary_max_tokens: 800,
            connectivity_max_tokens: 10,
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            speech_model: "eleven_monolingual_v1".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            summary_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// One completion request.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub prompt: &'a str,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MessagesClient {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl MessagesClient {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Sends a single user message and returns the trimmed text of the first content block.
    pub async fn complete(
        &self,
        api_key: &str,
        completion: Completion<'_>,
    ) -> Result<String, ServiceError> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::missing_credential("messages API"));
        }
        let url = format!(
            "{}/v1/messages",
            self.settings.messages_base_url.trim_end_matches('/')
        );
        let body = MessagesRequest {
            model: completion.model,
            max_tokens: completion.max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: completion.prompt,
            }],
        };

        curator_debug!(
            "messages request model={} max_tokens={} prompt_len={}",
            completion.model,
            completion.max_tokens,
            completion.prompt.len()
        );
        let response = self
            .client
            .post(url)
            .timeout(completion.timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            curator_warn!("messages API returned {}: {}", status, message);
            return Err(ServiceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|err| {
            ServiceError::new(FailureKind::MalformedResponse, err.to_string())
        })?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                ServiceError::new(FailureKind::MalformedResponse, "response has no text content")
            })
    }

    /// Minimal request proving the credential is accepted.
    pub async fn test_connection(&self, api_key: &str) -> Result<(), ServiceError> {
        let completion = Completion {
            model: &self.settings.scoring_model,
            max_tokens: self.settings.connectivity_max_tokens,
            prompt: CONNECTIVITY_PROMPT,
            timeout: self.settings.request_timeout,
        };
        self.complete(api_key, completion).await.map(|_| ())
    }
}
