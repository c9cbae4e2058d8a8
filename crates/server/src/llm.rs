//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use enquiry_agent::{LlmClient, TextRequest};
use enquiry_core::config::LlmConfig;

const MAX_OUTPUT_TOKENS: u32 = 2048;
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("gemini api key is not configured")]
    MissingApiKey,
    #[error("could not build gemini http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("gemini request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("gemini returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("gemini response carried no text")]
    EmptyResponse,
}

impl GeminiError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::EmptyResponse => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::MissingApiKey | Self::Client(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u64,
}

pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, GeminiError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }
        let client = Client::builder().timeout(timeout).build().map_err(GeminiError::Client)?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            max_retries,
            initial_backoff: Duration::from_millis(500),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GeminiError> {
        let api_key = config.api_key.clone().ok_or(GeminiError::MissingApiKey)?;
        Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    #[cfg(test)]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1/models/{model}:generateContent", self.base_url)
    }

    async fn call_once(&self, request: &TextRequest) -> Result<String, GeminiError> {
        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request_body(request))
            .send()
            .await
            .map_err(GeminiError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status { status, body });
        }

        let payload: GenerateContentResponse =
            response.json().await.map_err(GeminiError::Transport)?;
        let tokens = payload.usage_metadata.as_ref().map(|usage| usage.total_token_count);
        let text = first_text(payload).ok_or(GeminiError::EmptyResponse)?;

        info!(
            event_name = "llm.gemini.response",
            model = %request.model,
            text_length = text.len(),
            total_tokens = tokens.unwrap_or_default(),
            "gemini response received"
        );
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, request: TextRequest) -> anyhow::Result<String> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;
        loop {
            match self.call_once(&request).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "llm.gemini.retry",
                        model = %request.model,
                        attempt,
                        error = %error,
                        "gemini call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

fn request_body(request: &TextRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_owned()),
            parts: vec![Part { text: Some(format!("{}\n\n{}", request.system, request.user)) }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            top_p: 0.95,
            top_k: 40,
        },
    }
}

fn first_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.text)
        .filter(|text| !text.trim().is_empty())
}
