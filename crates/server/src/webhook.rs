//! Completion webhook delivery.
//!
//! Completed sessions are POSTed as JSON to `webhook.url`. Failed attempts back off
//! exponentially from `initial_backoff_ms`. When `webhook.secret` is set the body is signed
//! with HMAC-SHA256 and the hex digest is sent in `X-Enquiry-Signature`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use enquiry_agent::CompletionSink;
use enquiry_core::config::WebhookConfig;
use enquiry_core::CompletionEvent;

pub const SIGNATURE_HEADER: &str = "X-Enquiry-Signature";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("could not build webhook client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("webhook payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("webhook secret is not a valid hmac key")]
    InvalidSecret,
    #[error("webhook delivery failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    url: String,
    secret: Option<SecretString>,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl WebhookDispatcher {
    pub fn new(
        url: impl Into<String>,
        secret: Option<SecretString>,
        max_attempts: u32,
        initial_backoff: Duration,
    ) -> Result<Self, WebhookError> {
        let client =
            Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(WebhookError::Client)?;
        Ok(Self { client, url: url.into(), secret, max_attempts: max_attempts.max(1), initial_backoff })
    }

    /// `None` when no webhook URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>, WebhookError> {
        let Some(url) = config.url.as_deref().filter(|url| !url.trim().is_empty()) else {
            return Ok(None);
        };
        Self::new(
            url,
            config.secret.clone(),
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
        )
        .map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delivers one event, retrying until a 2xx response. Returns the attempts used.
    pub async fn deliver(&self, event: &CompletionEvent) -> Result<u32, WebhookError> {
        let body = serde_json::to_vec(event)?;
        let signature = match &self.secret {
            Some(secret) => Some(sign(secret.expose_secret().as_bytes(), &body)?),
            None => None,
        };

        let mut backoff = self.initial_backoff;
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            let mut request = self
                .client
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
            if let Some(signature) = &signature {
                request = request.header(SIGNATURE_HEADER, signature);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(attempt),
                Ok(response) => last_error = format!("status {}", response.status()),
                Err(error) => last_error = error.to_string(),
            }

            warn!(
                event_name = "webhook.delivery.retry",
                session_id = %event.session_id,
                attempt,
                error = %last_error,
                "webhook attempt failed"
            );
            if attempt < self.max_attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(WebhookError::Exhausted { attempts: self.max_attempts, last_error })
    }
}

impl CompletionSink for WebhookDispatcher {
    fn notify(&self, event: &CompletionEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                event_name = "webhook.delivery.skipped",
                session_id = %event.session_id,
                "no async runtime available for webhook delivery"
            );
            return;
        };

        let dispatcher = self.clone();
        let event = event.clone();
        handle.spawn(async move {
            match dispatcher.deliver(&event).await {
                Ok(attempts) => info!(
                    event_name = "webhook.delivery.succeeded",
                    session_id = %event.session_id,
                    service = %event.service,
                    attempts,
                    "completion webhook delivered"
                ),
                Err(error) => warn!(
                    event_name = "webhook.delivery.failed",
                    session_id = %event.session_id,
                    service = %event.service,
                    error = %error,
                    "completion webhook dropped"
                ),
            }
        });
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(body);
    Ok(encode_hex(mac.finalize().into_bytes().as_slice()))
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
