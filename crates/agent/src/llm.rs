use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Text-generation collaborator. Network access, retries and timeouts belong to the
/// implementation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: TextRequest) -> Result<String>;
}

/// Offline provider: asks about whatever label the turn prompt focuses on.
#[derive(Clone, Debug, Default)]
pub struct MockLlmClient;

const FOCUS_MARKER: &str = "question about \"";

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: TextRequest) -> Result<String> {
        let focus = request
            .system
            .rfind(FOCUS_MARKER)
            .map(|start| &request.system[start + FOCUS_MARKER.len()..])
            .and_then(|rest| rest.split_once('"'))
            .map(|(label, _)| label.trim())
            .filter(|label| !label.is_empty());

        Ok(match focus {
            Some(label) => format!("Thanks, that helps. Could you share your {label}?"),
            None => "Thanks, that helps. Could you tell me a little more?".to_owned(),
        })
    }
}

/// Replays canned replies in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<TextRequest>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TextRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: TextRequest) -> Result<String> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
        let next = match self.replies.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.ok_or_else(|| anyhow::anyhow!("scripted client has no replies left"))
    }
}

#[cfg(test)]
mod tests {
    use super::{LlmClient, MockLlmClient, ScriptedLlmClient, TextRequest};

    fn request(system: &str) -> TextRequest {
        TextRequest {
            model: "mock".to_owned(),
            system: system.to_owned(),
            user: "hi".to_owned(),
            temperature: 0.35,
        }
    }

    #[tokio::test]
    async fn mock_asks_about_focus_label() {
        let reply = MockLlmClient
            .generate(request("2) Then ask ONE concise question about \"Roof Type\" (short)"))
            .await
            .expect("mock reply");
        assert_eq!(reply, "Thanks, that helps. Could you share your Roof Type?");

        let fallback = MockLlmClient.generate(request("no focus")).await.expect("mock reply");
        assert!(fallback.ends_with("a little more?"));
    }

    #[tokio::test]
    async fn scripted_replays_in_order_then_errors() {
        let client = ScriptedLlmClient::new(["first", "second"]);

        assert_eq!(client.generate(request("a")).await.expect("first"), "first");
        assert_eq!(client.generate(request("b")).await.expect("second"), "second");
        assert!(client.generate(request("c")).await.is_err());
        assert_eq!(client.requests().len(), 3);
    }
}
