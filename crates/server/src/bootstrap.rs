use std::sync::Arc;

use enquiry_agent::{AgentRuntime, LlmClient, MockLlmClient, RuntimeSettings};
use enquiry_core::config::{AppConfig, ConfigError, LlmProvider};
use enquiry_core::{
    CharacterRegistry, DialogueMachine, DialoguePolicy, ParameterSchemaRegistry, RegistryError,
};
use enquiry_store::{InMemorySessionRepository, SessionRepository};
use thiserror::Error;
use tracing::{info, warn};

use crate::audit::TracingAuditSink;
use crate::llm::{GeminiClient, GeminiError};
use crate::webhook::{WebhookDispatcher, WebhookError};

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
    pub sessions: Arc<dyn SessionRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("character registry could not be loaded: {0}")]
    Registry(#[from] RegistryError),
    #[error("llm client could not be created: {0}")]
    Llm(#[from] GeminiError),
    #[error("webhook dispatcher could not be created: {0}")]
    Webhook(#[from] WebhookError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let characters = Arc::new(CharacterRegistry::open(&config.registry.characters_path)?);
    let schemas = Arc::new(ParameterSchemaRegistry::builtin());
    let configured = characters.services()?;
    let uncovered: Vec<&str> =
        schemas.services().filter(|service| !configured.iter().any(|c| c == service)).collect();
    if !uncovered.is_empty() {
        warn!(
            event_name = "system.bootstrap.uncovered_services",
            correlation_id = "bootstrap",
            services = %uncovered.join(","),
            "services without a character will reject new questionnaires"
        );
    }
    info!(
        event_name = "system.bootstrap.registry_loaded",
        correlation_id = "bootstrap",
        characters = configured.len(),
        path = %config.registry.characters_path.display(),
        "character registry loaded"
    );

    let llm = build_llm(&config)?;
    let machine = DialogueMachine::new(
        schemas,
        DialoguePolicy { max_reprompts: config.dialogue.max_reprompts },
    );
    let mut runtime = AgentRuntime::new(machine, characters, llm)
        .with_settings(RuntimeSettings {
            enable_guardrails: config.dialogue.enable_guardrails,
            enable_eq: config.dialogue.enable_eq,
            default_model: config.llm.model.clone(),
            temperature: config.llm.temperature,
        })
        .with_audit_sink(Arc::new(TracingAuditSink));

    if let Some(dispatcher) = WebhookDispatcher::from_config(&config.webhook)? {
        info!(
            event_name = "system.bootstrap.webhook_enabled",
            correlation_id = "bootstrap",
            url = %dispatcher.url(),
            signed = config.webhook.secret.is_some(),
            "completion webhook enabled"
        );
        runtime = runtime.with_completion_sink(Arc::new(dispatcher));
    }

    Ok(Application {
        config,
        runtime: Arc::new(runtime),
        sessions: Arc::new(InMemorySessionRepository::default()),
    })
}

fn build_llm(config: &AppConfig) -> Result<Arc<dyn LlmClient>, BootstrapError> {
    let client: Arc<dyn LlmClient> = match config.llm.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::from_config(&config.llm)?),
        LlmProvider::Mock => Arc::new(MockLlmClient),
    };
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        provider = client.name(),
        model = %config.llm.model,
        "text generation client ready"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use enquiry_core::config::{AppConfig, LlmProvider};

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};
    use crate::fixtures;

    #[test]
    fn bootstrap_wires_runtime_from_config() {
        let file = fixtures::characters_file();
        let mut config = AppConfig::default();
        config.registry.characters_path = file.path().to_path_buf();
        config.dialogue.enable_eq = false;
        config.llm.model = "gemini-test".to_owned();

        let app = bootstrap_with_config(config).expect("bootstrap should succeed");

        assert_eq!(app.runtime.llm_name(), "mock");
        assert!(!app.runtime.settings().enable_eq);
        assert_eq!(app.runtime.settings().default_model, "gemini-test");
        assert_eq!(app.runtime.characters().list().expect("characters").len(), 2);
    }

    #[test]
    fn bootstrap_fails_fast_without_registry_file() {
        let mut config = AppConfig::default();
        config.registry.characters_path = PathBuf::from("does/not/exist/characters.json");

        let result = bootstrap_with_config(config);

        assert!(matches!(result, Err(BootstrapError::Registry(_))));
    }

    #[test]
    fn gemini_provider_requires_api_key() {
        let file = fixtures::characters_file();
        let mut config = AppConfig::default();
        config.registry.characters_path = file.path().to_path_buf();
        config.llm.provider = LlmProvider::Gemini;

        let result = bootstrap_with_config(config);

        assert!(matches!(result, Err(BootstrapError::Llm(_))));
    }
}
