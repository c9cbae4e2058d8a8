use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};

use enquiry_core::audit::{
    AuditCategory, AuditContext, AuditOutcome, AuditSink, NoopAuditSink,
};
use enquiry_core::flows::{Capture, FlowTransitionError};
use enquiry_core::{
    Character, CharacterRegistry, CompletionEvent, DialogueMachine, DialogueSession,
    ParameterDefinition, RegistryError, Role, SlotExtractor, Turn,
};

use crate::extraction::RuleExtractor;
use crate::llm::{LlmClient, TextRequest};
use crate::prompt::{compose_enquiry_prompt, compose_turn_prompt};
use crate::sanitizer::{sanitize_assistant, strip_option_phrases};
use crate::{eq, guardrails};

pub const COMPLETION_MESSAGE: &str = "Thank you! All details captured.";

/// Receives completion events. Implementations must not block the turn.
pub trait CompletionSink: Send + Sync {
    fn notify(&self, event: &CompletionEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCompletionSink;

impl CompletionSink for NoopCompletionSink {
    fn notify(&self, _event: &CompletionEvent) {}
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeSettings {
    pub enable_guardrails: bool,
    pub enable_eq: bool,
    pub default_model: String,
    pub temperature: f32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            enable_guardrails: true,
            enable_eq: true,
            default_model: "gemini-1.5-flash".to_owned(),
            temperature: 0.35,
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("message text is required")]
    EmptyMessage,
    #[error("unknown service `{0}`")]
    UnknownService(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
    #[error("text generation failed: {0}")]
    Generation(anyhow::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionStart {
    pub session: DialogueSession,
    pub character_name: String,
    pub opening: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReplyKind {
    Question { parameter: ParameterDefinition, text: String },
    Completed { event: CompletionEvent, text: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnReply {
    pub session: DialogueSession,
    pub capture: Capture,
    pub kind: ReplyKind,
}

impl TurnReply {
    pub fn text(&self) -> &str {
        match &self.kind {
            ReplyKind::Question { text, .. } | ReplyKind::Completed { text, .. } => text,
        }
    }
}

/// Runs one dialogue turn end to end: slot capture, question generation, cleanup,
/// guardrail repair and empathy.
pub struct AgentRuntime {
    machine: DialogueMachine,
    characters: Arc<CharacterRegistry>,
    llm: Arc<dyn LlmClient>,
    extractor: Arc<dyn SlotExtractor>,
    completions: Arc<dyn CompletionSink>,
    audit: Arc<dyn AuditSink>,
    settings: RuntimeSettings,
    rng: Mutex<StdRng>,
}

impl AgentRuntime {
    pub fn new(
        machine: DialogueMachine,
        characters: Arc<CharacterRegistry>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            machine,
            characters,
            llm,
            extractor: Arc::new(RuleExtractor),
            completions: Arc::new(NoopCompletionSink),
            audit: Arc::new(NoopAuditSink),
            settings: RuntimeSettings::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SlotExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_completion_sink(mut self, completions: Arc<dyn CompletionSink>) -> Self {
        self.completions = completions;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn machine(&self) -> &DialogueMachine {
        &self.machine
    }

    pub fn characters(&self) -> &CharacterRegistry {
        &self.characters
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn llm_name(&self) -> &'static str {
        self.llm.name()
    }

    /// New session bound to the service's character. No question is asked yet; the
    /// first user message only starts the conversation.
    pub fn start(
        &self,
        service: &str,
        channel: Option<String>,
        user_ref: Option<String>,
    ) -> Result<SessionStart, RuntimeError> {
        if !self.machine.registry().contains_service(service) {
            return Err(RuntimeError::UnknownService(service.to_owned()));
        }
        let character = self.characters.pick(service).map_err(|error| match error {
            RegistryError::UnknownService(service) => RuntimeError::UnknownService(service),
            other => RuntimeError::Registry(other),
        })?;

        let session = DialogueSession::new(service, character.id.clone())
            .with_channel(channel)
            .with_user_ref(user_ref);

        info!(
            event_name = "dialogue.session.started",
            session_id = %session.id,
            service = %service,
            character_id = %character.id,
            "dialogue session started"
        );

        Ok(SessionStart {
            opening: character.opening_phrase().to_owned(),
            character_name: character.name.clone(),
            session,
        })
    }

    pub async fn handle_message(
        &self,
        session: &DialogueSession,
        text: &str,
        audit: &AuditContext,
    ) -> Result<TurnReply, RuntimeError> {
        if text.trim().is_empty() {
            return Err(RuntimeError::EmptyMessage);
        }

        let advance = self.machine.advance_with_audit(
            session,
            text,
            self.extractor.as_ref(),
            self.audit.as_ref(),
            audit,
        )?;
        let mut next = advance.session;

        if let Some(event) = advance.completion {
            next.push_turn(Turn::assistant(COMPLETION_MESSAGE));
            self.completions.notify(&event);
            info!(
                event_name = "dialogue.session.completed",
                session_id = %next.id,
                service = %next.service,
                correlation_id = %audit.correlation_id,
                parameters = next.parameters.len(),
                "all parameters collected"
            );
            return Ok(TurnReply {
                session: next,
                capture: advance.capture,
                kind: ReplyKind::Completed { event, text: COMPLETION_MESSAGE.to_owned() },
            });
        }

        let parameter = match advance.next_parameter {
            Some(parameter) => parameter,
            None => {
                return Err(RuntimeError::Flow(FlowTransitionError::MissingParameters {
                    missing_parameters: Vec::new(),
                }))
            }
        };

        let character = self.characters.pick(&next.service)?;
        let system = format!(
            "{}\n\n{}",
            compose_enquiry_prompt(&character, &guardrails::preamble(&character)),
            compose_turn_prompt(&character, &next, &parameter)
        );
        let user = next.transcript.iter().map(|turn| turn.text.as_str()).collect::<Vec<_>>();
        let request = TextRequest {
            model: character
                .routing
                .model
                .clone()
                .unwrap_or_else(|| self.settings.default_model.clone()),
            system,
            user: user.join("\n"),
            temperature: self.settings.temperature,
        };

        let generated = self.llm.generate(request).await.map_err(RuntimeError::Generation)?;
        let mut reply = self.polish(&character, &generated, &parameter, text, audit);
        if next.turns_by(Role::Assistant) == 0 {
            reply = format!("{}\n\n{reply}", character.introduction());
        }
        next.push_turn(Turn::assistant(reply.clone()));

        info!(
            event_name = "dialogue.turn.asked",
            session_id = %next.id,
            service = %next.service,
            correlation_id = %audit.correlation_id,
            parameter = %parameter.id,
            "next parameter requested"
        );

        Ok(TurnReply {
            session: next,
            capture: advance.capture,
            kind: ReplyKind::Question { parameter, text: reply },
        })
    }

    fn polish(
        &self,
        character: &Character,
        generated: &str,
        parameter: &ParameterDefinition,
        user_text: &str,
        audit: &AuditContext,
    ) -> String {
        let mut text = strip_option_phrases(&sanitize_assistant(generated), &parameter.options);

        if self.settings.enable_guardrails {
            let repair = guardrails::smart_repair(&text);
            if repair.changed {
                let kinds: Vec<&str> =
                    repair.violations.iter().map(|violation| violation.kind.tag()).collect();
                warn!(
                    event_name = "guardrail.repaired",
                    correlation_id = %audit.correlation_id,
                    violations = %kinds.join(","),
                    "generated reply repaired"
                );
                self.audit.emit(
                    audit
                        .event("guardrail.repaired", AuditCategory::Guardrail, AuditOutcome::Success)
                        .with_metadata("violations", kinds.join(",")),
                );
                text = repair.repaired;
            }
        }

        if self.settings.enable_eq {
            text = match self.rng.lock() {
                Ok(mut rng) => eq::empathize(&character.eq, user_text, &text, &mut *rng),
                Err(poisoned) => {
                    eq::empathize(&character.eq, user_text, &text, &mut *poisoned.into_inner())
                }
            };
        }

        text
    }
}
