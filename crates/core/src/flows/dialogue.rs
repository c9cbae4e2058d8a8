use std::sync::Arc;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink, NoopAuditSink};
use crate::domain::parameter::{CollectedSlots, ParameterDefinition, SlotValue};
use crate::domain::session::{CompletionEvent, DialogueSession, SessionStatus, Turn};
use crate::flows::engine::{DialogueFlow, FlowEngine, FlowTransitionError};
use crate::flows::states::{FlowContext, FlowEvent, TransitionOutcome};
use crate::parameters::ParameterSchemaRegistry;

/// Stored when a parameter exhausts its reprompt budget.
pub const PLACEHOLDER_ANSWER: &str = "Not provided";

/// Turns a raw user reply into a value for the parameter that was just asked.
pub trait SlotExtractor: Send + Sync {
    fn extract(&self, service: &str, parameter_id: &str, raw_text: &str) -> Option<SlotValue>;
}

/// First parameter in declared order without an answer.
pub fn first_unanswered<'a>(
    registry: &'a ParameterSchemaRegistry,
    service: &str,
    collected: &CollectedSlots,
) -> Option<&'a ParameterDefinition> {
    registry.parameters(service).iter().find(|parameter| !collected.is_answered(&parameter.id))
}

pub fn next_missing_parameter<'a>(
    registry: &'a ParameterSchemaRegistry,
    service: &str,
    collected: &CollectedSlots,
) -> Option<&'a str> {
    first_unanswered(registry, service, collected).map(|parameter| parameter.id.as_str())
}

pub fn missing_parameters(
    registry: &ParameterSchemaRegistry,
    service: &str,
    collected: &CollectedSlots,
) -> Vec<String> {
    registry
        .parameters(service)
        .iter()
        .filter(|parameter| !collected.is_answered(&parameter.id))
        .map(|parameter| parameter.id.clone())
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DialoguePolicy {
    /// Failed answers tolerated per parameter before the placeholder is stored.
    pub max_reprompts: Option<u32>,
}

/// What happened to the user's reply in this turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capture {
    /// First message of the session; only starts the conversation.
    Trigger,
    Captured { parameter_id: String, value: SlotValue },
    Unresolved { parameter_id: String, attempts: u32 },
    Placeholder { parameter_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnAdvance {
    pub session: DialogueSession,
    pub capture: Capture,
    /// The parameter to ask next, `None` once the session completed.
    pub next_parameter: Option<ParameterDefinition>,
    pub completion: Option<CompletionEvent>,
    pub transitions: Vec<TransitionOutcome>,
}

impl TurnAdvance {
    pub fn is_completed(&self) -> bool {
        self.completion.is_some()
    }
}

pub struct DialogueMachine {
    registry: Arc<ParameterSchemaRegistry>,
    policy: DialoguePolicy,
    engine: FlowEngine<DialogueFlow>,
}

impl DialogueMachine {
    pub fn new(registry: Arc<ParameterSchemaRegistry>, policy: DialoguePolicy) -> Self {
        Self { registry, policy, engine: FlowEngine::default() }
    }

    pub fn registry(&self) -> &ParameterSchemaRegistry {
        &self.registry
    }

    pub fn policy(&self) -> DialoguePolicy {
        self.policy
    }

    pub fn next_parameter(&self, session: &DialogueSession) -> Option<&ParameterDefinition> {
        first_unanswered(&self.registry, &session.service, &session.parameters)
    }

    /// Applies one user turn to a copy of `session`. The input session is left untouched.
    pub fn advance(
        &self,
        session: &DialogueSession,
        user_text: &str,
        extractor: &dyn SlotExtractor,
    ) -> Result<TurnAdvance, FlowTransitionError> {
        let audit = AuditContext::new(Some(session.id.clone()), None, "unassigned", "dialogue");
        self.advance_with_audit(session, user_text, extractor, &NoopAuditSink, &audit)
    }

    pub fn advance_with_audit(
        &self,
        session: &DialogueSession,
        user_text: &str,
        extractor: &dyn SlotExtractor,
        sink: &dyn AuditSink,
        audit: &AuditContext,
    ) -> Result<TurnAdvance, FlowTransitionError> {
        if session.status == SessionStatus::Completed {
            return Err(FlowTransitionError::SessionCompleted);
        }

        let mut next = session.clone();
        next.push_turn(Turn::user(user_text));
        let mut transitions = Vec::new();

        let (event, capture) = match next.status {
            SessionStatus::New => (FlowEvent::ConversationStarted, Capture::Trigger),
            _ => match first_unanswered(&self.registry, &next.service, &next.parameters) {
                Some(parameter) => self.capture(&mut next, parameter, user_text, extractor),
                // Nothing left to ask; fall through to completion below.
                None => (FlowEvent::AllParametersCollected, Capture::Trigger),
            },
        };

        if event != FlowEvent::AllParametersCollected {
            let outcome = self.engine.apply_with_audit(
                &next.status,
                &event,
                &self.context(&next),
                sink,
                audit,
            )?;
            next.status = outcome.to;
            transitions.push(outcome);
        }

        if let Capture::Unresolved { parameter_id, attempts } = &capture {
            sink.emit(
                audit
                    .event(
                        "dialogue.answer_unresolved",
                        AuditCategory::Extraction,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("parameter", parameter_id.clone())
                    .with_metadata("attempts", attempts.to_string()),
            );
        }

        let mut completion = None;
        let next_parameter =
            first_unanswered(&self.registry, &next.service, &next.parameters).cloned();
        if next_parameter.is_none() {
            let outcome = self.engine.apply_with_audit(
                &next.status,
                &FlowEvent::AllParametersCollected,
                &FlowContext::default(),
                sink,
                audit,
            )?;
            next.status = outcome.to;
            transitions.push(outcome);
            completion = Some(CompletionEvent::from_session(&next));
        }

        Ok(TurnAdvance { session: next, capture, next_parameter, completion, transitions })
    }

    fn capture(
        &self,
        session: &mut DialogueSession,
        parameter: &ParameterDefinition,
        user_text: &str,
        extractor: &dyn SlotExtractor,
    ) -> (FlowEvent, Capture) {
        let parameter_id = parameter.id.clone();

        if let Some(value) = extractor.extract(&session.service, &parameter_id, user_text) {
            session.parameters.set(parameter_id.clone(), value.clone());
            session.reprompts.remove(&parameter_id);
            return (FlowEvent::AnswerCaptured, Capture::Captured { parameter_id, value });
        }

        let attempts = {
            let counter = session.reprompts.entry(parameter_id.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        match self.policy.max_reprompts {
            Some(cap) if attempts >= cap => {
                session.parameters.set(parameter_id.clone(), SlotValue::text(PLACEHOLDER_ANSWER));
                session.reprompts.remove(&parameter_id);
                (FlowEvent::RepromptLimitReached, Capture::Placeholder { parameter_id })
            }
            _ => (FlowEvent::AnswerUnresolved, Capture::Unresolved { parameter_id, attempts }),
        }
    }

    fn context(&self, session: &DialogueSession) -> FlowContext {
        FlowContext {
            missing_parameters: missing_parameters(
                &self.registry,
                &session.service,
                &session.parameters,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        missing_parameters, next_missing_parameter, Capture, DialogueMachine, DialoguePolicy,
        SlotExtractor, PLACEHOLDER_ANSWER,
    };
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::parameter::{CollectedSlots, SlotValue};
    use crate::domain::session::{DialogueSession, Role, SessionStatus};
    use crate::flows::engine::FlowTransitionError;
    use crate::parameters::ParameterSchemaRegistry;

    /// Accepts any non-blank reply verbatim, rejects "???".
    struct EchoExtractor;

    impl SlotExtractor for EchoExtractor {
        fn extract(&self, _service: &str, _parameter_id: &str, raw: &str) -> Option<SlotValue> {
            let trimmed = raw.trim();
            (!trimmed.is_empty() && trimmed != "???").then(|| SlotValue::text(trimmed))
        }
    }

    fn machine(max_reprompts: Option<u32>) -> DialogueMachine {
        DialogueMachine::new(
            Arc::new(ParameterSchemaRegistry::builtin()),
            DialoguePolicy { max_reprompts },
        )
    }

    #[test]
    fn next_missing_follows_declared_order_for_every_prefix() {
        let registry = ParameterSchemaRegistry::builtin();
        for service in registry.services() {
            let parameters = registry.parameters(service);
            let mut slots = CollectedSlots::new();
            for (index, parameter) in parameters.iter().enumerate() {
                assert_eq!(
                    next_missing_parameter(&registry, service, &slots),
                    Some(parameter.id.as_str()),
                    "{service} prefix {index}"
                );
                slots.set(parameter.id.clone(), SlotValue::text("answered"));
            }
            assert_eq!(next_missing_parameter(&registry, service, &slots), None);
            assert!(missing_parameters(&registry, service, &slots).is_empty());
        }
    }

    #[test]
    fn next_missing_is_positional_not_semantic() {
        let registry = ParameterSchemaRegistry::builtin();
        let mut slots = CollectedSlots::new();
        slots.set("roofTypeOrientation", SlotValue::text("Metal sheet roof"));

        assert_eq!(next_missing_parameter(&registry, "solar_services", &slots), Some("propertyType"));
    }

    #[test]
    fn first_message_is_only_a_trigger() {
        let machine = machine(None);
        let session = DialogueSession::new("solar_services", "solar-asha");

        let advance =
            machine.advance(&session, "hi, I want solar", &EchoExtractor).expect("advance");

        assert_eq!(advance.capture, Capture::Trigger);
        assert_eq!(advance.session.status, SessionStatus::Collecting);
        assert!(advance.session.parameters.is_empty());
        assert_eq!(advance.next_parameter.map(|p| p.id), Some("propertyType".to_owned()));
        assert_eq!(advance.session.turns_by(Role::User), 1);
        assert_eq!(session.status, SessionStatus::New, "input session stays untouched");
    }

    #[test]
    fn unresolved_answer_keeps_asking_same_parameter() {
        let machine = machine(None);
        let mut session = DialogueSession::new("painting", "painting-meera");
        session.status = SessionStatus::Collecting;

        for attempt in 1..=5u32 {
            let advance = machine.advance(&session, "???", &EchoExtractor).expect("advance");
            assert_eq!(
                advance.capture,
                Capture::Unresolved { parameter_id: "propertyType".to_owned(), attempts: attempt }
            );
            assert_eq!(advance.next_parameter.map(|p| p.id), Some("propertyType".to_owned()));
            session = advance.session;
        }
    }

    #[test]
    fn reprompt_cap_stores_placeholder_and_moves_on() {
        let machine = machine(Some(2));
        let mut session = DialogueSession::new("painting", "painting-meera");
        session.status = SessionStatus::Collecting;

        let first = machine.advance(&session, "???", &EchoExtractor).expect("first");
        let second = machine.advance(&first.session, "???", &EchoExtractor).expect("second");

        assert_eq!(second.capture, Capture::Placeholder { parameter_id: "propertyType".to_owned() });
        assert_eq!(
            second.session.parameters.get("propertyType"),
            Some(&SlotValue::text(PLACEHOLDER_ANSWER))
        );
        assert_eq!(second.next_parameter.map(|p| p.id), Some("interiorOrExterior".to_owned()));
        assert!(second.session.reprompts.is_empty());
    }

    #[test]
    fn final_answer_completes_session_with_event() {
        let machine = machine(None);
        let registry = ParameterSchemaRegistry::builtin();
        let mut session = DialogueSession::new("painting", "painting-meera");
        session.status = SessionStatus::Collecting;
        let parameters = registry.parameters("painting");
        for parameter in &parameters[..parameters.len() - 1] {
            session.parameters.set(parameter.id.clone(), SlotValue::text("x"));
        }

        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some(session.id.clone()), None, "req-9", "dialogue");
        let advance = machine
            .advance_with_audit(&session, "Brand agnostic", &EchoExtractor, &sink, &audit)
            .expect("advance");

        assert!(advance.is_completed());
        assert_eq!(advance.session.status, SessionStatus::Completed);
        assert!(advance.next_parameter.is_none());
        let completion = advance.completion.expect("completion event");
        assert_eq!(completion.session_id, session.id);
        assert_eq!(
            completion.parameters.get("budgetBrandFlexibility"),
            Some(&SlotValue::text("Brand agnostic"))
        );
        assert_eq!(advance.transitions.len(), 2);
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn completed_session_rejects_further_turns() {
        let machine = machine(None);
        let mut session = DialogueSession::new("painting", "painting-meera");
        session.status = SessionStatus::Completed;

        let error = machine.advance(&session, "one more thing", &EchoExtractor).expect_err("terminal");
        assert_eq!(error, FlowTransitionError::SessionCompleted);
    }
}
