use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::session::SessionStatus;
use crate::flows::states::{FlowAction, FlowContext, FlowEvent, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> SessionStatus;
    fn transition(
        &self,
        current: &SessionStatus,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// `New -> Collecting -> Completed`, with `Completed` terminal.
#[derive(Clone, Debug, Default)]
pub struct DialogueFlow;

impl FlowDefinition for DialogueFlow {
    fn initial_state(&self) -> SessionStatus {
        SessionStatus::New
    }

    fn transition(
        &self,
        current: &SessionStatus,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_dialogue(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> SessionStatus {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &SessionStatus,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &SessionStatus,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    audit
                        .event(
                            "dialogue.transition_applied",
                            AuditCategory::Flow,
                            AuditOutcome::Success,
                        )
                        .with_metadata("from", format!("{:?}", outcome.from))
                        .with_metadata("to", format!("{:?}", outcome.to))
                        .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event(
                            "dialogue.transition_rejected",
                            AuditCategory::Flow,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<DialogueFlow> {
    fn default() -> Self {
        Self::new(DialogueFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("cannot complete session while parameters are unanswered: {missing_parameters:?}")]
    MissingParameters { missing_parameters: Vec<String> },
    #[error("session is already completed")]
    SessionCompleted,
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: SessionStatus, event: FlowEvent },
}

fn transition_dialogue(
    current: &SessionStatus,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        AskNextParameter, MarkCompleted, NotifyCompletion, RecordAnswer, RecordPlaceholder,
        RepeatQuestion,
    };
    use FlowEvent::{
        AllParametersCollected, AnswerCaptured, AnswerUnresolved, ConversationStarted,
        RepromptLimitReached,
    };
    use SessionStatus::{Collecting, Completed, New};

    let more_to_ask = !context.missing_parameters.is_empty();
    let (to, actions) = match (current, event) {
        (Completed, _) => return Err(FlowTransitionError::SessionCompleted),
        (New, ConversationStarted) => (Collecting, vec![AskNextParameter]),
        (Collecting, AnswerCaptured) => {
            let mut actions = vec![RecordAnswer];
            if more_to_ask {
                actions.push(AskNextParameter);
            }
            (Collecting, actions)
        }
        (Collecting, RepromptLimitReached) => {
            let mut actions = vec![RecordPlaceholder];
            if more_to_ask {
                actions.push(AskNextParameter);
            }
            (Collecting, actions)
        }
        (Collecting, AnswerUnresolved) => (Collecting, vec![RepeatQuestion]),
        (Collecting, AllParametersCollected) => {
            if more_to_ask {
                return Err(FlowTransitionError::MissingParameters {
                    missing_parameters: context.missing_parameters.clone(),
                });
            }
            (Completed, vec![MarkCompleted, NotifyCompletion])
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}
