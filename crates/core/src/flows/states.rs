use serde::{Deserialize, Serialize};

use crate::domain::session::SessionStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    /// First user message of a session; never treated as an answer.
    ConversationStarted,
    AnswerCaptured,
    AnswerUnresolved,
    RepromptLimitReached,
    AllParametersCollected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    /// Unanswered parameter ids in question order, evaluated after the event's slot update.
    pub missing_parameters: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    AskNextParameter,
    RecordAnswer,
    RecordPlaceholder,
    RepeatQuestion,
    MarkCompleted,
    NotifyCompletion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
