pub mod dialogue;
pub mod engine;
pub mod states;

pub use dialogue::{
    first_unanswered, missing_parameters, next_missing_parameter, Capture, DialogueMachine,
    DialoguePolicy, SlotExtractor, TurnAdvance, PLACEHOLDER_ANSWER,
};
pub use engine::{DialogueFlow, FlowDefinition, FlowEngine, FlowTransitionError};
pub use states::{FlowAction, FlowContext, FlowEvent, TransitionOutcome};
