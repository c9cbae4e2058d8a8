pub mod audit;
pub mod characters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod parameters;

pub use characters::{CharacterRegistry, RegistryError};
pub use domain::character::{Character, EqConfig};
pub use domain::parameter::{CollectedSlots, ParameterDefinition, ParameterType, SlotValue};
pub use domain::session::{
    CompletionEvent, DialogueSession, Role, SessionId, SessionStatus, Turn,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{DialogueMachine, DialoguePolicy, SlotExtractor, TurnAdvance};
pub use parameters::ParameterSchemaRegistry;
