//! Conversation agent for the enquiry service.
//!
//! The dialogue machine in `enquiry-core` decides which parameter to ask next. This crate
//! does everything around that decision:
//! - reads a slot value out of the user's reply (`extraction`)
//! - composes prompts for the text-generation collaborator (`prompt`, `llm`)
//! - cleans and repairs the generated question (`sanitizer`, `guardrails`)
//! - adds empathy when the user shows an emotional signal (`eq`)
//!
//! `runtime::AgentRuntime` wires these together for a single turn.
//!
//! The language model only phrases questions. It never chooses the parameter or decides
//! when a session is complete.

pub mod eq;
pub mod extraction;
pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod sanitizer;
mod text;

pub use extraction::RuleExtractor;
pub use llm::{LlmClient, MockLlmClient, ScriptedLlmClient, TextRequest};
pub use runtime::{
    AgentRuntime, CompletionSink, NoopCompletionSink, ReplyKind, RuntimeError, RuntimeSettings,
    SessionStart, TurnReply,
};
