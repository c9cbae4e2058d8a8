use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::parameter::CollectedSlots;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("q_{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    New,
    Collecting,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Upper-case speaker label used when replaying context into prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into(), timestamp: Utc::now() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into(), timestamp: Utc::now() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: SessionId,
    pub service: String,
    pub character_id: String,
    pub channel: Option<String>,
    pub user_ref: Option<String>,
    pub status: SessionStatus,
    pub transcript: Vec<Turn>,
    pub parameters: CollectedSlots,
    /// Failed extraction attempts per parameter id.
    #[serde(default)]
    pub reprompts: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DialogueSession {
    pub fn new(service: impl Into<String>, character_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            service: service.into(),
            character_id: character_id.into(),
            channel: None,
            user_ref: None,
            status: SessionStatus::New,
            transcript: Vec::new(),
            parameters: CollectedSlots::new(),
            reprompts: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_user_ref(mut self, user_ref: Option<String>) -> Self {
        self.user_ref = user_ref;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn turns_by(&self, role: Role) -> usize {
        self.transcript.iter().filter(|turn| turn.role == role).count()
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp;
        self.transcript.push(turn);
    }

    /// The last `count` turns, oldest first.
    pub fn recent_turns(&self, count: usize) -> &[Turn] {
        let start = self.transcript.len().saturating_sub(count);
        &self.transcript[start..]
    }
}

/// Handed to the completion sink once every parameter of a session is answered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub session_id: SessionId,
    pub service: String,
    pub parameters: CollectedSlots,
    pub character_id: String,
    pub channel: Option<String>,
    pub user_ref: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionEvent {
    pub fn from_session(session: &DialogueSession) -> Self {
        Self {
            session_id: session.id.clone(),
            service: session.service.clone(),
            parameters: session.parameters.clone(),
            character_id: session.character_id.clone(),
            channel: session.channel.clone(),
            user_ref: session.user_ref.clone(),
            completed_at: Utc::now(),
        }
    }
}
