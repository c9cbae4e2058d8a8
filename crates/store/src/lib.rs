//! Session persistence for the enquiry service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use enquiry_core::{DialogueSession, SessionId};

pub mod memory;

pub use memory::InMemorySessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("session `{0}` was not found")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Held for the duration of one turn so two messages for the same session never race.
pub struct TurnGuard {
    _guard: OwnedMutexGuard<()>,
}

impl TurnGuard {
    pub(crate) async fn acquire(lock: Arc<Mutex<()>>) -> Self {
        Self { _guard: lock.lock_owned().await }
    }
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<DialogueSession>, RepositoryError>;

    async fn save(&self, session: DialogueSession) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<DialogueSession>, RepositoryError>;

    /// Serialises turns per session id.
    async fn lock_turn(&self, id: &SessionId) -> TurnGuard;

    /// Drops sessions not updated since `cutoff`; returns how many were removed.
    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, RepositoryError>;
}
