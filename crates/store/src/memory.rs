use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use enquiry_core::{DialogueSession, SessionId};

use crate::{RepositoryError, SessionRepository, TurnGuard};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, DialogueSession>>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemorySessionRepository {
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<DialogueSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn save(&self, session: DialogueSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.0.clone(), session);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DialogueSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<DialogueSession> = sessions.values().cloned().collect();
        all.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(all)
    }

    async fn lock_turn(&self, id: &SessionId) -> TurnGuard {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            locks.entry(id.0.clone()).or_default().clone()
        };
        TurnGuard::acquire(lock).await
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        let removed = before - sessions.len();

        let mut locks = self.turn_locks.lock().await;
        locks.retain(|id, lock| sessions.contains_key(id) || Arc::strong_count(lock) > 1);

        if removed > 0 {
            debug!(event_name = "store.sessions.purged", removed, "idle sessions purged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use enquiry_core::{DialogueSession, SessionId};

    use crate::{InMemorySessionRepository, SessionRepository};

    #[tokio::test]
    async fn in_memory_session_repo_round_trip() {
        let repo = InMemorySessionRepository::default();
        let session = DialogueSession::new("painting", "paint-meera");

        repo.save(session.clone()).await.expect("save session");
        let found = repo.find_by_id(&session.id).await.expect("find session");

        assert_eq!(found, Some(session));
        assert_eq!(
            repo.find_by_id(&SessionId("q_missing".to_owned())).await.expect("lookup"),
            None
        );
    }

    #[tokio::test]
    async fn purge_removes_only_idle_sessions() {
        let repo = InMemorySessionRepository::default();
        let mut stale = DialogueSession::new("painting", "paint-meera");
        stale.updated_at = Utc::now() - chrono::Duration::minutes(90);
        let fresh = DialogueSession::new("solar_services", "solar-asha");
        repo.save(stale.clone()).await.expect("save stale");
        repo.save(fresh.clone()).await.expect("save fresh");

        let removed = repo
            .purge_idle(Utc::now() - chrono::Duration::minutes(45))
            .await
            .expect("purge");

        assert_eq!(removed, 1);
        assert_eq!(repo.find_by_id(&stale.id).await.expect("lookup"), None);
        assert!(repo.find_by_id(&fresh.id).await.expect("lookup").is_some());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn turn_lock_serialises_same_session() {
        let repo = Arc::new(InMemorySessionRepository::default());
        let id = SessionId("q_lock".to_owned());

        let guard = repo.lock_turn(&id).await;
        let contender = {
            let repo = repo.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = repo.lock_turn(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second turn proceeds once the first releases")
            .expect("task joins");
    }

    #[tokio::test]
    async fn different_sessions_do_not_block_each_other() {
        let repo = InMemorySessionRepository::default();
        let _first = repo.lock_turn(&SessionId("q_a".to_owned())).await;

        tokio::time::timeout(Duration::from_millis(200), repo.lock_turn(&SessionId("q_b".to_owned())))
            .await
            .expect("independent session lock");
    }
}
