use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use enquiry_store::{RepositoryError, SessionRepository};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Removes sessions idle for longer than `ttl`.
pub async fn sweep_once(
    sessions: &dyn SessionRepository,
    ttl: chrono::Duration,
) -> Result<usize, RepositoryError> {
    sessions.purge_idle(Utc::now() - ttl).await
}

/// A quarter of the TTL, capped at one minute.
pub fn interval_for(ttl_minutes: u64) -> Duration {
    (Duration::from_secs(ttl_minutes.saturating_mul(60)) / 4)
        .clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL)
}

pub fn spawn(sessions: Arc<dyn SessionRepository>, ttl_minutes: u64) -> JoinHandle<()> {
    let minutes = i64::try_from(ttl_minutes).unwrap_or(i64::MAX).min(MAX_TTL_MINUTES);
    let ttl = chrono::Duration::minutes(minutes);
    let every = interval_for(ttl_minutes);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep_once(sessions.as_ref(), ttl).await {
                Ok(0) => {}
                Ok(removed) => info!(
                    event_name = "store.sessions.expired",
                    correlation_id = "sweeper",
                    removed,
                    "idle sessions expired"
                ),
                Err(error) => warn!(
                    event_name = "store.sessions.sweep_failed",
                    correlation_id = "sweeper",
                    error = %error,
                    "session sweep failed"
                ),
            }
        }
    })
}
