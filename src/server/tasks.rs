use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, instrument};

use crate::db::services::places_cache_service;
use crate::search::SearchSessions;

/// Periodically purges expired places-cache rows.
pub struct PlacesCacheJanitor {
    db_pool: DatabaseConnection,
}

impl PlacesCacheJanitor {
    pub fn new(db_pool: DatabaseConnection) -> Self {
        Self { db_pool }
    }

    pub async fn run_periodic_tasks(self: Arc<Self>, interval_duration: Duration) {
        info!(
            "Starting places cache cleanup with interval: {:?}",
            interval_duration
        );
        let mut interval = time::interval(interval_duration);

        loop {
            interval.tick().await;
            if let Err(e) = self.purge_expired().await {
                error!("Places cache cleanup failed: {}", e);
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, sea_orm::DbErr> {
        let removed = places_cache_service::cleanup_expired_cache(&self.db_pool, Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Removed expired places cache entries.");
        }
        Ok(removed)
    }
}

/// Periodically drops search sessions that have sat idle too long.
pub struct SearchSessionSweeper {
    sessions: Arc<SearchSessions>,
    max_idle: Duration,
}

impl SearchSessionSweeper {
    pub fn new(sessions: Arc<SearchSessions>, max_idle: Duration) -> Self {
        Self { sessions, max_idle }
    }

    pub async fn run_periodic_tasks(self: Arc<Self>, interval_duration: Duration) {
        info!(
            "Starting search session sweep with interval: {:?}, max idle: {:?}",
            interval_duration, self.max_idle
        );
        let mut interval = time::interval(interval_duration);

        loop {
            interval.tick().await;
            self.sweep();
        }
    }

    pub fn sweep(&self) -> usize {
        let removed = self.sessions.evict_idle(self.max_idle);
        if removed > 0 {
            info!(removed, remaining = self.sessions.len(), "Evicted idle search sessions.");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::types::SearchParams;
    use crate::search::SearchPhase;

    fn params() -> SearchParams {
        SearchParams {
            query: Some("tacos".to_string()),
            location: None,
            radius: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_drops_sessions_left_idle() {
        let sessions = Arc::new(SearchSessions::new());
        sessions.begin("alice", params());
        let sweeper = Arc::new(SearchSessionSweeper::new(
            sessions.clone(),
            Duration::from_secs(60),
        ));
        let handle = tokio::spawn(sweeper.clone().run_periodic_tasks(Duration::from_secs(30)));

        time::sleep(Duration::from_secs(45)).await;
        // Reading a session keeps it alive.
        assert_eq!(sessions.snapshot("alice").phase(), SearchPhase::Searching);
        time::sleep(Duration::from_secs(45)).await;
        assert_eq!(sessions.len(), 1);

        time::sleep(Duration::from_secs(60)).await;
        assert!(sessions.is_empty());
        handle.abort();
    }
}
