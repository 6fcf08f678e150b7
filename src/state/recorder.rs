//! Durable sink for statistics flushes.
//!
//! SQLite writes are offloaded via `spawn_blocking` so the control loops
//! never wait on disk I/O.

use crate::error::PersistenceError;
use crate::state::Database;
use crate::types::StatsSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where statistics flushes go.
#[async_trait]
pub trait ProgressRecorder: Send + Sync {
    /// Append one snapshot. Earlier records are never modified.
    async fn persist(
        &self,
        stats: &StatsSnapshot,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Keep an exported game save next to the statistics.
    async fn store_save(&self, _save: &str, _saved_at: DateTime<Utc>) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Records into one session of the progress database.
pub struct SqliteRecorder {
    db: Arc<Mutex<Database>>,
    session_id: String,
}

impl SqliteRecorder {
    pub fn new(db: Arc<Mutex<Database>>, session_id: impl Into<String>) -> Self {
        Self {
            db,
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl ProgressRecorder for SqliteRecorder {
    async fn persist(
        &self,
        stats: &StatsSnapshot,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let db = self.db.clone();
        let session_id = self.session_id.clone();
        let stats = stats.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.blocking_lock();
            db.append_stats(&session_id, &stats, recorded_at)
        })
        .await??;
        Ok(())
    }

    async fn store_save(&self, save: &str, saved_at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let db = self.db.clone();
        let session_id = self.session_id.clone();
        let save = save.to_string();
        tokio::task::spawn_blocking(move || {
            let db = db.blocking_lock();
            db.append_save(&session_id, &save, saved_at)
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_into_the_session() {
        let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
        let session = db.lock().await.begin_session(Utc::now(), "{}").unwrap();
        let recorder = SqliteRecorder::new(db.clone(), session.clone());

        let stats = StatsSnapshot {
            total_clicks: 42,
            ..StatsSnapshot::default()
        };
        recorder.persist(&stats, Utc::now()).await.unwrap();
        recorder.store_save("{}", Utc::now()).await.unwrap();

        let db = db.lock().await;
        assert_eq!(db.latest_stats(&session).unwrap().unwrap().stats.total_clicks, 42);
        assert_eq!(db.latest_save(&session).unwrap().as_deref(), Some("{}"));
    }
}
