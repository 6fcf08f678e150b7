//! Periodic flush daemon.
//!
//! Every flush interval the current statistics are handed to the
//! [`ProgressRecorder`]. A failed flush is logged and retried on the next
//! interval. The control loops never wait on it.

use crate::agent::stats::StatsView;
use crate::error::PersistenceError;
use crate::game::GameInterface;
use crate::state::ProgressRecorder;
use crate::types::StatsSnapshot;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background flush daemon.
pub struct FlushDaemon {
    view: StatsView,
    recorder: Arc<dyn ProgressRecorder>,
    game: Option<Arc<dyn GameInterface>>,
    interval: Duration,
    flushes: u64,
    failures: u64,
}

impl FlushDaemon {
    pub fn new(view: StatsView, recorder: Arc<dyn ProgressRecorder>, interval: Duration) -> Self {
        Self {
            view,
            recorder,
            game: None,
            interval,
            flushes: 0,
            failures: 0,
        }
    }

    /// Also export and store the game save on each flush.
    pub fn with_saves(mut self, game: Arc<dyn GameInterface>) -> Self {
        self.game = Some(game);
        self
    }

    /// Run until `cancel` fires. The first flush happens one interval in.
    pub async fn run(mut self, cancel: CancellationToken) -> (u64, u64) {
        info!("Flush daemon started (every {:?})", self.interval);

        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.flush().await,
            }
        }

        info!(
            "Flush daemon stopped ({} flushes, {} failed)",
            self.flushes, self.failures
        );
        (self.flushes, self.failures)
    }

    /// One periodic flush. Never fails; errors are counted and logged.
    pub async fn flush(&mut self) {
        let stats = self.view.snapshot();
        match self.recorder.persist(&stats, Utc::now()).await {
            Ok(()) => {
                self.flushes += 1;
                debug!("Flushed stats ({} clicks, {} purchases)", stats.total_clicks, stats.total_purchases);
            }
            Err(e) => {
                self.failures += 1;
                warn!("Stats flush failed, retrying next interval: {}", e);
            }
        }

        if let Some(game) = &self.game {
            store_save(game.as_ref(), self.recorder.as_ref()).await;
        }
    }
}

/// Export the game save and hand it to the recorder, logging any failure.
pub async fn store_save(game: &dyn GameInterface, recorder: &dyn ProgressRecorder) {
    match game.export_save().await {
        Ok(Some(save)) => {
            if let Err(e) = recorder.store_save(&save, Utc::now()).await {
                warn!("Storing game save failed: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Game save export failed: {}", e),
    }
}

/// Persist with a bounded number of attempts. Used for the final flush.
pub async fn persist_with_retry(
    recorder: &dyn ProgressRecorder,
    stats: &StatsSnapshot,
    attempts: u32,
    backoff: Duration,
) -> Result<(), PersistenceError> {
    let mut attempt = 1;
    loop {
        match recorder.persist(stats, Utc::now()).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                warn!("Final flush attempt {}/{} failed: {}", attempt, attempts, e);
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::stats::spawn_stats_owner;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// Fails the first `fail_first` writes, then records.
    #[derive(Default)]
    struct Flaky {
        fail_first: u32,
        calls: Mutex<u32>,
        written: Mutex<Vec<StatsSnapshot>>,
    }

    #[async_trait]
    impl ProgressRecorder for Flaky {
        async fn persist(
            &self,
            stats: &StatsSnapshot,
            _recorded_at: DateTime<Utc>,
        ) -> Result<(), PersistenceError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.fail_first {
                return Err(PersistenceError::Store("disk full".into()));
            }
            self.written.lock().unwrap().push(stats.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_every_interval() {
        let (handle, view, _owner) = spawn_stats_owner();
        let recorder = Arc::new(Flaky::default());
        let daemon = FlushDaemon::new(view, recorder.clone(), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(daemon.run(cancel.clone()));

        handle.record_clicks(3);
        tokio::time::sleep(Duration::from_secs(185)).await;
        cancel.cancel();
        let (flushes, failures) = task.await.unwrap();

        assert_eq!((flushes, failures), (3, 0));
        let written = recorder.written.lock().unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0].total_clicks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_flush_is_retried_next_interval() {
        let (_handle, view, _owner) = spawn_stats_owner();
        let recorder = Arc::new(Flaky {
            fail_first: 1,
            ..Flaky::default()
        });
        let mut daemon = FlushDaemon::new(view, recorder.clone(), Duration::from_secs(60));
        daemon.flush().await;
        daemon.flush().await;
        assert_eq!((daemon.flushes, daemon.failures), (1, 1));
        assert_eq!(recorder.written.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn final_flush_retries_then_gives_up() {
        let stats = StatsSnapshot::default();

        let recovers = Flaky {
            fail_first: 2,
            ..Flaky::default()
        };
        persist_with_retry(&recovers, &stats, 3, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(*recovers.calls.lock().unwrap(), 3);

        let broken = Flaky {
            fail_first: 10,
            ..Flaky::default()
        };
        assert!(persist_with_retry(&broken, &stats, 3, Duration::from_millis(100))
            .await
            .is_err());
        assert_eq!(*broken.calls.lock().unwrap(), 3);
    }
}
