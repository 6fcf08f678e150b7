//! One agent session: both control loops, the stats owner and the flush
//! daemon, supervised until the deadline or an external stop.

use crate::agent::impulse::ImpulseLoop;
use crate::agent::loop_::DecisionLoop;
use crate::agent::stats::{spawn_stats_owner, StatsView};
use crate::config::AgentConfig;
use crate::error::ConfigError;
use crate::game::GameInterface;
use crate::heartbeat::{persist_with_retry, store_save, FlushDaemon};
use crate::state::{Database, ProgressRecorder, SqliteRecorder, LAST_SESSION_KEY};
use crate::types::SessionOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const FINAL_FLUSH_ATTEMPTS: u32 = 3;
const FINAL_FLUSH_BACKOFF: Duration = Duration::from_millis(500);

pub struct Session {
    id: String,
    config: AgentConfig,
    game: Arc<dyn GameInterface>,
    recorder: Arc<dyn ProgressRecorder>,
}

impl Session {
    /// Fails on an invalid configuration; nothing has started yet.
    pub fn new(
        id: impl Into<String>,
        config: AgentConfig,
        game: Arc<dyn GameInterface>,
        recorder: Arc<dyn ProgressRecorder>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id: id.into(),
            config,
            game,
            recorder,
        })
    }

    /// Run until the configured duration elapses or `cancel` fires, then
    /// stop both loops at their iteration boundaries and flush the final
    /// statistics.
    ///
    /// Only an unreachable game at startup is an error. A final flush that
    /// keeps failing is reported in the outcome, not raised.
    pub async fn run(self, cancel: CancellationToken) -> Result<SessionOutcome> {
        let Self {
            id,
            config,
            game,
            recorder,
        } = self;

        game.ready()
            .await
            .context("Game interface not reachable at session start")?;

        let started_at = Utc::now();
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "Session {} started: {:.1} clicks/s, decision every {:?}, {:?} budget",
            id,
            config.click_frequency,
            config.decision_period(),
            config.session_duration()
        );

        let (stats, view, owner) = spawn_stats_owner();
        let loops = cancel.child_token();

        let impulse = ImpulseLoop::new(&config, game.clone(), stats.clone());
        let impulse_task = tokio::spawn(impulse.run(loops.clone()));

        let decision = DecisionLoop::new(&config, game.clone(), stats.clone(), rng);
        let decision_task = tokio::spawn(decision.run(loops.clone()));
        drop(stats);

        let mut flusher = FlushDaemon::new(view.clone(), recorder.clone(), config.flush_interval());
        if config.save_game_on_flush {
            flusher = flusher.with_saves(game.clone());
        }
        let flush_task = tokio::spawn(flusher.run(loops.clone()));

        supervise(&view, &cancel, config.session_duration(), config.status_interval()).await;
        loops.cancel();

        if let Err(e) = impulse_task.await {
            error!("Impulse loop task failed: {}", e);
        }
        if let Err(e) = decision_task.await {
            error!("Decision loop task failed: {}", e);
        }
        if let Err(e) = flush_task.await {
            error!("Flush task failed: {}", e);
        }

        // Every handle is gone, so the owner has applied every event.
        let final_stats = match owner.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Stats owner task failed: {}", e);
                view.snapshot()
            }
        };

        let final_flush_ok = match persist_with_retry(
            recorder.as_ref(),
            &final_stats,
            FINAL_FLUSH_ATTEMPTS,
            FINAL_FLUSH_BACKOFF,
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("Final stats flush failed: {}", e);
                false
            }
        };
        if config.save_game_on_flush {
            store_save(game.as_ref(), recorder.as_ref()).await;
        }

        let ended_at = Utc::now();
        info!(
            "Session {} finished: {} clicks, {} purchases, {} bonuses, {} strategy changes",
            id,
            final_stats.total_clicks,
            final_stats.total_purchases,
            final_stats.bonuses_claimed,
            final_stats.strategy_change_count
        );

        Ok(SessionOutcome {
            session_id: id,
            started_at,
            ended_at,
            final_stats,
            final_flush_ok,
        })
    }
}

/// Play one session recorded into `db`.
///
/// The game is checked before any session row is written, and a started
/// session is always closed, even when the run fails.
pub async fn run_recorded(
    db: Arc<Mutex<Database>>,
    config: AgentConfig,
    game: Arc<dyn GameInterface>,
    cancel: CancellationToken,
) -> Result<SessionOutcome> {
    config.validate()?;
    game.ready()
        .await
        .context("Game interface not reachable at session start")?;

    let config_json = serde_json::to_string(&config).context("Failed to serialize config")?;
    let session_id = {
        let db = db.lock().await;
        let id = db.begin_session(Utc::now(), &config_json)?;
        db.kv_set(LAST_SESSION_KEY, &id)?;
        id
    };

    let recorder: Arc<dyn ProgressRecorder> = Arc::new(SqliteRecorder::new(db.clone(), session_id.clone()));
    let result = match Session::new(session_id.clone(), config, game, recorder) {
        Ok(session) => session.run(cancel).await,
        Err(e) => Err(e.into()),
    };

    let ended_at = match &result {
        Ok(outcome) => outcome.ended_at,
        Err(_) => Utc::now(),
    };
    if let Err(e) = db.lock().await.end_session(&session_id, ended_at) {
        error!("Failed to close session {}: {}", session_id, e);
    }
    result
}

/// Wait for the deadline or an external stop, logging progress meanwhile.
async fn supervise(view: &StatsView, cancel: &CancellationToken, budget: Duration, every: Duration) {
    let deadline = tokio::time::sleep(budget);
    tokio::pin!(deadline);

    let mut status = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    status.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Stop requested; winding down session");
                return;
            }
            _ = &mut deadline => {
                info!("Session time budget reached");
                return;
            }
            _ = status.tick() => {
                let s = view.snapshot();
                info!(
                    "[{}] resources {:.0} (+{:.1}/s), {} clicks, {} purchases, {} bonuses",
                    s.strategy, s.resources, s.production_rate, s.total_clicks, s.total_purchases, s.bonuses_claimed
                );
            }
        }
    }
}
