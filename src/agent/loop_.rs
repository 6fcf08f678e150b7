//! Decision loop: Observe → Review → Decide → Act.
//!
//! Every cycle:
//! 1. Reads a fresh resource snapshot
//! 2. Reviews the strategy if its cadence has elapsed
//! 3. Lists producers and upgrades
//! 4. Runs the decision engine with the current weights
//! 5. Dispatches at most one purchase
//! 6. Sleeps the decision period

use crate::agent::snapshot::SnapshotReader;
use crate::agent::stats::StatsHandle;
use crate::config::AgentConfig;
use crate::error::GameError;
use crate::game::GameInterface;
use crate::strategy::{DecisionEngine, StrategyController};
use crate::types::{Decision, PurchasableItem, StrategyState};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one decision cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Nothing worth buying.
    Idle,
    Purchased(PurchasableItem),
    /// The game refused: the item went unaffordable or disabled after listing.
    Rejected(PurchasableItem),
}

pub struct DecisionLoop<R> {
    game: Arc<dyn GameInterface>,
    stats: StatsHandle,
    engine: DecisionEngine,
    controller: StrategyController,
    reader: SnapshotReader,
    rng: R,
    period: Duration,
}

impl<R: Rng + Send> DecisionLoop<R> {
    pub fn new(config: &AgentConfig, game: Arc<dyn GameInterface>, stats: StatsHandle, rng: R) -> Self {
        Self {
            game,
            stats,
            engine: DecisionEngine::from_config(config),
            controller: StrategyController::from_config(config),
            reader: SnapshotReader::new(),
            rng,
            period: config.decision_period(),
        }
    }

    pub fn strategy(&self) -> StrategyState {
        self.controller.state()
    }

    /// Run until `cancel` fires. A cycle in progress always completes,
    /// and a failed cycle never ends the loop.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Decision loop started (period {:?})", self.period);

        let mut consecutive_errors: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.iteration().await {
                Ok(outcome) => {
                    consecutive_errors = 0;
                    debug!("Decision cycle: {:?}", outcome);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!("Decision cycle failed ({} in a row): {}", consecutive_errors, e);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        info!("Decision loop stopped (strategy: {})", self.controller.state());
    }

    /// One full cycle.
    pub async fn iteration(&mut self) -> Result<CycleOutcome, GameError> {
        let snapshot = self.reader.read(self.game.as_ref()).await?;
        self.stats.observed(&snapshot);

        let now = Instant::now();
        if self.controller.review_due(now) {
            if let Some(transition) = self.controller.review(snapshot.production_rate, now) {
                self.stats.strategy_changed(transition.to);
            }
        }

        let producers = self.game.list_producers().await?;
        let upgrades = self.game.list_upgrades().await?;

        let decision = self.engine.decide(
            &snapshot,
            &producers,
            &upgrades,
            self.controller.weights(),
            &mut self.rng,
        );

        let item = match decision {
            Decision::None => return Ok(CycleOutcome::Idle),
            Decision::BuyProducer(item) | Decision::BuyUpgrade(item) => item,
        };

        if self.game.purchase(&item).await? {
            self.stats.purchased(&item);
            info!(
                "Bought {} '{}' for {:.0} (had {:.0}, owned {})",
                item.category, item.display_name, item.price, snapshot.resources, item.owned_count
            );
            Ok(CycleOutcome::Purchased(item))
        } else {
            warn!(
                "Purchase of {} '{}' rejected: no longer affordable or enabled",
                item.category, item.display_name
            );
            Ok(CycleOutcome::Rejected(item))
        }
    }
}
