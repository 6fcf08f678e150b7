//! Strategy controller: picks purchase weights from the production regime.
//!
//! States:
//!   Bootstrap  rate < balanced_from                  producers first
//!   Balanced   balanced_from <= rate < scaling_from  even split
//!   Scaling    rate >= scaling_from                  upgrades first
//!
//! Reviews run on their own wall-clock cadence, not every decision
//! cycle. Any state can be reached from any other; there is no terminal
//! state.

use crate::config::{AgentConfig, StrategyTable};
use crate::types::{StrategyState, StrategyWeights, Transition};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

pub const DEFAULT_REVIEW_CADENCE: Duration = Duration::from_secs(30);

/// Regime state machine with review scheduling.
#[derive(Debug, Clone)]
pub struct StrategyController {
    table: StrategyTable,
    state: StrategyState,
    cadence: Duration,
    last_review: Option<Instant>,
}

impl Default for StrategyController {
    fn default() -> Self {
        Self::new(StrategyTable::default(), DEFAULT_REVIEW_CADENCE)
    }
}

impl StrategyController {
    pub fn new(table: StrategyTable, cadence: Duration) -> Self {
        Self {
            table,
            state: StrategyState::Bootstrap,
            cadence,
            last_review: None,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.strategy.clone(), config.review_cadence())
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    /// Weights for the current state.
    pub fn weights(&self) -> StrategyWeights {
        self.table.weights(self.state)
    }

    /// Target state for a production rate. Pure.
    pub fn classify(&self, production_rate: f64) -> StrategyState {
        self.table.classify(production_rate)
    }

    /// Whether a review is owed at `now`. The first one is owed immediately.
    pub fn review_due(&self, now: Instant) -> bool {
        match self.last_review {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cadence,
        }
    }

    /// Move to the state `production_rate` calls for.
    ///
    /// Returns the transition if the state changed; a review landing on
    /// the current state is a no-op. Callers count the returned
    /// transitions, so each real change is counted once.
    pub fn review(&mut self, production_rate: f64, now: Instant) -> Option<Transition> {
        self.last_review = Some(now);
        let target = self.classify(production_rate);
        if target == self.state {
            return None;
        }
        let transition = Transition {
            from: self.state,
            to: target,
        };
        self.state = target;
        info!(
            "Strategy {} -> {} at {:.1}/s (weights: producers {:.2}, upgrades {:.2})",
            transition.from,
            transition.to,
            production_rate,
            self.weights().producer_bias,
            self.weights().upgrade_bias,
        );
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_bootstrap() {
        let c = StrategyController::default();
        assert_eq!(c.state(), StrategyState::Bootstrap);
        assert_eq!(c.weights(), StrategyWeights::new(0.8, 0.2));
    }

    #[test]
    fn regimes_map_to_weights() {
        let now = Instant::now();
        let mut c = StrategyController::default();

        c.review(50.0, now);
        assert_eq!(c.state(), StrategyState::Bootstrap);
        assert_eq!(c.weights(), StrategyWeights::new(0.8, 0.2));

        c.review(5_000.0, now);
        assert_eq!(c.state(), StrategyState::Balanced);
        assert_eq!(c.weights(), StrategyWeights::new(0.5, 0.5));

        c.review(50_000.0, now);
        assert_eq!(c.state(), StrategyState::Scaling);
        assert_eq!(c.weights(), StrategyWeights::new(0.3, 0.7));
    }

    #[test]
    fn repeated_reviews_yield_one_transition() {
        let now = Instant::now();
        let mut c = StrategyController::default();
        assert!(c.review(5_000.0, now).is_some());
        for _ in 0..10 {
            assert!(c.review(5_000.0, now).is_none());
            assert_eq!(c.state(), StrategyState::Balanced);
        }
    }

    #[test]
    fn same_state_review_is_not_a_change() {
        let mut c = StrategyController::default();
        assert!(c.review(10.0, Instant::now()).is_none());
        assert_eq!(c.state(), StrategyState::Bootstrap);
    }

    #[test]
    fn drop_in_rate_demotes() {
        let now = Instant::now();
        let mut c = StrategyController::default();
        assert!(c.review(20_000.0, now).is_some());
        let t = c.review(150.0, now).unwrap();
        assert_eq!(t.from, StrategyState::Scaling);
        assert_eq!(t.to, StrategyState::Balanced);
        assert!(c.review(1.0, now).is_some());
        assert_eq!(c.state(), StrategyState::Bootstrap);
    }

    #[test]
    fn classify_is_pure() {
        let c = StrategyController::default();
        for rate in [0.0, 99.0, 100.0, 9_999.9, 10_000.0, 1e12] {
            assert_eq!(c.classify(rate), c.classify(rate));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn review_follows_cadence() {
        let mut c = StrategyController::new(StrategyTable::default(), Duration::from_secs(30));
        assert!(c.review_due(Instant::now()));
        c.review(0.0, Instant::now());
        assert!(!c.review_due(Instant::now()));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!c.review_due(Instant::now()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(c.review_due(Instant::now()));
    }
}
