//! Configuration schema for agent.toml.

use crate::error::ConfigError;
use crate::types::{StrategyState, StrategyWeights};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound on the click frequency a session may request.
pub const MAX_CLICK_FREQUENCY: f64 = 30.0;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Human-readable label for sessions started with this config.
    pub name: String,

    /// Base URL of the local browser bridge.
    pub bridge_url: String,

    /// Clicks per second issued by the impulse loop.
    pub click_frequency: f64,

    /// Impulse loop tick period in milliseconds.
    pub impulse_tick_ms: u64,

    /// Claim bonus objects after each click burst.
    pub claim_bonuses: bool,

    /// Cap on bonus claims in a single impulse tick.
    pub max_bonus_claims_per_tick: u32,

    /// Decision loop period in milliseconds.
    pub decision_period_ms: u64,

    /// Seconds between strategy reviews.
    pub strategy_review_secs: u64,

    /// Largest fraction of current resources one purchase may cost.
    pub max_price_ratio: f64,

    /// Below this many resources no purchase is considered.
    pub minimal_threshold: f64,

    /// Per-owned-unit dampening of a producer's marginal value.
    pub dampening: f64,

    /// Production estimate for producers missing from the table.
    pub default_production_estimate: f64,

    /// Overrides and additions to the built-in production table, keyed by stable id.
    pub production_estimates: BTreeMap<String, f64>,

    /// Regime breakpoints and weights.
    pub strategy: StrategyTable,

    /// Session run time in seconds.
    pub session_duration_secs: u64,

    /// Seconds between progress flushes.
    pub flush_interval_secs: u64,

    /// Seconds between progress log lines.
    pub status_interval_secs: u64,

    /// Store the game's exported save with each flush.
    pub save_game_on_flush: bool,

    /// Seed for the decision RNG; random when unset.
    pub rng_seed: Option<u64>,

    /// Path to the SQLite progress store.
    pub db_path: String,

    /// Directory for end-of-session reports.
    pub reports_dir: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "idle-agent".into(),
            bridge_url: "http://127.0.0.1:8765".into(),
            click_frequency: 15.0,
            impulse_tick_ms: 100,
            claim_bonuses: true,
            max_bonus_claims_per_tick: 5,
            decision_period_ms: 2_000,
            strategy_review_secs: 30,
            max_price_ratio: 0.15,
            minimal_threshold: 10.0,
            dampening: 0.1,
            default_production_estimate: 1.0,
            production_estimates: BTreeMap::new(),
            strategy: StrategyTable::default(),
            session_duration_secs: 600,
            flush_interval_secs: 60,
            status_interval_secs: 30,
            save_game_on_flush: true,
            rng_seed: None,
            db_path: "~/.idle-agent/progress.db".into(),
            reports_dir: "~/.idle-agent/reports".into(),
            log_level: "info".into(),
        }
    }
}

/// Production-rate breakpoints and the weights used in each regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyTable {
    /// Production rate at which Bootstrap gives way to Balanced.
    pub balanced_from: f64,
    /// Production rate at which Balanced gives way to Scaling.
    pub scaling_from: f64,
    pub bootstrap: StrategyWeights,
    pub balanced: StrategyWeights,
    pub scaling: StrategyWeights,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            balanced_from: 100.0,
            scaling_from: 10_000.0,
            bootstrap: StrategyWeights::new(0.8, 0.2),
            balanced: StrategyWeights::new(0.5, 0.5),
            scaling: StrategyWeights::new(0.3, 0.7),
        }
    }
}

impl StrategyTable {
    /// Regime for a production rate.
    pub fn classify(&self, production_rate: f64) -> StrategyState {
        if production_rate < self.balanced_from {
            StrategyState::Bootstrap
        } else if production_rate < self.scaling_from {
            StrategyState::Balanced
        } else {
            StrategyState::Scaling
        }
    }

    pub fn weights(&self, state: StrategyState) -> StrategyWeights {
        match state {
            StrategyState::Bootstrap => self.bootstrap,
            StrategyState::Balanced => self.balanced,
            StrategyState::Scaling => self.scaling,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.balanced_from.is_finite() && self.balanced_from >= 0.0) {
            return Err(ConfigError::new(
                "strategy.balanced_from",
                "must be a non-negative number",
            ));
        }
        if !(self.scaling_from.is_finite() && self.scaling_from > self.balanced_from) {
            return Err(ConfigError::new(
                "strategy.scaling_from",
                "must be greater than strategy.balanced_from",
            ));
        }
        for (field, weights) in [
            ("strategy.bootstrap", self.bootstrap),
            ("strategy.balanced", self.balanced),
            ("strategy.scaling", self.scaling),
        ] {
            if !weights.is_valid() {
                return Err(ConfigError::new(field, "weights must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}

impl AgentConfig {
    /// Reject configurations a session must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.click_frequency > 0.0 && self.click_frequency <= MAX_CLICK_FREQUENCY) {
            return Err(ConfigError::new(
                "click_frequency",
                format!("must be in (0, {MAX_CLICK_FREQUENCY}]"),
            ));
        }
        if self.impulse_tick_ms == 0 {
            return Err(ConfigError::new("impulse_tick_ms", "must be positive"));
        }
        if self.decision_period_ms == 0 {
            return Err(ConfigError::new("decision_period_ms", "must be positive"));
        }
        if self.strategy_review_secs == 0 {
            return Err(ConfigError::new("strategy_review_secs", "must be positive"));
        }
        if !(self.max_price_ratio > 0.0 && self.max_price_ratio <= 1.0) {
            return Err(ConfigError::new("max_price_ratio", "must be in (0, 1]"));
        }
        if !(self.minimal_threshold.is_finite() && self.minimal_threshold >= 0.0) {
            return Err(ConfigError::new(
                "minimal_threshold",
                "must be a non-negative number",
            ));
        }
        if !(self.dampening.is_finite() && self.dampening >= 0.0) {
            return Err(ConfigError::new("dampening", "must be a non-negative number"));
        }
        if !(self.default_production_estimate.is_finite() && self.default_production_estimate > 0.0)
        {
            return Err(ConfigError::new(
                "default_production_estimate",
                "must be a positive number",
            ));
        }
        if let Some((id, _)) = self
            .production_estimates
            .iter()
            .find(|(_, v)| !(v.is_finite() && **v >= 0.0))
        {
            return Err(ConfigError::new(
                "production_estimates",
                format!("estimate for '{id}' must be a non-negative number"),
            ));
        }
        if self.session_duration_secs == 0 {
            return Err(ConfigError::new("session_duration_secs", "must be positive"));
        }
        if self.flush_interval_secs == 0 {
            return Err(ConfigError::new("flush_interval_secs", "must be positive"));
        }
        if self.status_interval_secs == 0 {
            return Err(ConfigError::new("status_interval_secs", "must be positive"));
        }
        self.strategy.validate()
    }

    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved database path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    /// Resolved reports directory.
    pub fn resolved_reports_dir(&self) -> String {
        self.resolve_path(&self.reports_dir)
    }

    pub fn impulse_tick(&self) -> Duration {
        Duration::from_millis(self.impulse_tick_ms)
    }

    pub fn decision_period(&self) -> Duration {
        Duration::from_millis(self.decision_period_ms)
    }

    pub fn review_cadence(&self) -> Duration {
        Duration::from_secs(self.strategy_review_secs)
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_duration_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}
