//! Shared types used across the agent runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// Immutable view of the game's two gauges, taken once per decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub resources: f64,
    pub production_rate: f64,
    pub taken_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    pub fn new(resources: f64, production_rate: f64) -> Self {
        Self {
            resources,
            production_rate,
            taken_at: Utc::now(),
        }
    }

    /// Highest price a single purchase may carry under the given ratio.
    pub fn spend_cap(&self, max_price_ratio: f64) -> f64 {
        self.resources * max_price_ratio
    }
}

// ---------------------------------------------------------------------------
// Purchasable items
// ---------------------------------------------------------------------------

/// Which shelf an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Adds continuous passive production.
    Producer,
    /// One-time effect, usually multiplicative.
    Upgrade,
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// A producer or upgrade as currently listed by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasableItem {
    /// Stable identifier (never the display text).
    pub id: String,
    pub display_name: String,
    pub price: f64,
    pub owned_count: u32,
    pub category: ItemCategory,
    pub enabled: bool,
}

impl PurchasableItem {
    pub fn producer(id: &str, display_name: &str, price: f64, owned_count: u32) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            price,
            owned_count,
            category: ItemCategory::Producer,
            enabled: true,
        }
    }

    pub fn upgrade(id: &str, display_name: &str, price: f64) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            price,
            owned_count: 0,
            category: ItemCategory::Upgrade,
            enabled: true,
        }
    }

    /// Same item with a different `enabled` flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enabled and priced within `cap`.
    pub fn is_candidate(&self, cap: f64) -> bool {
        self.enabled && self.price <= cap
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Bernoulli probabilities for preferring producers and upgrades.
///
/// The two values are independent and need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub producer_bias: f64,
    pub upgrade_bias: f64,
}

impl StrategyWeights {
    pub const fn new(producer_bias: f64, upgrade_bias: f64) -> Self {
        Self {
            producer_bias,
            upgrade_bias,
        }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.producer_bias) && (0.0..=1.0).contains(&self.upgrade_bias)
    }
}

/// Production regimes the strategy controller moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyState {
    /// Early game: mostly producers.
    Bootstrap,
    /// Mid game: even split.
    Balanced,
    /// Late game: upgrades carry most of the growth.
    Scaling,
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Balanced => write!(f, "balanced"),
            Self::Scaling => write!(f, "scaling"),
        }
    }
}

impl Default for StrategyState {
    fn default() -> Self {
        Self::Bootstrap
    }
}

/// A strategy review that actually moved the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StrategyState,
    pub to: StrategyState,
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Outcome of one decision cycle: at most one purchase.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    None,
    BuyProducer(PurchasableItem),
    BuyUpgrade(PurchasableItem),
}

impl Decision {
    pub fn item(&self) -> Option<&PurchasableItem> {
        match self {
            Self::None => None,
            Self::BuyProducer(item) | Self::BuyUpgrade(item) => Some(item),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate statistics
// ---------------------------------------------------------------------------

/// Point-in-time copy of the session's aggregate statistics.
///
/// Counters only ever grow during a session. `resources`,
/// `production_rate` and `strategy` are gauges reflecting the most
/// recent observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_clicks: u64,
    pub total_purchases: u64,
    pub bonuses_claimed: u64,
    pub strategy_change_count: u64,
    pub upgrades_bought: u64,
    #[serde(default)]
    pub purchases_by_item: BTreeMap<String, u64>,
    pub resources: f64,
    pub production_rate: f64,
    pub strategy: StrategyState,
}

impl StatsSnapshot {
    /// True if every counter in `self` is at least its value in `earlier`.
    pub fn dominates(&self, earlier: &StatsSnapshot) -> bool {
        self.total_clicks >= earlier.total_clicks
            && self.total_purchases >= earlier.total_purchases
            && self.bonuses_claimed >= earlier.bonuses_claimed
            && self.strategy_change_count >= earlier.strategy_change_count
            && self.upgrades_bought >= earlier.upgrades_bought
            && earlier
                .purchases_by_item
                .iter()
                .all(|(id, n)| self.purchases_by_item.get(id).copied().unwrap_or(0) >= *n)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What a finished session hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub final_stats: StatsSnapshot,
    /// Whether the final flush reached the progress recorder.
    pub final_flush_ok: bool,
}

/// A persisted stats record as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRecord {
    pub id: String,
    pub session_id: String,
    pub stats: StatsSnapshot,
    pub recorded_at: DateTime<Utc>,
}

/// A session row from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub config_json: String,
}
