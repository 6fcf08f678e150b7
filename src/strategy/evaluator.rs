//! Efficiency scoring for producers.
//!
//! A score balances three things: what a producer is expected to add to
//! the production rate, what it costs, and whether it is affordable right
//! now. Scores are advisory and recomputed from a fresh snapshot every
//! cycle.

use crate::config::AgentConfig;
use crate::types::{PurchasableItem, ResourceSnapshot};
use std::collections::HashMap;

/// Built-in base production per stable producer id.
pub const BASE_PRODUCTION: &[(&str, f64)] = &[
    ("cursor", 0.1),
    ("grandma", 1.0),
    ("farm", 8.0),
    ("mine", 47.0),
    ("factory", 260.0),
    ("bank", 1_400.0),
    ("temple", 7_800.0),
    ("wizard_tower", 44_000.0),
    ("shipment", 260_000.0),
    ("alchemy_lab", 1_600_000.0),
    ("portal", 10_000_000.0),
    ("time_machine", 65_000_000.0),
    ("antimatter_condenser", 430_000_000.0),
];

pub const DEFAULT_DAMPENING: f64 = 0.1;
pub const DEFAULT_PRODUCTION_ESTIMATE: f64 = 1.0;

/// Scores purchasable items against a resource snapshot.
#[derive(Debug, Clone)]
pub struct EfficiencyEvaluator {
    dampening: f64,
    default_estimate: f64,
    estimates: HashMap<String, f64>,
}

impl Default for EfficiencyEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_DAMPENING, DEFAULT_PRODUCTION_ESTIMATE)
    }
}

impl EfficiencyEvaluator {
    /// Evaluator over the built-in production table.
    pub fn new(dampening: f64, default_estimate: f64) -> Self {
        let estimates = BASE_PRODUCTION
            .iter()
            .map(|(id, rate)| ((*id).to_string(), *rate))
            .collect();
        Self {
            dampening,
            default_estimate,
            estimates,
        }
    }

    /// Evaluator with the config's dampening, fallback and table overrides.
    pub fn from_config(config: &AgentConfig) -> Self {
        let mut evaluator = Self::new(config.dampening, config.default_production_estimate);
        for (id, rate) in &config.production_estimates {
            evaluator.estimates.insert(id.clone(), *rate);
        }
        evaluator
    }

    /// Base production for a stable id, falling back to the default.
    pub fn base_production_estimate(&self, item: &PurchasableItem) -> f64 {
        self.estimates
            .get(&item.id)
            .copied()
            .unwrap_or(self.default_estimate)
    }

    /// Marginal value multiplier for the next unit of an already-owned producer.
    pub fn owned_diminishing_factor(&self, owned_count: u32) -> f64 {
        1.0 / (1.0 + f64::from(owned_count) * self.dampening)
    }

    /// Efficiency score, always `>= 0`.
    ///
    /// Free items score 0 and are never preferred.
    pub fn score(&self, item: &PurchasableItem, snapshot: &ResourceSnapshot) -> f64 {
        if item.price <= 0.0 || !item.price.is_finite() {
            return 0.0;
        }
        let affordability = (snapshot.resources / item.price).min(1.0);
        let score = self.base_production_estimate(item)
            * self.owned_diminishing_factor(item.owned_count)
            / item.price
            * affordability;
        if score.is_finite() && score > 0.0 {
            score
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(resources: f64) -> ResourceSnapshot {
        ResourceSnapshot::new(resources, 0.0)
    }

    #[test]
    fn zero_resources_scores_zero() {
        let eval = EfficiencyEvaluator::default();
        for price in [1.0, 15.0, 1e9] {
            let item = PurchasableItem::producer("grandma", "Grandma", price, 3);
            assert_eq!(eval.score(&item, &snapshot(0.0)), 0.0);
        }
    }

    #[test]
    fn free_item_scores_zero() {
        let eval = EfficiencyEvaluator::default();
        let item = PurchasableItem::producer("portal", "Portal", 0.0, 0);
        assert_eq!(eval.score(&item, &snapshot(1e12)), 0.0);
        let negative = PurchasableItem::producer("portal", "Portal", -5.0, 0);
        assert_eq!(eval.score(&negative, &snapshot(1e12)), 0.0);
    }

    #[test]
    fn more_owned_never_scores_higher() {
        let eval = EfficiencyEvaluator::default();
        let snap = snapshot(500.0);
        let mut previous = f64::INFINITY;
        for owned in 0..50 {
            let item = PurchasableItem::producer("farm", "Farm", 120.0, owned);
            let score = eval.score(&item, &snap);
            assert!(score <= previous, "owned={owned}: {score} > {previous}");
            previous = score;
        }
    }

    #[test]
    fn unknown_id_uses_default_estimate() {
        let eval = EfficiencyEvaluator::default();
        let item = PurchasableItem::producer("you", "You", 50.0, 0);
        assert_eq!(eval.base_production_estimate(&item), 1.0);
        assert!(eval.score(&item, &snapshot(200.0)) > 0.0);
    }

    #[test]
    fn cheaper_producer_wins_at_equal_estimate() {
        let eval = EfficiencyEvaluator::default();
        let snap = snapshot(200.0);
        let a = PurchasableItem::producer("a", "A", 100.0, 0);
        let b = PurchasableItem::producer("b", "B", 50.0, 0);
        assert!((eval.score(&a, &snap) - 0.01).abs() < 1e-12);
        assert!((eval.score(&b, &snap) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn unaffordable_item_is_penalized() {
        let eval = EfficiencyEvaluator::default();
        let item = PurchasableItem::producer("farm", "Farm", 1_000.0, 0);
        let full = eval.score(&item, &snapshot(1_000.0));
        let half = eval.score(&item, &snapshot(500.0));
        assert!((half - full / 2.0).abs() < 1e-12);
    }

    #[test]
    fn config_overrides_table() {
        let mut cfg = AgentConfig::default();
        cfg.production_estimates.insert("cursor".into(), 4.0);
        cfg.production_estimates.insert("you".into(), 9.0);
        let eval = EfficiencyEvaluator::from_config(&cfg);
        let cursor = PurchasableItem::producer("cursor", "Cursor", 15.0, 0);
        let you = PurchasableItem::producer("you", "You", 15.0, 0);
        assert_eq!(eval.base_production_estimate(&cursor), 4.0);
        assert_eq!(eval.base_production_estimate(&you), 9.0);
    }
}
