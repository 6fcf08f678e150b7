//! In-process simulated clicker economy.
//!
//! Producers cost `base * 1.15^owned` and add a fixed rate each.
//! Upgrades unlock at 1, 5 and 25 owned and double their producer's
//! output (cursor upgrades also double the click value). Bonus objects
//! appear every 60–180 s of game time and vanish after 13 s.
//!
//! Time is read from `tokio::time::Instant`, so the economy runs on the
//! paused clock in tests.

use crate::error::GameError;
use crate::game::GameInterface;
use crate::types::{ItemCategory, PurchasableItem};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const PRICE_GROWTH: f64 = 1.15;
const BONUS_LIFETIME: Duration = Duration::from_secs(13);
const BONUS_GAP_SECS: (u64, u64) = (60, 180);
const UPGRADE_TIERS: &[(u32, f64)] = &[(1, 10.0), (5, 50.0), (25, 500.0)];

/// (id, display name, base cost, base rate per unit)
const PRODUCERS: &[(&str, &str, f64, f64)] = &[
    ("cursor", "Cursor", 15.0, 0.1),
    ("grandma", "Grandma", 100.0, 1.0),
    ("farm", "Farm", 1_100.0, 8.0),
    ("mine", "Mine", 12_000.0, 47.0),
    ("factory", "Factory", 130_000.0, 260.0),
    ("bank", "Bank", 1.4e6, 1_400.0),
    ("temple", "Temple", 2e7, 7_800.0),
    ("wizard_tower", "Wizard tower", 3.3e8, 44_000.0),
    ("shipment", "Shipment", 5.1e9, 260_000.0),
    ("alchemy_lab", "Alchemy lab", 7.5e10, 1.6e6),
    ("portal", "Portal", 1e12, 1e7),
    ("time_machine", "Time machine", 1.4e13, 6.5e7),
    ("antimatter_condenser", "Antimatter condenser", 1.7e14, 4.3e8),
];

#[derive(Debug)]
struct SimProducer {
    id: &'static str,
    name: &'static str,
    base_cost: f64,
    base_rate: f64,
    owned: u32,
    multiplier: f64,
}

impl SimProducer {
    fn price(&self) -> f64 {
        (self.base_cost * PRICE_GROWTH.powi(self.owned as i32)).ceil()
    }

    fn rate(&self) -> f64 {
        f64::from(self.owned) * self.base_rate * self.multiplier
    }
}

#[derive(Debug)]
struct SimUpgrade {
    id: String,
    name: String,
    producer: usize,
    required_owned: u32,
    price: f64,
    bought: bool,
}

#[derive(Debug)]
struct SimState {
    resources: f64,
    click_value: f64,
    producers: Vec<SimProducer>,
    upgrades: Vec<SimUpgrade>,
    bonus_expires: Option<Instant>,
    next_bonus_at: Instant,
    last_tick: Instant,
    rng: StdRng,
}

#[derive(Debug, Serialize)]
struct SimSave<'a> {
    resources: f64,
    owned: BTreeMap<&'a str, u32>,
    upgrades: Vec<&'a str>,
}

impl SimState {
    fn new(seed: u64, resources: f64) -> Self {
        let producers: Vec<SimProducer> = PRODUCERS
            .iter()
            .map(|(id, name, base_cost, base_rate)| SimProducer {
                id: *id,
                name: *name,
                base_cost: *base_cost,
                base_rate: *base_rate,
                owned: 0,
                multiplier: 1.0,
            })
            .collect();

        let upgrades = producers
            .iter()
            .enumerate()
            .flat_map(|(idx, p)| {
                UPGRADE_TIERS.iter().enumerate().map(move |(tier, (required, factor))| SimUpgrade {
                    id: format!("{}_tier_{}", p.id, tier + 1),
                    name: format!("{} tier {}", p.name, tier + 1),
                    producer: idx,
                    required_owned: *required,
                    price: p.base_cost * factor,
                    bought: false,
                })
            })
            .collect();

        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(seed);
        let first_gap = rng.gen_range(BONUS_GAP_SECS.0..=BONUS_GAP_SECS.1);
        Self {
            resources,
            click_value: 1.0,
            producers,
            upgrades,
            bonus_expires: None,
            next_bonus_at: now + Duration::from_secs(first_gap),
            last_tick: now,
            rng,
        }
    }

    fn production_rate(&self) -> f64 {
        self.producers.iter().map(SimProducer::rate).sum()
    }

    /// Accrue production and roll bonus objects forward to `now`.
    fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_tick).as_secs_f64();
        self.resources += self.production_rate() * dt;
        self.last_tick = now;

        if let Some(expires) = self.bonus_expires {
            if now >= expires {
                self.bonus_expires = None;
            }
        }
        if self.bonus_expires.is_none() && now >= self.next_bonus_at {
            self.bonus_expires = Some(now + BONUS_LIFETIME);
            let gap = self.rng.gen_range(BONUS_GAP_SECS.0..=BONUS_GAP_SECS.1);
            self.next_bonus_at = now + Duration::from_secs(gap);
        }
    }

    fn unlocked_upgrades(&self) -> impl Iterator<Item = &SimUpgrade> {
        self.upgrades
            .iter()
            .filter(move |u| !u.bought && self.producers[u.producer].owned >= u.required_owned)
    }

    fn buy_producer(&mut self, id: &str) -> Result<bool, GameError> {
        let resources = self.resources;
        let producer = self
            .producers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::transient(format!("no producer '{id}'")))?;
        let price = producer.price();
        if price > resources {
            return Ok(false);
        }
        producer.owned += 1;
        self.resources -= price;
        Ok(true)
    }

    fn buy_upgrade(&mut self, id: &str) -> Result<bool, GameError> {
        let idx = self
            .upgrades
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| GameError::transient(format!("no upgrade '{id}'")))?;
        let upgrade = &self.upgrades[idx];
        let unlocked = self.producers[upgrade.producer].owned >= upgrade.required_owned;
        if upgrade.bought || !unlocked || upgrade.price > self.resources {
            return Ok(false);
        }
        let (price, target) = (upgrade.price, upgrade.producer);
        self.upgrades[idx].bought = true;
        self.resources -= price;
        self.producers[target].multiplier *= 2.0;
        if self.producers[target].id == "cursor" {
            self.click_value *= 2.0;
        }
        Ok(true)
    }
}

/// Simulated game session.
#[derive(Debug)]
pub struct SimulatedGame {
    state: Mutex<SimState>,
}

impl SimulatedGame {
    pub fn new(seed: u64) -> Self {
        Self::with_resources(seed, 0.0)
    }

    /// Start with a given bank instead of zero.
    pub fn with_resources(seed: u64, resources: f64) -> Self {
        Self {
            state: Mutex::new(SimState::new(seed, resources)),
        }
    }

    /// Units owned of a producer.
    pub async fn owned(&self, id: &str) -> u32 {
        let state = self.state.lock().await;
        state
            .producers
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.owned)
            .unwrap_or(0)
    }

    /// Whether a bonus object is currently on screen.
    pub async fn bonus_visible(&self) -> bool {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        state.bonus_expires.is_some()
    }
}

#[async_trait]
impl GameInterface for SimulatedGame {
    async fn read_resource_count(&self) -> Result<f64, GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        Ok(state.resources)
    }

    async fn read_production_rate(&self) -> Result<f64, GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        Ok(state.production_rate())
    }

    async fn list_producers(&self) -> Result<Vec<PurchasableItem>, GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        let resources = state.resources;
        Ok(state
            .producers
            .iter()
            .map(|p| {
                let price = p.price();
                PurchasableItem {
                    id: p.id.to_string(),
                    display_name: p.name.to_string(),
                    price,
                    owned_count: p.owned,
                    category: ItemCategory::Producer,
                    enabled: price <= resources,
                }
            })
            .collect())
    }

    async fn list_upgrades(&self) -> Result<Vec<PurchasableItem>, GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        let resources = state.resources;
        Ok(state
            .unlocked_upgrades()
            .map(|u| PurchasableItem {
                id: u.id.clone(),
                display_name: u.name.clone(),
                price: u.price,
                owned_count: 0,
                category: ItemCategory::Upgrade,
                enabled: u.price <= resources,
            })
            .collect())
    }

    async fn claim_bonus(&self) -> Result<bool, GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        if state.bonus_expires.take().is_none() {
            return Ok(false);
        }
        let reward = (state.resources * 0.15).min(state.production_rate() * 900.0) + 13.0;
        state.resources += reward;
        Ok(true)
    }

    async fn click(&self) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        state.resources += state.click_value;
        Ok(())
    }

    async fn purchase(&self, item: &PurchasableItem) -> Result<bool, GameError> {
        let mut state = self.state.lock().await;
        state.advance(Instant::now());
        match item.category {
            ItemCategory::Producer => state.buy_producer(&item.id),
            ItemCategory::Upgrade => state.buy_upgrade(&item.id),
        }
    }

    async fn export_save(&self) -> Result<Option<String>, GameError> {
        let state = self.state.lock().await;
        let save = SimSave {
            resources: state.resources,
            owned: state.producers.iter().map(|p| (p.id, p.owned)).collect(),
            upgrades: state
                .upgrades
                .iter()
                .filter(|u| u.bought)
                .map(|u| u.id.as_str())
                .collect(),
        };
        serde_json::to_string(&save)
            .map(Some)
            .map_err(|e| GameError::transient(format!("save export: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clicks_add_resources() {
        let game = SimulatedGame::new(1);
        for _ in 0..20 {
            game.click().await.unwrap();
        }
        assert_eq!(game.read_resource_count().await.unwrap(), 20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn producer_purchase_raises_price_and_rate() {
        let game = SimulatedGame::with_resources(1, 100.0);
        let producers = game.list_producers().await.unwrap();
        let cursor = producers.iter().find(|p| p.id == "cursor").unwrap().clone();
        assert_eq!(cursor.price, 15.0);
        assert!(cursor.enabled);

        assert!(game.purchase(&cursor).await.unwrap());
        assert_eq!(game.owned("cursor").await, 1);
        assert_eq!(game.read_resource_count().await.unwrap(), 85.0);
        assert!((game.read_production_rate().await.unwrap() - 0.1).abs() < 1e-12);

        let cursor = game
            .list_producers()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.id == "cursor")
            .unwrap();
        assert_eq!(cursor.price, 18.0);
    }

    #[tokio::test(start_paused = true)]
    async fn unaffordable_purchase_is_rejected_not_failed() {
        let game = SimulatedGame::with_resources(1, 10.0);
        let farm = PurchasableItem::producer("farm", "Farm", 1_100.0, 0);
        assert!(!game.purchase(&farm).await.unwrap());
        assert_eq!(game.owned("farm").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_item_is_transient_error() {
        let game = SimulatedGame::with_resources(1, 1e6);
        let ghost = PurchasableItem::producer("ghost", "Ghost", 1.0, 0);
        assert!(matches!(game.purchase(&ghost).await, Err(GameError::Transient(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn production_accrues_over_time() {
        let game = SimulatedGame::with_resources(1, 100.0);
        let grandma = PurchasableItem::producer("grandma", "Grandma", 100.0, 0);
        assert!(game.purchase(&grandma).await.unwrap());
        tokio::time::advance(Duration::from_secs(10)).await;
        let resources = game.read_resource_count().await.unwrap();
        assert!((resources - 10.0).abs() < 1e-6, "{resources}");
    }

    #[tokio::test(start_paused = true)]
    async fn upgrade_unlocks_and_doubles_output() {
        let game = SimulatedGame::with_resources(1, 10_000.0);
        assert!(game.list_upgrades().await.unwrap().is_empty());

        let grandma = PurchasableItem::producer("grandma", "Grandma", 100.0, 0);
        game.purchase(&grandma).await.unwrap();
        let upgrades = game.list_upgrades().await.unwrap();
        assert_eq!(upgrades.len(), 1);
        assert_eq!(upgrades[0].id, "grandma_tier_1");
        assert_eq!(upgrades[0].price, 1_000.0);

        assert!(game.purchase(&upgrades[0]).await.unwrap());
        assert!((game.read_production_rate().await.unwrap() - 2.0).abs() < 1e-12);
        assert!(game.list_upgrades().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn bonus_appears_and_can_be_claimed_once() {
        let game = SimulatedGame::with_resources(3, 1_000.0);
        assert!(!game.claim_bonus().await.unwrap());

        tokio::time::advance(Duration::from_secs(BONUS_GAP_SECS.1)).await;
        assert!(game.bonus_visible().await);
        assert!(game.claim_bonus().await.unwrap());
        assert!(!game.claim_bonus().await.unwrap());
        // No production yet, so the reward is the flat part.
        assert_eq!(game.read_resource_count().await.unwrap(), 1_013.0);
    }

    #[tokio::test(start_paused = true)]
    async fn save_lists_owned_producers() {
        let game = SimulatedGame::with_resources(1, 100.0);
        let cursor = PurchasableItem::producer("cursor", "Cursor", 15.0, 0);
        game.purchase(&cursor).await.unwrap();
        let save = game.export_save().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&save).unwrap();
        assert_eq!(value["owned"]["cursor"], 1);
    }
}
