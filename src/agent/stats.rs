//! Session statistics, owned by a single task.
//!
//! Both control loops report through a cloneable [`StatsHandle`]; one
//! owner task applies the events in arrival order and publishes the
//! result on a watch channel. Readers always get a whole snapshot, never
//! a half-applied one, and no counter update can be lost.

use crate::types::{ItemCategory, PurchasableItem, ResourceSnapshot, StatsSnapshot, StrategyState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// One update to the session statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsEvent {
    Clicks(u64),
    BonusClaimed,
    Purchased {
        item_id: String,
        category: ItemCategory,
    },
    StrategyChanged(StrategyState),
    Observed {
        resources: f64,
        production_rate: f64,
    },
}

/// Apply one event. Counters only move up.
pub fn apply_event(stats: &mut StatsSnapshot, event: StatsEvent) {
    match event {
        StatsEvent::Clicks(n) => stats.total_clicks = stats.total_clicks.saturating_add(n),
        StatsEvent::BonusClaimed => stats.bonuses_claimed = stats.bonuses_claimed.saturating_add(1),
        StatsEvent::Purchased { item_id, category } => {
            stats.total_purchases = stats.total_purchases.saturating_add(1);
            if category == ItemCategory::Upgrade {
                stats.upgrades_bought = stats.upgrades_bought.saturating_add(1);
            }
            let count = stats.purchases_by_item.entry(item_id).or_insert(0);
            *count = count.saturating_add(1);
        }
        StatsEvent::StrategyChanged(state) => {
            stats.strategy_change_count = stats.strategy_change_count.saturating_add(1);
            stats.strategy = state;
        }
        StatsEvent::Observed {
            resources,
            production_rate,
        } => {
            stats.resources = resources;
            stats.production_rate = production_rate;
        }
    }
}

/// Write side, one clone per loop.
#[derive(Debug, Clone)]
pub struct StatsHandle {
    tx: mpsc::UnboundedSender<StatsEvent>,
}

impl StatsHandle {
    fn send(&self, event: StatsEvent) {
        if self.tx.send(event).is_err() {
            debug!("Stats owner already stopped; event dropped");
        }
    }

    pub fn record_clicks(&self, n: u64) {
        if n > 0 {
            self.send(StatsEvent::Clicks(n));
        }
    }

    pub fn bonus_claimed(&self) {
        self.send(StatsEvent::BonusClaimed);
    }

    pub fn purchased(&self, item: &PurchasableItem) {
        self.send(StatsEvent::Purchased {
            item_id: item.id.clone(),
            category: item.category,
        });
    }

    pub fn strategy_changed(&self, to: StrategyState) {
        self.send(StatsEvent::StrategyChanged(to));
    }

    pub fn observed(&self, snapshot: &ResourceSnapshot) {
        self.send(StatsEvent::Observed {
            resources: snapshot.resources,
            production_rate: snapshot.production_rate,
        });
    }
}

/// Read side: immutable copies of the latest statistics.
#[derive(Debug, Clone)]
pub struct StatsView {
    rx: watch::Receiver<StatsSnapshot>,
}

impl StatsView {
    pub fn snapshot(&self) -> StatsSnapshot {
        self.rx.borrow().clone()
    }
}

/// Spawn the owner task.
///
/// The task ends once every [`StatsHandle`] has been dropped and returns
/// the final statistics.
pub fn spawn_stats_owner() -> (StatsHandle, StatsView, JoinHandle<StatsSnapshot>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<StatsEvent>();
    let (publish, view) = watch::channel(StatsSnapshot::default());

    let owner = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            publish.send_modify(|stats| apply_event(stats, event));
        }
        let final_stats = publish.borrow().clone();
        final_stats
    });

    (StatsHandle { tx }, StatsView { rx: view }, owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let (handle, _view, owner) = spawn_stats_owner();
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..1_000 {
                    h.record_clicks(1);
                    h.bonus_claimed();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        drop(handle);
        let stats = owner.await.unwrap();
        assert_eq!(stats.total_clicks, 8_000);
        assert_eq!(stats.bonuses_claimed, 8_000);
    }

    #[tokio::test]
    async fn snapshots_are_monotonic() {
        let (handle, view, owner) = spawn_stats_owner();
        let item = PurchasableItem::producer("grandma", "Grandma", 100.0, 0);
        let mut previous = view.snapshot();
        for i in 0..200u64 {
            handle.record_clicks(i % 7);
            if i % 3 == 0 {
                handle.purchased(&item);
            }
            if i % 50 == 0 {
                handle.strategy_changed(StrategyState::Balanced);
            }
            tokio::task::yield_now().await;
            let current = view.snapshot();
            assert!(current.dominates(&previous));
            previous = current;
        }
        drop(handle);
        let final_stats = owner.await.unwrap();
        assert!(final_stats.dominates(&previous));
        assert_eq!(final_stats.total_purchases, 67);
        assert_eq!(final_stats.purchases_by_item.get("grandma"), Some(&67));
        assert_eq!(final_stats.strategy_change_count, 4);
    }

    #[test]
    fn upgrade_purchases_are_counted_separately() {
        let mut stats = StatsSnapshot::default();
        apply_event(
            &mut stats,
            StatsEvent::Purchased {
                item_id: "cursor_tier_1".into(),
                category: ItemCategory::Upgrade,
            },
        );
        apply_event(
            &mut stats,
            StatsEvent::Purchased {
                item_id: "cursor".into(),
                category: ItemCategory::Producer,
            },
        );
        assert_eq!(stats.total_purchases, 2);
        assert_eq!(stats.upgrades_bought, 1);
    }

    #[test]
    fn observations_update_gauges_only() {
        let mut stats = StatsSnapshot::default();
        apply_event(&mut stats, StatsEvent::Clicks(5));
        apply_event(
            &mut stats,
            StatsEvent::Observed {
                resources: 42.0,
                production_rate: 1.5,
            },
        );
        assert_eq!(stats.total_clicks, 5);
        assert_eq!(stats.resources, 42.0);
        assert_eq!(stats.production_rate, 1.5);
    }

    #[test]
    fn zero_clicks_send_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = StatsHandle { tx };
        handle.record_clicks(0);
        assert!(rx.try_recv().is_err());
    }
}
