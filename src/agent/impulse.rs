//! Impulse loop: click bursts and opportunistic bonus claims.

use crate::agent::stats::StatsHandle;
use crate::config::AgentConfig;
use crate::game::GameInterface;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What one impulse tick managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpulseTick {
    pub clicks: u64,
    pub bonuses: u64,
}

pub struct ImpulseLoop {
    game: Arc<dyn GameInterface>,
    stats: StatsHandle,
    click_frequency: f64,
    tick: Duration,
    claim_bonuses: bool,
    max_bonus_claims: u32,
    /// Fractional clicks owed from earlier ticks.
    carry: f64,
}

impl ImpulseLoop {
    pub fn new(config: &AgentConfig, game: Arc<dyn GameInterface>, stats: StatsHandle) -> Self {
        Self {
            game,
            stats,
            click_frequency: config.click_frequency,
            tick: config.impulse_tick(),
            claim_bonuses: config.claim_bonuses,
            max_bonus_claims: config.max_bonus_claims_per_tick,
            carry: 0.0,
        }
    }

    /// Clicks owed this tick, keeping the remainder for later ticks.
    fn clicks_due(&mut self) -> u64 {
        let due = self.carry + self.click_frequency * self.tick.as_secs_f64();
        let whole = due.floor();
        self.carry = due - whole;
        whole as u64
    }

    /// Run until `cancel` fires. The tick in progress always completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Impulse loop started ({:.1} clicks/s, tick {:?})",
            self.click_frequency, self.tick
        );

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let done = self.iteration().await;
            if done.bonuses > 0 {
                info!("Claimed {} bonus object(s)", done.bonuses);
            }
        }

        info!("Impulse loop stopped");
    }

    /// One tick: click burst, then bonus sweep.
    pub async fn iteration(&mut self) -> ImpulseTick {
        let mut done = ImpulseTick::default();

        let due = self.clicks_due();
        for _ in 0..due {
            match self.game.click().await {
                Ok(()) => done.clicks += 1,
                Err(e) => {
                    warn!("Click burst cut short after {}/{}: {}", done.clicks, due, e);
                    break;
                }
            }
        }
        self.stats.record_clicks(done.clicks);

        if self.claim_bonuses {
            for _ in 0..self.max_bonus_claims {
                match self.game.claim_bonus().await {
                    Ok(true) => {
                        done.bonuses += 1;
                        self.stats.bonus_claimed();
                    }
                    Ok(false) => break,
                    Err(e) => {
                        warn!("Bonus sweep failed: {}", e);
                        break;
                    }
                }
            }
        }

        done
    }
}
