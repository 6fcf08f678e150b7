//! End-of-session performance report.

use crate::types::{SessionOutcome, StatsSnapshot, StrategyState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effectiveness {
    High,
    Medium,
    Low,
}

impl Effectiveness {
    /// Banded on resources gained per minute.
    pub fn from_rate(resources_per_minute: f64) -> Self {
        if resources_per_minute > 1_000.0 {
            Self::High
        } else if resources_per_minute > 100.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Effectiveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub resources_per_minute: f64,
    pub clicks_per_minute: f64,
    /// Resources earned per click.
    pub click_efficiency: f64,
    pub effectiveness: Effectiveness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub final_strategy: StrategyState,
    pub stats: StatsSnapshot,
    pub metrics: Metrics,
}

impl PerformanceReport {
    pub fn new(
        session_id: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        stats: StatsSnapshot,
    ) -> Self {
        let duration_secs = (ended_at - started_at).num_milliseconds().max(0) as f64 / 1_000.0;
        // Sessions shorter than a minute are rated per whole minute.
        let minutes = (duration_secs / 60.0).max(1.0);
        let resources_per_minute = stats.resources / minutes;
        let clicks_per_minute = stats.total_clicks as f64 / minutes;

        Self {
            session_id: session_id.into(),
            started_at,
            ended_at,
            duration_secs,
            final_strategy: stats.strategy,
            metrics: Metrics {
                resources_per_minute,
                clicks_per_minute,
                click_efficiency: resources_per_minute / clicks_per_minute.max(1.0),
                effectiveness: Effectiveness::from_rate(resources_per_minute),
            },
            stats,
        }
    }

    pub fn from_outcome(outcome: &SessionOutcome) -> Self {
        Self::new(
            outcome.session_id.clone(),
            outcome.started_at,
            outcome.ended_at,
            outcome.final_stats.clone(),
        )
    }

    /// Item bought most often, if any.
    pub fn top_item(&self) -> Option<(&str, u64)> {
        self.stats
            .purchases_by_item
            .iter()
            .max_by_key(|(_, n)| **n)
            .map(|(id, n)| (id.as_str(), *n))
    }

    /// Write as `session-<id>.json` under `dir`.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create reports directory {}", dir.display()))?;
        let path = dir.join(format!("session-{}.json", self.session_id));
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(path)
    }

    /// Plain-text summary for the console.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Session:        {}", self.session_id),
            format!("Duration:       {:.0}s", self.duration_secs),
            format!("Final strategy: {}", self.final_strategy),
            format!(
                "Resources:      {:.0} (+{:.1}/s)",
                self.stats.resources, self.stats.production_rate
            ),
            format!("Clicks:         {}", self.stats.total_clicks),
            format!(
                "Purchases:      {} ({} upgrades)",
                self.stats.total_purchases, self.stats.upgrades_bought
            ),
            format!("Bonuses:        {}", self.stats.bonuses_claimed),
            format!("Strategy moves: {}", self.stats.strategy_change_count),
            format!(
                "Rates:          {:.1} resources/min, {:.1} clicks/min",
                self.metrics.resources_per_minute, self.metrics.clicks_per_minute
            ),
            format!("Effectiveness:  {}", self.metrics.effectiveness),
        ];
        if let Some((id, n)) = self.top_item() {
            lines.push(format!("Most bought:    {} x{}", id, n));
        }
        lines.join("\n")
    }
}
