//! Builds a fresh [`ResourceSnapshot`] each decision cycle.
//!
//! A gauge that cannot be read as a sane number keeps its last known good
//! value so the cycle can still proceed. Transport failures are not
//! papered over and abort the cycle.

use crate::error::GameError;
use crate::game::GameInterface;
use crate::types::ResourceSnapshot;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    last_resources: f64,
    last_production_rate: f64,
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&mut self, game: &dyn GameInterface) -> Result<ResourceSnapshot, GameError> {
        let resources = retain_last_good(
            "resource count",
            game.read_resource_count().await,
            &mut self.last_resources,
        )?;
        let production_rate = retain_last_good(
            "production rate",
            game.read_production_rate().await,
            &mut self.last_production_rate,
        )?;
        Ok(ResourceSnapshot::new(resources, production_rate))
    }
}

fn retain_last_good(
    field: &'static str,
    read: Result<f64, GameError>,
    last: &mut f64,
) -> Result<f64, GameError> {
    match read {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            *last = value;
            Ok(value)
        }
        Ok(value) => {
            warn!("Ignoring implausible {} {}; keeping {}", field, value, last);
            Ok(*last)
        }
        Err(e @ GameError::Parse { .. }) => {
            warn!("{}; keeping last {} {}", e, field, last);
            Ok(*last)
        }
        Err(e) => Err(e),
    }
}
