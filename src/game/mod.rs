//! Capability interface over a live game session.
//!
//! Implementations own all transport and text-scraping concerns; the
//! decision core only ever sees typed values. Mutating calls are assumed
//! to be serialized by the implementation (one logical game session).

pub mod bridge;
pub mod parse;
pub mod sim;

pub use bridge::BridgeClient;
pub use sim::SimulatedGame;

use crate::error::GameError;
use crate::types::PurchasableItem;
use async_trait::async_trait;

/// Read and act capabilities the agent needs from a game.
#[async_trait]
pub trait GameInterface: Send + Sync {
    /// Confirm the game is reachable. Called once before a session starts.
    async fn ready(&self) -> Result<(), GameError> {
        Ok(())
    }

    /// Current resource count.
    async fn read_resource_count(&self) -> Result<f64, GameError>;

    /// Current passive production per second.
    async fn read_production_rate(&self) -> Result<f64, GameError>;

    async fn list_producers(&self) -> Result<Vec<PurchasableItem>, GameError>;

    async fn list_upgrades(&self) -> Result<Vec<PurchasableItem>, GameError>;

    /// Claim one visible bonus object. `false` if none was available.
    async fn claim_bonus(&self) -> Result<bool, GameError>;

    /// One click on the main target.
    async fn click(&self) -> Result<(), GameError>;

    /// Buy `item`. `false` if it became unaffordable or disabled since it
    /// was listed; that race is expected and not an error.
    async fn purchase(&self, item: &PurchasableItem) -> Result<bool, GameError>;

    /// Serialized game save, if the game can export one.
    async fn export_save(&self) -> Result<Option<String>, GameError> {
        Ok(None)
    }
}
