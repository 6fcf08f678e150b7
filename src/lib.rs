//! idle-agent: an autonomous player for incremental ("clicker") games.
//!
//! Two concurrent control loops drive one game session: a fast impulse
//! loop that clicks and claims bonuses, and a slower decision loop that
//! scores purchasable items and buys the most efficient one under the
//! current strategy.

pub mod agent;
pub mod config;
pub mod error;
pub mod game;
pub mod heartbeat;
pub mod report;
pub mod setup;
pub mod state;
pub mod strategy;
pub mod types;
