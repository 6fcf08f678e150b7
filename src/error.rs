//! Typed errors for the agent's failure taxonomy.
//!
//! Everything outside these three families is plumbing and travels as
//! `anyhow::Error`.

use thiserror::Error;

/// Failures reading from or acting on the game.
#[derive(Debug, Error)]
pub enum GameError {
    /// Target vanished or went stale between read and act. Recoverable.
    #[error("transient game interface error: {0}")]
    Transient(String),

    /// A displayed value could not be turned into a number.
    #[error("could not parse {field} from {raw:?}")]
    Parse { field: &'static str, raw: String },

    /// The game session itself is not reachable.
    #[error("game interface unavailable: {0}")]
    Unavailable(String),
}

impl GameError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn parse(field: &'static str, raw: impl Into<String>) -> Self {
        Self::Parse {
            field,
            raw: raw.into(),
        }
    }
}

/// Invalid configuration. Fatal at session start.
#[derive(Debug, Error, PartialEq)]
#[error("invalid configuration: {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A flush that did not reach the progress store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("progress store write failed: {0}")]
    Store(String),

    #[error("progress store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<anyhow::Error> for PersistenceError {
    fn from(e: anyhow::Error) -> Self {
        Self::Store(format!("{e:#}"))
    }
}
