//! Persistent progress store.

pub mod database;
pub mod recorder;
pub mod schema;

pub use database::{Database, LAST_SESSION_KEY};
pub use recorder::{ProgressRecorder, SqliteRecorder};
