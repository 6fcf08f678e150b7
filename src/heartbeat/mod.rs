//! Background persistence of session progress.

pub mod daemon;

pub use daemon::{persist_with_retry, store_save, FlushDaemon};
