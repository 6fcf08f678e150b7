//! The agent: two control loops over one game session.

pub mod impulse;
pub mod loop_;
pub mod session;
pub mod snapshot;
pub mod stats;

pub use impulse::ImpulseLoop;
pub use loop_::{CycleOutcome, DecisionLoop};
pub use session::{run_recorded, Session};
pub use snapshot::SnapshotReader;
pub use stats::{spawn_stats_owner, StatsHandle, StatsView};
