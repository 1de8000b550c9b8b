//! Queue execution and the crash-recovery session record.

pub mod runner;
pub mod state;

pub use runner::{QueueRunner, RunnerStatus, Tick};
pub use state::{STATE_DIR_ENV, SessionRecord, SessionStateTracker, SessionStatus};
