//! Waiting queue and the periodic matching sweep

pub mod engine;
pub mod scheduler;
pub mod waiting;

pub use engine::{MatchEngine, SweepReport};
pub use scheduler::{SweepScheduler, SweepTarget};
pub use waiting::{QueueEntry, QueueGuard, WaitingQueue};
