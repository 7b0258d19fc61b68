//! Anteroom - in-process matchmaking engine
//!
//! This crate groups waiting participants into matches by shared grouping
//! criteria on a periodic sweep, and manages host-controlled private rooms
//! joined by six-digit codes. Outcomes are delivered to subscribers as
//! [`MatchEvent`]s.

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod queue;
pub mod room;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use config::MatchmakerConfig;
pub use events::{EventBus, EventSubscriber, SubscriptionId};
pub use queue::SweepReport;
pub use room::{RoomSnapshot, RoomState};
pub use service::{Matchmaker, MatchmakerStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
