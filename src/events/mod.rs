//! Event delivery for matchmaking outcomes
//!
//! The engine and room registry never call subscribers directly; they hand
//! the events they produced to the [`EventBus`] after releasing their locks.

pub mod bus;
pub mod subscribers;

pub use bus::{EventBus, EventSubscriber, SubscriptionId};
pub use subscribers::{ChannelSubscriber, EventStream, LoggingSubscriber, RecordingSubscriber};
