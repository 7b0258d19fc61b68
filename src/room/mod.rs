//! Private rooms joined by code and controlled by their host

pub mod instance;
pub mod registry;

pub use instance::{Room, RoomGuard, RoomSnapshot, RoomState};
pub use registry::{LeaveOutcome, RoomRegistry};
