//! Service layer for the anteroom matchmaking service
//!
//! This module contains the matchmaker facade, the production application
//! state, health checks and background task management.

pub mod app;
pub mod health;
pub mod matchmaker;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use matchmaker::{Matchmaker, MatchmakerStats};
