//! Configuration management for the anteroom service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the matchmaking engine.

pub mod app;
pub mod matchmaking;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, MatchmakingSettings, ServiceSettings};
pub use matchmaking::MatchmakerConfig;
