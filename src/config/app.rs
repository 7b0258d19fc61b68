//! Main application configuration
//!
//! This module defines the primary configuration structures for the anteroom
//! service, including TOML file and environment variable loading and validation.

use crate::config::matchmaking::MatchmakerConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Settling period before a queued participant is considered for a match
    pub minimum_wait_time_seconds: u64,
    /// Wait after which an under-full group is bot-filled or timed out
    pub maximum_wait_time_seconds: u64,
    /// Randomize pairing order inside each group
    pub shuffle_players: bool,
    /// Accept under-full groups once the maximum wait time elapses
    pub enable_bot_fill: bool,
    /// Interval between matching sweeps in milliseconds
    pub sweep_interval_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "anteroom".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            minimum_wait_time_seconds: 5,
            maximum_wait_time_seconds: 30,
            shuffle_players: true,
            enable_bot_fill: true,
            sweep_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Matchmaking settings
        if let Ok(wait_time) = env::var("MIN_WAIT_TIME_SECONDS") {
            config.matchmaking.minimum_wait_time_seconds = wait_time
                .parse()
                .map_err(|_| anyhow!("Invalid MIN_WAIT_TIME_SECONDS value: {}", wait_time))?;
        }
        if let Ok(wait_time) = env::var("MAX_WAIT_TIME_SECONDS") {
            config.matchmaking.maximum_wait_time_seconds = wait_time
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_WAIT_TIME_SECONDS value: {}", wait_time))?;
        }
        if let Ok(shuffle) = env::var("SHUFFLE_PLAYERS") {
            config.matchmaking.shuffle_players = shuffle
                .parse()
                .map_err(|_| anyhow!("Invalid SHUFFLE_PLAYERS value: {}", shuffle))?;
        }
        if let Ok(bot_fill) = env::var("ENABLE_BOT_FILL") {
            config.matchmaking.enable_bot_fill = bot_fill
                .parse()
                .map_err(|_| anyhow!("Invalid ENABLE_BOT_FILL value: {}", bot_fill))?;
        }
        if let Ok(interval) = env::var("SWEEP_INTERVAL_MS") {
            config.matchmaking.sweep_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEP_INTERVAL_MS value: {}", interval))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.matchmaking.sweep_interval_ms)
    }

    /// Build the immutable engine configuration
    pub fn matchmaker_config(&self) -> MatchmakerConfig {
        MatchmakerConfig {
            minimum_wait_time: Duration::from_secs(self.matchmaking.minimum_wait_time_seconds),
            maximum_wait_time: Duration::from_secs(self.matchmaking.maximum_wait_time_seconds),
            shuffle_players: self.matchmaking.shuffle_players,
            enable_bot_fill: self.matchmaking.enable_bot_fill,
            sweep_interval: self.sweep_interval(),
        }
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    config.matchmaker_config().validate()?;

    Ok(())
}
