//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the anteroom
//! matchmaking service, including readiness and liveness probes.

use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A sweep older than this many intervals marks the engine as degraded
const STALE_SWEEP_INTERVALS: u32 = 5;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value (0=unhealthy, 1=degraded, 2=healthy)
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: &HealthStatus) -> HealthStatus {
        match (&self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Participants currently waiting in the queue
    pub participants_waiting: usize,
    /// Rooms currently open
    pub active_rooms: usize,
    /// Matches formed since service start (queue, bot-filled and rooms)
    pub matches_formed: u64,
    /// Queue entries dropped without a match since service start
    pub timeouts: u64,
    /// Sweeps run since service start
    pub sweeps_run: u64,
    /// Sweeps that failed since service start
    pub sweeps_failed: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();

        let service_check = Self::check_service_running(&app_state).await;
        let mut overall_status = service_check.status.clone();
        checks.push(service_check);

        let engine_check = Self::check_matchmaker(&app_state);
        overall_status = overall_status.worst(&engine_check.status);
        checks.push(engine_check);

        let stats = Self::gather_service_stats(&app_state);

        Ok(HealthCheck {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify the sweep loop is alive and keeping up
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_matchmaker(&app_state).status)
    }

    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The scheduler must be running and must have swept recently
    fn check_matchmaker(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();
        let matchmaker = app_state.matchmaker();
        let interval = matchmaker.config().sweep_interval;

        let (status, message) = if !matchmaker.is_running() {
            (
                HealthStatus::Unhealthy,
                Some("Sweep scheduler is not running".to_string()),
            )
        } else {
            match matchmaker.get_stats() {
                Ok(stats) => {
                    let stale_after = interval * STALE_SWEEP_INTERVALS;
                    let since_last = stats
                        .last_sweep_at
                        .map(|at| crate::utils::elapsed_between(at, chrono::Utc::now()));

                    match since_last {
                        Some(elapsed) if elapsed <= stale_after => (HealthStatus::Healthy, None),
                        Some(elapsed) => (
                            HealthStatus::Degraded,
                            Some(format!("Last sweep finished {:?} ago", elapsed)),
                        ),
                        None if app_state.uptime() <= stale_after => (HealthStatus::Healthy, None),
                        None => (
                            HealthStatus::Degraded,
                            Some("No sweep has completed yet".to_string()),
                        ),
                    }
                }
                Err(e) => {
                    warn!("Matchmaker stats check failed: {}", e);
                    (
                        HealthStatus::Degraded,
                        Some(format!("Stats check failed: {}", e)),
                    )
                }
            }
        };

        ComponentCheck {
            name: "matchmaker".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let uptime_seconds = app_state.uptime().as_secs();

        match app_state.matchmaker().get_stats() {
            Ok(stats) => ServiceStats {
                participants_waiting: stats.participants_waiting,
                active_rooms: stats.active_rooms,
                matches_formed: stats.queue_matches + stats.bot_filled_matches + stats.rooms_started,
                timeouts: stats.timeouts,
                sweeps_run: stats.sweeps_run,
                sweeps_failed: stats.sweeps_failed,
                uptime_seconds,
            },
            Err(e) => {
                debug!("Failed to get matchmaker stats for health check: {}", e);
                ServiceStats {
                    uptime_seconds,
                    ..ServiceStats::default()
                }
            }
        }
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
