//! Main application state and service coordination
//!
//! This module contains the production AppState that owns the matchmaker,
//! the metrics collector and the background tasks of the anteroom service.

use crate::config::AppConfig;
use crate::events::LoggingSubscriber;
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector};
use crate::service::health::HealthCheck;
use crate::service::matchmaker::Matchmaker;
use crate::types::{Player, QueueLabel};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Interval of the gauge and health refresh task
const METRICS_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// The matchmaking engine
    matchmaker: Arc<Matchmaker<Player, QueueLabel>>,

    /// Metrics shared by the engine and the health server
    metrics_collector: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Stops the health server once it is running
    health_shutdown: Mutex<Option<broadcast::Sender<()>>>,

    /// Stops the maintenance tasks
    shutdown_tx: broadcast::Sender<()>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing anteroom matchmaking service");
        info!(
            "Configuration: service={}, health_port={}, sweep_interval={}ms",
            config.service.name, config.service.health_port, config.matchmaking.sweep_interval_ms
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let matchmaker = Matchmaker::with_metrics(
            config.matchmaker_config(),
            metrics_collector.clone(),
        )
        .map_err(|e| ServiceError::Configuration {
            message: format!("Invalid matchmaking configuration: {}", e),
        })?;
        matchmaker.subscribe(Arc::new(LoggingSubscriber));

        Ok(Self {
            config,
            matchmaker: Arc::new(matchmaker),
            metrics_collector,
            background_tasks: Mutex::new(Vec::new()),
            health_shutdown: Mutex::new(None),
            shutdown_tx: broadcast::channel(1).0,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Start the sweep scheduler, the health server and background tasks
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting anteroom matchmaking service");

        self.matchmaker
            .start()
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to start matchmaker: {}", e),
            })?;

        self.mark_running(true).await;

        self.start_health_server().await?;
        self.start_background_tasks().await;

        info!("✅ Anteroom matchmaking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of anteroom service");

        self.mark_running(false).await;

        // Let an in-flight sweep finish before anything else goes away
        self.matchmaker.stop().await;
        info!("✅ Sweep scheduler stopped");

        // No receivers simply means no maintenance task is running
        let _ = self.shutdown_tx.send(());

        if let Some(shutdown_tx) = self.health_shutdown.lock().await.take() {
            if let Err(e) = shutdown_tx.send(()) {
                warn!("Failed to send shutdown signal to health server: {}", e);
            }
        }

        self.stop_background_tasks().await;

        let final_stats =
            self.matchmaker
                .get_stats()
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Anteroom service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub(crate) async fn mark_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    pub fn matchmaker(&self) -> Arc<Matchmaker<Player, QueueLabel>> {
        self.matchmaker.clone()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    async fn start_health_server(self: &Arc<Self>) -> Result<(), ServiceError> {
        let port = self.config.service.health_port;
        info!("Starting health and metrics endpoints on port {}", port);

        let health_config = HealthServerConfig {
            port,
            host: "0.0.0.0".to_string(),
        };
        let server = HealthServer::new(health_config, self.metrics_collector.clone())
            .with_app_state(self.clone());
        *self.health_shutdown.lock().await = Some(server.shutdown_handle());

        let handle = tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("Health server failed: {}", e);
            } else {
                info!("Health server task completed");
            }
        });
        self.background_tasks.lock().await.push(handle);

        // Give the server a moment to bind
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(self: &Arc<Self>) {
        info!(
            "Starting metrics update task ({}s interval)...",
            METRICS_UPDATE_INTERVAL.as_secs()
        );

        let metrics_task = {
            let app_state = Arc::downgrade(self);
            let mut shutdown_rx = self.shutdown_tx.subscribe();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(METRICS_UPDATE_INTERVAL);
                info!("Metrics update task started");

                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = interval.tick() => {}
                    }

                    let Some(app_state) = app_state.upgrade() else {
                        break;
                    };
                    app_state.refresh_metrics().await;
                }

                info!("Metrics update task stopped");
            })
        };

        self.background_tasks.lock().await.push(metrics_task);
    }

    /// Refresh uptime, live gauges and health status
    async fn refresh_metrics(self: Arc<Self>) {
        let collector = self.metrics_collector.clone();
        collector
            .service()
            .uptime_seconds
            .set(self.uptime().as_secs() as i64);

        match self.matchmaker.get_stats() {
            Ok(stats) => {
                debug!(
                    "Updating metrics - waiting: {}, rooms: {}, sweeps: {}",
                    stats.participants_waiting, stats.active_rooms, stats.sweeps_run
                );
                collector.update_gauges(stats.participants_waiting, stats.active_rooms);
            }
            Err(e) => warn!("Failed to get matchmaker stats for metrics update: {}", e),
        }

        match HealthCheck::check(self.clone()).await {
            Ok(health) => {
                collector.update_health_status(health.status.as_gauge());
                for check in &health.checks {
                    collector.update_component_health(
                        &check.name,
                        check.status == crate::service::health::HealthStatus::Healthy,
                    );
                }
            }
            Err(e) => warn!("Health check failed during metrics update: {}", e),
        }
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&self) {
        let tasks: Vec<JoinHandle<()>> = self.background_tasks.lock().await.drain(..).collect();
        let task_count = tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        let timeout = self.config.shutdown_timeout();
        for (i, task) in tasks.into_iter().enumerate() {
            let abort = task.abort_handle();
            match tokio::time::timeout(timeout, task).await {
                Ok(_) => debug!("Background task {}/{} finished", i + 1, task_count),
                Err(_) => {
                    warn!(
                        "Background task {}/{} did not stop within {:?}, aborting",
                        i + 1,
                        task_count,
                        timeout
                    );
                    abort.abort();
                }
            }
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
