//! Metrics and monitoring for the anteroom matchmaking service
//!
//! This module provides Prometheus metrics collection and the HTTP server
//! exposing health probes, statistics and the metrics scrape endpoint.

pub mod collector;
pub mod health;

pub use collector::{
    MatchMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, QueueMetrics, RoomMetrics,
    ServiceMetrics,
};
pub use health::{encode_metrics, HealthServer, HealthServerConfig};
