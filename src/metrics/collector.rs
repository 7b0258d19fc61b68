//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the anteroom matchmaking
//! service using Prometheus metrics.

use crate::queue::SweepReport;
use crate::room::LeaveOutcome;
use crate::types::MatchSource;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Waiting queue metrics
    queue_metrics: QueueMetrics,

    /// Match outcome metrics
    match_metrics: MatchMetrics,

    /// Room metrics
    room_metrics: RoomMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Waiting queue metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Total participants admitted to the queue
    pub participants_queued_total: IntCounter,

    /// Total participants that left the queue on their own
    pub participants_left_total: IntCounter,

    /// Duplicate joins that were rejected
    pub rejected_joins_total: IntCounter,

    /// Participants currently waiting
    pub participants_waiting: IntGauge,
}

/// Match outcome metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Matches formed, by source (queue, bot_fill, room)
    pub matches_total: IntCounterVec,

    /// Participants placed into matches, by source
    pub participants_matched_total: IntCounterVec,

    /// Slots left for synthetic participants
    pub open_slots_total: IntCounter,

    /// Entries dropped after the maximum wait time
    pub match_timeouts_total: IntCounter,
}

/// Room metrics
#[derive(Clone)]
pub struct RoomMetrics {
    /// Rooms currently open
    pub active_rooms: IntGauge,

    /// Total rooms created
    pub rooms_created_total: IntCounter,

    /// Rooms closed, by reason (started, destroyed)
    pub rooms_closed_total: IntCounterVec,

    /// Members joining or leaving rooms, by action
    pub room_membership_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Sweep duration
    pub sweep_duration: Histogram,

    /// Sweeps run, by status (ok, failed)
    pub sweeps_total: IntCounterVec,

    /// Room operation durations
    pub room_operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let room_metrics = RoomMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            match_metrics,
            room_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn rooms(&self) -> &RoomMetrics {
        &self.room_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a queue join attempt
    pub fn record_queue_join(&self, accepted: bool) {
        if accepted {
            self.queue_metrics.participants_queued_total.inc();
            self.queue_metrics.participants_waiting.inc();
        } else {
            self.queue_metrics.rejected_joins_total.inc();
        }
    }

    /// Record a participant leaving the queue voluntarily
    pub fn record_queue_leave(&self) {
        self.queue_metrics.participants_left_total.inc();
        self.queue_metrics.participants_waiting.dec();
    }

    /// Record a formed match
    pub fn record_match(&self, source: &MatchSource, participants: usize, open_slots: usize) {
        let source = source.to_string();
        self.match_metrics
            .matches_total
            .with_label_values(&[source.as_str()])
            .inc();
        self.match_metrics
            .participants_matched_total
            .with_label_values(&[source.as_str()])
            .inc_by(participants as u64);
        self.match_metrics.open_slots_total.inc_by(open_slots as u64);
    }

    /// Record the outcome of one sweep
    pub fn record_sweep(&self, report: &SweepReport) {
        self.performance_metrics
            .sweep_duration
            .observe(report.duration.as_secs_f64());
        self.performance_metrics
            .sweeps_total
            .with_label_values(&["ok"])
            .inc();

        let matches = &self.match_metrics;
        matches
            .matches_total
            .with_label_values(&["queue"])
            .inc_by(report.matches_found as u64);
        matches
            .matches_total
            .with_label_values(&["bot_fill"])
            .inc_by(report.bot_filled as u64);
        matches
            .participants_matched_total
            .with_label_values(&["queue"])
            .inc_by((report.participants_matched - report.bot_filled_participants) as u64);
        matches
            .participants_matched_total
            .with_label_values(&["bot_fill"])
            .inc_by(report.bot_filled_participants as u64);
        matches.open_slots_total.inc_by(report.open_slots as u64);
        matches.match_timeouts_total.inc_by(report.timed_out as u64);
        self.queue_metrics
            .participants_waiting
            .set(report.remaining as i64);
    }

    pub fn record_sweep_failure(&self) {
        self.performance_metrics
            .sweeps_total
            .with_label_values(&["failed"])
            .inc();
    }

    pub fn record_room_created(&self) {
        self.room_metrics.rooms_created_total.inc();
        self.room_metrics.active_rooms.inc();
        self.record_room_membership("joined");
    }

    pub fn record_room_started(&self) {
        self.room_metrics
            .rooms_closed_total
            .with_label_values(&["started"])
            .inc();
        self.room_metrics.active_rooms.dec();
    }

    pub fn record_room_left(&self, outcome: &LeaveOutcome) {
        match outcome {
            LeaveOutcome::Left => self.record_room_membership("left"),
            LeaveOutcome::Destroyed { .. } => {
                self.room_metrics
                    .rooms_closed_total
                    .with_label_values(&["destroyed"])
                    .inc();
                self.room_metrics.active_rooms.dec();
            }
            LeaveOutcome::NotMember => {}
        }
    }

    pub fn record_room_membership(&self, action: &str) {
        self.room_metrics
            .room_membership_total
            .with_label_values(&[action])
            .inc();
    }

    /// Record room operation duration
    pub fn record_room_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .room_operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Overwrite the live gauges from authoritative counts
    pub fn update_gauges(&self, queued: usize, active_rooms: usize) {
        self.queue_metrics.participants_waiting.set(queued as i64);
        self.room_metrics.active_rooms.set(active_rooms as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new("anteroom_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "anteroom_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("anteroom_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let participants_queued_total = IntCounter::new(
            "anteroom_participants_queued_total",
            "Total participants admitted to the waiting queue",
        )?;
        registry.register(Box::new(participants_queued_total.clone()))?;

        let participants_left_total = IntCounter::new(
            "anteroom_participants_left_total",
            "Total participants that left the waiting queue",
        )?;
        registry.register(Box::new(participants_left_total.clone()))?;

        let rejected_joins_total = IntCounter::new(
            "anteroom_rejected_joins_total",
            "Queue joins rejected for an already queued participant",
        )?;
        registry.register(Box::new(rejected_joins_total.clone()))?;

        let participants_waiting = IntGauge::new(
            "anteroom_participants_waiting",
            "Participants currently in the waiting queue",
        )?;
        registry.register(Box::new(participants_waiting.clone()))?;

        Ok(Self {
            participants_queued_total,
            participants_left_total,
            rejected_joins_total,
            participants_waiting,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_total = IntCounterVec::new(
            Opts::new("anteroom_matches_total", "Total matches formed"),
            &["source"],
        )?;
        registry.register(Box::new(matches_total.clone()))?;

        let participants_matched_total = IntCounterVec::new(
            Opts::new(
                "anteroom_participants_matched_total",
                "Total participants placed into matches",
            ),
            &["source"],
        )?;
        registry.register(Box::new(participants_matched_total.clone()))?;

        let open_slots_total = IntCounter::new(
            "anteroom_open_slots_total",
            "Match slots left for synthetic participants",
        )?;
        registry.register(Box::new(open_slots_total.clone()))?;

        let match_timeouts_total = IntCounter::new(
            "anteroom_match_timeouts_total",
            "Queue entries dropped after the maximum wait time",
        )?;
        registry.register(Box::new(match_timeouts_total.clone()))?;

        Ok(Self {
            matches_total,
            participants_matched_total,
            open_slots_total,
            match_timeouts_total,
        })
    }
}

impl RoomMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_rooms = IntGauge::new("anteroom_active_rooms", "Number of open rooms")?;
        registry.register(Box::new(active_rooms.clone()))?;

        let rooms_created_total =
            IntCounter::new("anteroom_rooms_created_total", "Total rooms created")?;
        registry.register(Box::new(rooms_created_total.clone()))?;

        let rooms_closed_total = IntCounterVec::new(
            Opts::new("anteroom_rooms_closed_total", "Total rooms closed"),
            &["reason"],
        )?;
        registry.register(Box::new(rooms_closed_total.clone()))?;

        let room_membership_total = IntCounterVec::new(
            Opts::new(
                "anteroom_room_membership_total",
                "Room membership changes",
            ),
            &["action"],
        )?;
        registry.register(Box::new(room_membership_total.clone()))?;

        Ok(Self {
            active_rooms,
            rooms_created_total,
            rooms_closed_total,
            room_membership_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let sweep_duration = Histogram::with_opts(
            HistogramOpts::new("anteroom_sweep_duration_seconds", "Matching sweep time")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(sweep_duration.clone()))?;

        let sweeps_total = IntCounterVec::new(
            Opts::new("anteroom_sweeps_total", "Total matching sweeps"),
            &["status"],
        )?;
        registry.register(Box::new(sweeps_total.clone()))?;

        let room_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "anteroom_room_operation_duration_seconds",
                "Room operation duration",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["operation"],
        )?;
        registry.register(Box::new(room_operation_duration.clone()))?;

        Ok(Self {
            sweep_duration,
            sweeps_total,
            room_operation_duration,
        })
    }
}
