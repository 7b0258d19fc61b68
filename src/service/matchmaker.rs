//! Matchmaker facade tying the queue, the sweep and the room registry together
//!
//! This is the single entry point for host applications: every queue and
//! room operation, event subscription and the sweep lifecycle go through it.

use crate::config::MatchmakerConfig;
use crate::error::{MatchmakingError, Result};
use crate::events::{EventBus, EventSubscriber, SubscriptionId};
use crate::metrics::MetricsCollector;
use crate::queue::{MatchEngine, SweepReport, SweepScheduler, SweepTarget, WaitingQueue};
use crate::room::{LeaveOutcome, RoomRegistry, RoomSnapshot};
use crate::types::{GroupingCriteria, MatchEvent, MatchFound, Participant, RoomCode};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Statistics about matchmaker operations
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchmakerStats {
    /// Total participants admitted to the queue
    pub participants_queued: u64,
    /// Total participants that left the queue themselves
    pub participants_left: u64,
    /// Total full matches formed by sweeps
    pub queue_matches: u64,
    /// Total under-full matches accepted after the maximum wait time
    pub bot_filled_matches: u64,
    /// Total queue entries dropped without a match
    pub timeouts: u64,
    /// Total rooms created
    pub rooms_created: u64,
    /// Total rooms turned into matches
    pub rooms_started: u64,
    /// Total rooms destroyed by their host leaving
    pub rooms_destroyed: u64,
    /// Total sweeps run
    pub sweeps_run: u64,
    /// Total sweeps that failed or panicked
    pub sweeps_failed: u64,
    /// When the last sweep finished
    pub last_sweep_at: Option<DateTime<Utc>>,
    /// How long the last sweep took
    pub last_sweep_duration: Option<Duration>,
    /// Current number of queued participants
    pub participants_waiting: usize,
    /// Current number of open rooms
    pub active_rooms: usize,
    /// Current number of participants seated in open rooms
    pub participants_in_rooms: usize,
}

/// The matchmaking engine
pub struct Matchmaker<P, C> {
    config: MatchmakerConfig,
    queue: Arc<WaitingQueue<P, C>>,
    engine: MatchEngine<P, C>,
    rooms: RoomRegistry<P, C>,
    events: Arc<EventBus<P, C>>,
    stats: RwLock<MatchmakerStats>,
    metrics_collector: Arc<MetricsCollector>,
    scheduler: Mutex<Option<SweepScheduler>>,
}

impl<P: Participant, C: GroupingCriteria> Matchmaker<P, C> {
    /// Create a matchmaker with its own metrics collector
    pub fn new(config: MatchmakerConfig) -> Result<Self> {
        let metrics_collector = Arc::new(MetricsCollector::new()?);
        Self::with_metrics(config, metrics_collector)
    }

    /// Create a matchmaker reporting into an existing metrics collector
    pub fn with_metrics(
        config: MatchmakerConfig,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(WaitingQueue::new());
        let events = Arc::new(EventBus::new());

        Ok(Self {
            engine: MatchEngine::new(queue.clone(), events.clone(), config.clone()),
            rooms: RoomRegistry::new(events.clone()),
            config,
            queue,
            events,
            stats: RwLock::new(MatchmakerStats::default()),
            metrics_collector,
            scheduler: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &MatchmakerConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Register an event subscriber; delivery follows registration order
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber<P, C>>) -> SubscriptionId {
        self.events.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // Queue operations

    /// Put a participant in the waiting queue
    pub fn join_queue(&self, participant: P, criteria: C) -> Result<()> {
        let admitted = {
            let mut queue = self.queue.lock();
            let admitted = queue.admit(participant, criteria, current_timestamp());
            if let Ok(entry) = &admitted {
                self.events.push(MatchEvent::JoinedQueue {
                    participant: entry.participant.clone(),
                    criteria: entry.criteria.clone(),
                    timestamp: entry.joined_at,
                });
            }
            admitted
        };
        self.events.flush();

        let entry = match admitted {
            Ok(entry) => entry,
            Err(e) => {
                self.metrics_collector.record_queue_join(false);
                return Err(e);
            }
        };

        info!(
            "'{}' joined queue '{}' (match size {})",
            entry.participant.id(),
            entry.criteria.grouping_key(),
            entry.criteria.match_size()
        );

        self.update_stats(|stats| stats.participants_queued += 1);
        self.metrics_collector.record_queue_join(true);
        Ok(())
    }

    /// Take a participant out of the queue; absent is a no-op
    pub fn leave_queue(&self, participant_id: &str) -> Option<P> {
        let entry = {
            let mut queue = self.queue.lock();
            let entry = queue.remove(participant_id)?;
            self.events.push(MatchEvent::LeftQueue {
                participant: entry.participant.clone(),
                criteria: entry.criteria.clone(),
                timestamp: current_timestamp(),
            });
            entry
        };
        self.events.flush();

        info!(
            "'{}' left queue '{}'",
            participant_id,
            entry.criteria.grouping_key()
        );

        self.update_stats(|stats| stats.participants_left += 1);
        self.metrics_collector.record_queue_leave();
        Some(entry.participant)
    }

    /// Queued participants, optionally only those sharing `filter`'s grouping key
    pub fn list_queued_participants(&self, filter: Option<&C>) -> Vec<P> {
        self.queue
            .participants(filter.map(|criteria| criteria.grouping_key()))
    }

    pub fn is_queued(&self, participant_id: &str) -> bool {
        self.queue.contains(participant_id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    // Room operations

    pub fn create_room(&self, host: P, criteria: Option<C>) -> Result<RoomCode> {
        let timer = self.metrics_collector.start_timer();
        let code = self.rooms.create_room(host, criteria)?;

        self.update_stats(|stats| stats.rooms_created += 1);
        self.metrics_collector.record_room_created();
        self.metrics_collector
            .record_room_operation("create", timer.stop());
        Ok(code)
    }

    pub fn join_room(&self, participant: P, code: &str) -> Result<bool> {
        let timer = self.metrics_collector.start_timer();
        let joined = self.rooms.join_room(participant, code)?;

        if joined {
            self.metrics_collector.record_room_membership("joined");
        }
        self.metrics_collector
            .record_room_operation("join", timer.stop());
        Ok(joined)
    }

    pub fn kick_from_room(&self, host_id: &str, target_id: &str, code: &str) -> Result<bool> {
        let timer = self.metrics_collector.start_timer();
        let kicked = self.rooms.kick_from_room(host_id, target_id, code)?;

        if kicked {
            self.metrics_collector.record_room_membership("kicked");
        }
        self.metrics_collector
            .record_room_operation("kick", timer.stop());
        Ok(kicked)
    }

    /// Leave a room; returns false when nothing changed
    pub fn leave_room(&self, participant_id: &str, code: &str) -> Result<bool> {
        let timer = self.metrics_collector.start_timer();
        let outcome = self.rooms.leave_room(participant_id, code)?;

        if let LeaveOutcome::Destroyed { .. } = outcome {
            self.update_stats(|stats| stats.rooms_destroyed += 1);
        }
        self.metrics_collector.record_room_left(&outcome);
        self.metrics_collector
            .record_room_operation("leave", timer.stop());
        Ok(outcome.changed())
    }

    pub fn start_room(&self, host_id: &str, code: &str, force: bool) -> Result<MatchFound<P, C>> {
        let timer = self.metrics_collector.start_timer();
        let found = self.rooms.start_room(host_id, code, force)?;

        self.update_stats(|stats| stats.rooms_started += 1);
        self.metrics_collector.record_room_started();
        self.metrics_collector.record_match(
            &found.source,
            found.participants.len(),
            found.open_slots,
        );
        self.metrics_collector
            .record_room_operation("start", timer.stop());
        Ok(found)
    }

    pub fn update_room_label(&self, host_id: &str, code: &str, criteria: Option<C>) -> Result<()> {
        let timer = self.metrics_collector.start_timer();
        self.rooms.update_room_label(host_id, code, criteria)?;
        self.metrics_collector
            .record_room_operation("update_label", timer.stop());
        Ok(())
    }

    pub fn get_room(&self, code: &str) -> Result<Option<RoomSnapshot<P, C>>> {
        self.rooms.get_room(code)
    }

    pub fn list_rooms(&self) -> Result<Vec<RoomSnapshot<P, C>>> {
        self.rooms.list_rooms()
    }

    pub fn room_code_for(&self, participant_id: &str) -> Option<RoomCode> {
        self.rooms.room_code_for(participant_id)
    }

    // Sweep lifecycle

    /// Run one sweep now, independent of the scheduler
    pub fn run_sweep(&self) -> Result<SweepReport> {
        self.run_sweep_at(current_timestamp())
    }

    /// Run one sweep judging wait times against `now`
    pub fn run_sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let report = self.engine.sweep_at(now);

        self.update_stats(|stats| {
            stats.sweeps_run += 1;
            stats.queue_matches += report.matches_found as u64;
            stats.bot_filled_matches += report.bot_filled as u64;
            stats.timeouts += report.timed_out as u64;
            stats.last_sweep_at = report.swept_at;
            stats.last_sweep_duration = Some(report.duration);
        });

        self.metrics_collector.record_sweep(&report);
        Ok(report)
    }

    /// Start the periodic sweep; a no-op if already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(MatchmakingError::InternalError {
                message: "Matchmaker::start requires a tokio runtime".to_string(),
            }
            .into());
        }

        let mut scheduler = self
            .scheduler
            .lock()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire scheduler lock".to_string(),
            })?;

        if scheduler.is_some() {
            debug!("Matchmaker already running");
            return Ok(());
        }

        let target: Arc<dyn SweepTarget> = self.clone();
        *scheduler = Some(SweepScheduler::spawn(target, self.config.sweep_interval));

        info!(
            "Matchmaker started - sweep every {:?}, min wait {:?}, max wait {:?}, shuffle: {}, bot fill: {}",
            self.config.sweep_interval,
            self.config.minimum_wait_time,
            self.config.maximum_wait_time,
            self.config.shuffle_players,
            self.config.enable_bot_fill
        );
        Ok(())
    }

    /// Stop the periodic sweep, waiting for an in-flight sweep to finish
    pub async fn stop(&self) {
        let scheduler = match self.scheduler.lock() {
            Ok(mut scheduler) => scheduler.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match scheduler {
            Some(scheduler) => {
                scheduler.shutdown().await;
                info!("Matchmaker stopped");
            }
            None => debug!("Matchmaker was not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .map(|scheduler| scheduler.as_ref().map_or(false, |s| !s.is_finished()))
            .unwrap_or(false)
    }

    /// Get matchmaker statistics
    pub fn get_stats(&self) -> Result<MatchmakerStats> {
        let mut stats = self
            .stats
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?
            .clone();

        stats.participants_waiting = self.queue.len();
        stats.active_rooms = self.rooms.room_count();
        stats.participants_in_rooms = self.rooms.occupant_count();
        Ok(stats)
    }

    fn update_stats(&self, update: impl FnOnce(&mut MatchmakerStats)) {
        match self.stats.write() {
            Ok(mut stats) => update(&mut stats),
            Err(_) => warn!("Failed to acquire stats lock, statistics not updated"),
        }
    }
}

impl<P: Participant, C: GroupingCriteria> SweepTarget for Matchmaker<P, C> {
    fn run_sweep(&self) -> Result<SweepReport> {
        Matchmaker::run_sweep(self)
    }

    fn record_sweep_failure(&self) {
        self.update_stats(|stats| stats.sweeps_failed += 1);
        self.metrics_collector.record_sweep_failure();
    }
}
