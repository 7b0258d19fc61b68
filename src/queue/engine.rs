//! Periodic matching over the waiting queue
//!
//! One sweep partitions the queue by grouping key and, per group, forms full
//! matches from entries that have settled for the minimum wait time. Groups
//! whose head has waited past the maximum wait time are either bot-filled or
//! timed out one entry at a time. Outcomes are enqueued on the event bus while
//! the queue lock is held and delivered after it is released.

use crate::config::MatchmakerConfig;
use crate::events::EventBus;
use crate::queue::waiting::{QueueEntry, QueueGuard, WaitingQueue};
use crate::types::{GroupingCriteria, MatchEvent, MatchFound, MatchSource, Participant};
use crate::utils::{current_timestamp, elapsed_between, generate_match_id};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Summary of a single sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Full matches formed from ready entries
    pub matches_found: usize,
    /// Under-full matches accepted after the maximum wait time
    pub bot_filled: usize,
    /// Entries dropped with a match-not-found outcome
    pub timed_out: usize,
    /// Participants removed from the queue into any match
    pub participants_matched: usize,
    /// Of those, participants placed into bot-filled matches
    pub bot_filled_participants: usize,
    /// Slots left for synthetic participants across bot-filled matches
    pub open_slots: usize,
    /// Queue length once the sweep finished
    pub remaining: usize,
    pub duration: Duration,
    pub swept_at: Option<DateTime<Utc>>,
}

impl SweepReport {
    pub fn total_matches(&self) -> usize {
        self.matches_found + self.bot_filled
    }

    pub fn is_idle(&self) -> bool {
        self.total_matches() == 0 && self.timed_out == 0
    }
}

/// Forms matches from the waiting queue
pub struct MatchEngine<P, C> {
    queue: Arc<WaitingQueue<P, C>>,
    events: Arc<EventBus<P, C>>,
    config: MatchmakerConfig,
}

impl<P: Participant, C: GroupingCriteria> MatchEngine<P, C> {
    pub fn new(
        queue: Arc<WaitingQueue<P, C>>,
        events: Arc<EventBus<P, C>>,
        config: MatchmakerConfig,
    ) -> Self {
        Self {
            queue,
            events,
            config,
        }
    }

    pub fn config(&self) -> &MatchmakerConfig {
        &self.config
    }

    /// Run one sweep against the current wall clock
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(current_timestamp())
    }

    /// Run one sweep, judging wait times against `now`
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let started = Instant::now();
        let mut report = SweepReport {
            swept_at: Some(now),
            ..SweepReport::default()
        };

        {
            let mut queue = self.queue.lock();
            let events = self.match_groups(&mut queue, now, &mut report);
            report.remaining = queue.len();
            self.events.enqueue(events);
        }

        self.events.flush();
        report.duration = started.elapsed();

        if !report.is_idle() {
            info!(
                "Sweep formed {} matches ({} bot-filled), timed out {}, {} still waiting",
                report.total_matches(),
                report.bot_filled,
                report.timed_out,
                report.remaining
            );
        }
        report
    }

    fn match_groups(
        &self,
        queue: &mut QueueGuard<'_, P, C>,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Vec<MatchEvent<P, C>> {
        let mut events = Vec::new();
        let entries = queue.snapshot();
        if entries.is_empty() {
            return events;
        }

        for (key, mut group) in partition_by_key(entries) {
            if self.config.shuffle_players {
                group.shuffle(&mut rand::thread_rng());
            }

            let mut ready: VecDeque<QueueEntry<P, C>> = group
                .into_iter()
                .filter(|entry| {
                    elapsed_between(entry.joined_at, now) >= self.config.minimum_wait_time
                })
                .collect();

            debug!("Sweeping group '{}' with {} ready entries", key, ready.len());

            loop {
                let (size, waited) = match ready.front() {
                    Some(head) => (
                        head.criteria.match_size().max(1),
                        elapsed_between(head.joined_at, now),
                    ),
                    None => break,
                };

                if ready.len() >= size {
                    let matched: Vec<_> = ready.drain(..size).collect();
                    events.push(self.take_match(queue, matched, MatchSource::Queue, size, now));
                    report.matches_found += 1;
                    report.participants_matched += size;
                    continue;
                }

                if waited < self.config.maximum_wait_time {
                    break;
                }

                if self.config.enable_bot_fill {
                    let matched: Vec<_> = ready.drain(..).collect();
                    report.participants_matched += matched.len();
                    report.bot_filled_participants += matched.len();
                    report.open_slots += size.saturating_sub(matched.len());
                    events.push(self.take_match(queue, matched, MatchSource::BotFill, size, now));
                    report.bot_filled += 1;
                    break;
                }

                if let Some(expired) = ready.pop_front() {
                    queue.remove(expired.participant.id());
                    debug!(
                        "'{}' waited {:?} in '{}' without a match",
                        expired.participant.id(),
                        waited,
                        key
                    );
                    events.push(MatchEvent::MatchNotFound {
                        participant: expired.participant,
                        criteria: expired.criteria,
                        timestamp: now,
                    });
                    report.timed_out += 1;
                }
            }
        }

        events
    }

    /// Remove `matched` from the queue and build its match-found event
    ///
    /// `matched` is never empty: `size` is at least one and the caller only
    /// drains a non-empty ready list.
    fn take_match(
        &self,
        queue: &mut QueueGuard<'_, P, C>,
        matched: Vec<QueueEntry<P, C>>,
        source: MatchSource,
        size: usize,
        now: DateTime<Utc>,
    ) -> MatchEvent<P, C> {
        for entry in &matched {
            queue.remove(entry.participant.id());
        }

        let criteria = matched.first().map(|entry| entry.criteria.clone());
        let open_slots = size.saturating_sub(matched.len());
        let participants = matched.into_iter().map(|entry| entry.participant).collect();

        MatchEvent::MatchFound(MatchFound {
            match_id: generate_match_id(),
            participants,
            criteria,
            source,
            open_slots,
            timestamp: now,
        })
    }
}

/// Stable partition by grouping key, groups ordered by first appearance
fn partition_by_key<P, C: GroupingCriteria>(
    entries: Vec<QueueEntry<P, C>>,
) -> Vec<(String, Vec<QueueEntry<P, C>>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<QueueEntry<P, C>>)> = Vec::new();

    for entry in entries {
        let key = entry.criteria.grouping_key().to_string();
        match positions.get(&key) {
            Some(&index) => groups[index].1.push(entry),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![entry]));
            }
        }
    }

    groups
}
