//! Waiting queue of participants looking for a match
//!
//! A single mutex guards the entries. Joins and removals take it briefly;
//! a matching sweep takes it through [`WaitingQueue::lock`] and holds it for
//! the whole sweep, removing matched entries through the same guard.

use crate::error::{MatchmakingError, Result};
use crate::types::{GroupingCriteria, Participant};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// A participant waiting under some grouping criteria
#[derive(Debug, Clone)]
pub struct QueueEntry<P, C> {
    pub participant: P,
    pub criteria: C,
    pub joined_at: DateTime<Utc>,
}

/// Ordered, mutation-safe collection of queue entries
pub struct WaitingQueue<P, C> {
    entries: Mutex<Vec<QueueEntry<P, C>>>,
}

/// Exclusive access to the queue for the duration of a sweep
pub struct QueueGuard<'a, P, C> {
    entries: MutexGuard<'a, Vec<QueueEntry<P, C>>>,
}

impl<P, C> Default for WaitingQueue<P, C> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<P: Participant, C: GroupingCriteria> WaitingQueue<P, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the queue lock
    ///
    /// A lock poisoned by a panicking sweep is recovered: the entries are
    /// plain data and every mutation leaves them consistent.
    pub fn lock(&self) -> QueueGuard<'_, P, C> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Waiting queue lock was poisoned, recovering");
            poisoned.into_inner()
        });
        QueueGuard { entries }
    }

    /// Append a participant, stamped with the current time
    ///
    /// A participant holds at most one entry; a second join is rejected.
    pub fn join(&self, participant: P, criteria: C) -> Result<QueueEntry<P, C>> {
        self.join_at(participant, criteria, current_timestamp())
    }

    pub(crate) fn join_at(
        &self,
        participant: P,
        criteria: C,
        joined_at: DateTime<Utc>,
    ) -> Result<QueueEntry<P, C>> {
        self.lock().admit(participant, criteria, joined_at)
    }

    /// Remove a participant's entry; absent is a no-op
    pub fn remove(&self, participant_id: &str) -> Option<QueueEntry<P, C>> {
        self.lock().remove(participant_id)
    }

    /// Point-in-time copy of all entries in admission order
    pub fn snapshot(&self) -> Vec<QueueEntry<P, C>> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.lock().contains(participant_id)
    }

    /// Queued participants, optionally only those under one grouping key
    pub fn participants(&self, grouping_key: Option<&str>) -> Vec<P> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| grouping_key.map_or(true, |key| entry.criteria.grouping_key() == key))
            .map(|entry| entry.participant.clone())
            .collect()
    }
}

impl<P: Participant, C: GroupingCriteria> QueueGuard<'_, P, C> {
    /// Append an entry under the held lock, rejecting a second entry for
    /// the same participant
    pub fn admit(
        &mut self,
        participant: P,
        criteria: C,
        joined_at: DateTime<Utc>,
    ) -> Result<QueueEntry<P, C>> {
        if self.contains(participant.id()) {
            return Err(MatchmakingError::AlreadyQueued {
                participant_id: participant.id().to_string(),
            }
            .into());
        }

        let entry = QueueEntry {
            participant,
            criteria,
            joined_at,
        };
        self.entries.push(entry.clone());

        debug!(
            "Queued '{}' under '{}' ({} waiting)",
            entry.participant.id(),
            entry.criteria.grouping_key(),
            self.len()
        );
        Ok(entry)
    }

    pub fn snapshot(&self) -> Vec<QueueEntry<P, C>> {
        self.entries.clone()
    }

    pub fn remove(&mut self, participant_id: &str) -> Option<QueueEntry<P, C>> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.participant.id() == participant_id)?;
        Some(self.entries.remove(position))
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.participant.id() == participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
