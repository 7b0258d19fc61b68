//! Host-controlled private room
//!
//! A room's host is fixed at creation. Membership, criteria and lifecycle
//! state live behind the room's own mutex so rooms proceed independently.

use crate::error::{MatchmakingError, Result};
use crate::types::{Participant, PlayerId, RoomCode};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Room lifecycle; `Started` and `Destroyed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Open,
    Started,
    Destroyed,
}

impl RoomState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RoomState::Open)
    }
}

/// Read-only view of a room at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot<P, C> {
    pub code: RoomCode,
    pub host: P,
    pub criteria: Option<C>,
    pub members: Vec<P>,
    pub state: RoomState,
    pub created_at: DateTime<Utc>,
}

impl<P: Participant, C> RoomSnapshot<P, C> {
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

struct RoomInner<P, C> {
    criteria: Option<C>,
    members: Vec<P>,
    state: RoomState,
}

pub struct Room<P, C> {
    code: RoomCode,
    host: P,
    created_at: DateTime<Utc>,
    inner: Mutex<RoomInner<P, C>>,
}

/// Exclusive access to a room's mutable state
pub struct RoomGuard<'a, P, C> {
    inner: MutexGuard<'a, RoomInner<P, C>>,
}

impl<P: Participant, C: Clone> Room<P, C> {
    /// Create an open room whose only member is the host
    pub fn new(code: RoomCode, host: P, criteria: Option<C>) -> Self {
        Self {
            code,
            inner: Mutex::new(RoomInner {
                criteria,
                members: vec![host.clone()],
                state: RoomState::Open,
            }),
            host,
            created_at: current_timestamp(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host_id(&self) -> &str {
        self.host.id()
    }

    pub fn is_host(&self, participant_id: &str) -> bool {
        self.host.id() == participant_id
    }

    pub fn lock(&self) -> Result<RoomGuard<'_, P, C>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| MatchmakingError::InternalError {
                message: format!("Failed to acquire lock for room {}", self.code),
            })?;
        Ok(RoomGuard { inner })
    }

    pub fn snapshot(&self) -> Result<RoomSnapshot<P, C>> {
        let guard = self.lock()?;
        Ok(RoomSnapshot {
            code: self.code.clone(),
            host: self.host.clone(),
            criteria: guard.inner.criteria.clone(),
            members: guard.inner.members.clone(),
            state: guard.inner.state,
            created_at: self.created_at,
        })
    }
}

impl<P: Participant, C> RoomGuard<'_, P, C> {
    pub fn state(&self) -> RoomState {
        self.inner.state
    }

    pub fn is_open(&self) -> bool {
        self.inner.state == RoomState::Open
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.inner.members.iter().any(|m| m.id() == participant_id)
    }

    pub fn member_count(&self) -> usize {
        self.inner.members.len()
    }

    pub fn criteria(&self) -> Option<&C> {
        self.inner.criteria.as_ref()
    }

    pub fn set_criteria(&mut self, criteria: Option<C>) {
        self.inner.criteria = criteria;
    }

    /// Append a member; false if already present
    pub fn add_member(&mut self, participant: P) -> bool {
        if self.contains(participant.id()) {
            return false;
        }
        self.inner.members.push(participant);
        true
    }

    pub fn remove_member(&mut self, participant_id: &str) -> Option<P> {
        let position = self
            .inner
            .members
            .iter()
            .position(|m| m.id() == participant_id)?;
        Some(self.inner.members.remove(position))
    }

    /// Move the room into a terminal state, handing back its members in join order
    pub fn close(&mut self, state: RoomState) -> Vec<P> {
        debug_assert!(state.is_terminal());
        self.inner.state = state;
        std::mem::take(&mut self.inner.members)
    }
}
