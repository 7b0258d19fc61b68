//! Registry of live rooms and of which room each participant occupies
//!
//! Both indices are concurrent maps. Room handles are cloned out of the map
//! before a room lock is taken, and every operation re-checks the room state
//! under that lock, so an operation racing with a start or destroy sees the
//! room as gone. Events are enqueued on the bus under the room lock and
//! delivered after it is released.

use crate::error::{MatchmakingError, Result};
use crate::events::EventBus;
use crate::room::instance::{Room, RoomSnapshot, RoomState};
use crate::types::{
    GroupingCriteria, MatchEvent, MatchFound, MatchSource, Participant, PlayerId, RoomCode,
};
use crate::utils::{current_timestamp, generate_match_id, generate_room_code};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Give up issuing a code after this many consecutive collisions
const MAX_CODE_ATTEMPTS: usize = 10_000;

/// Result of a leave request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Unknown code, closed room, or not a member
    NotMember,
    /// A non-host member left
    Left,
    /// The host left and the room was destroyed with this many members
    Destroyed { members: usize },
}

impl LeaveOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, LeaveOutcome::NotMember)
    }
}

pub struct RoomRegistry<P, C> {
    rooms: DashMap<RoomCode, Arc<Room<P, C>>>,
    participant_rooms: DashMap<PlayerId, RoomCode>,
    events: Arc<EventBus<P, C>>,
}

impl<P: Participant, C: GroupingCriteria> RoomRegistry<P, C> {
    pub fn new(events: Arc<EventBus<P, C>>) -> Self {
        Self {
            rooms: DashMap::new(),
            participant_rooms: DashMap::new(),
            events,
        }
    }

    /// Open a room with `host` as its sole member and return its code
    pub fn create_room(&self, host: P, criteria: Option<C>) -> Result<RoomCode> {
        let host_id = host.id().to_string();

        if let Some(existing) = self.room_code_for(&host_id) {
            return Err(MatchmakingError::AlreadyInRoom {
                participant_id: host_id,
                code: existing,
            }
            .into());
        }

        let mut attempts = 0;
        let code = loop {
            attempts += 1;
            if attempts > MAX_CODE_ATTEMPTS {
                return Err(MatchmakingError::InternalError {
                    message: format!(
                        "No free room code after {} attempts ({} live rooms)",
                        MAX_CODE_ATTEMPTS,
                        self.rooms.len()
                    ),
                }
                .into());
            }

            let code = generate_room_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => {
                    debug!("Room code {} already live, retrying", code);
                    continue;
                }
                Entry::Vacant(slot) => {
                    match self.participant_rooms.entry(host_id.clone()) {
                        Entry::Occupied(existing) => {
                            return Err(MatchmakingError::AlreadyInRoom {
                                participant_id: host_id,
                                code: existing.get().clone(),
                            }
                            .into());
                        }
                        Entry::Vacant(index) => {
                            index.insert(code.clone());
                        }
                    }
                    self.events.push(MatchEvent::JoinedRoom {
                        participant: host.clone(),
                        code: code.clone(),
                        timestamp: current_timestamp(),
                    });
                    slot.insert(Arc::new(Room::new(code.clone(), host, criteria)));
                    break code;
                }
            }
        };

        self.events.flush();

        info!("Room {} created by '{}'", code, host_id);
        Ok(code)
    }

    /// Add a participant to an open room
    ///
    /// Returns false for an unknown or closed room, an existing member, or a
    /// participant who already occupies another room.
    pub fn join_room(&self, participant: P, code: &str) -> Result<bool> {
        let Some(room) = self.room(code) else {
            debug!("'{}' tried to join unknown room {}", participant.id(), code);
            return Ok(false);
        };

        {
            let mut guard = room.lock()?;
            if !guard.is_open() || guard.contains(participant.id()) {
                return Ok(false);
            }

            match self.participant_rooms.entry(participant.id().to_string()) {
                Entry::Occupied(existing) => {
                    debug!(
                        "'{}' cannot join room {}: already in room {}",
                        participant.id(),
                        code,
                        existing.get()
                    );
                    return Ok(false);
                }
                Entry::Vacant(index) => {
                    index.insert(code.to_string());
                }
            }
            debug!("'{}' joined room {}", participant.id(), code);
            guard.add_member(participant.clone());
            self.events.push(MatchEvent::JoinedRoom {
                participant,
                code: code.to_string(),
                timestamp: current_timestamp(),
            });
        }

        self.events.flush();
        Ok(true)
    }

    /// Remove a member at the host's request
    pub fn kick_from_room(&self, host_id: &str, target_id: &str, code: &str) -> Result<bool> {
        let room = self.authorized_room(host_id, code)?;

        if target_id == host_id {
            debug!("Host '{}' cannot kick themselves from room {}", host_id, code);
            return Ok(false);
        }

        {
            let mut guard = room.lock()?;
            if !guard.is_open() {
                return Err(room_not_found(code));
            }
            let Some(participant) = guard.remove_member(target_id) else {
                return Ok(false);
            };
            self.release_index(target_id, code);
            self.events.push(MatchEvent::KickedFromRoom {
                participant,
                code: code.to_string(),
                timestamp: current_timestamp(),
            });
        }

        self.events.flush();
        info!("'{}' kicked '{}' from room {}", host_id, target_id, code);
        Ok(true)
    }

    /// Leave a room; the host leaving destroys it for everyone
    pub fn leave_room(&self, participant_id: &str, code: &str) -> Result<LeaveOutcome> {
        let Some(room) = self.room(code) else {
            return Ok(LeaveOutcome::NotMember);
        };

        let outcome = {
            let mut guard = room.lock()?;
            if !guard.is_open() {
                return Ok(LeaveOutcome::NotMember);
            }

            if room.is_host(participant_id) {
                let members = guard.close(RoomState::Destroyed);
                self.retire(&room, &members);
                self.events.push(MatchEvent::RoomDestroyed {
                    code: code.to_string(),
                    timestamp: current_timestamp(),
                });
                LeaveOutcome::Destroyed {
                    members: members.len(),
                }
            } else {
                let Some(participant) = guard.remove_member(participant_id) else {
                    return Ok(LeaveOutcome::NotMember);
                };
                self.release_index(participant_id, code);
                self.events.push(MatchEvent::LeftRoom {
                    participant,
                    code: code.to_string(),
                    timestamp: current_timestamp(),
                });
                LeaveOutcome::Left
            }
        };
        self.events.flush();

        match &outcome {
            LeaveOutcome::Destroyed { members } => {
                info!("Host left room {}, destroyed with {} members", code, members)
            }
            _ => debug!("'{}' left room {}", participant_id, code),
        }
        Ok(outcome)
    }

    /// Turn the room into a match
    ///
    /// Without `force`, a room that has criteria must hold exactly the
    /// required number of members. A room without criteria always starts.
    pub fn start_room(&self, host_id: &str, code: &str, force: bool) -> Result<MatchFound<P, C>> {
        let room = self.authorized_room(host_id, code)?;

        let found = {
            let mut guard = room.lock()?;
            if !guard.is_open() {
                return Err(room_not_found(code));
            }

            let criteria = guard.criteria().cloned();
            if let Some(criteria) = &criteria {
                let required = criteria.match_size();
                if !force && guard.member_count() != required {
                    return Err(MatchmakingError::InvalidState {
                        reason: format!(
                            "room {} has {} members but '{}' needs {}",
                            code,
                            guard.member_count(),
                            criteria.grouping_key(),
                            required
                        ),
                    }
                    .into());
                }
            }

            let members = guard.close(RoomState::Started);
            self.retire(&room, &members);

            let open_slots = criteria
                .as_ref()
                .map(|c| c.match_size().saturating_sub(members.len()))
                .unwrap_or(0);

            let found = MatchFound {
                match_id: generate_match_id(),
                participants: members,
                criteria,
                source: MatchSource::Room {
                    code: code.to_string(),
                },
                open_slots,
                timestamp: current_timestamp(),
            };
            self.events.push(MatchEvent::MatchFound(found.clone()));
            found
        };
        self.events.flush();

        info!(
            "Room {} started by '{}' with {} participants (forced: {})",
            code,
            host_id,
            found.participants.len(),
            force
        );
        Ok(found)
    }

    /// Replace (or clear) the room's criteria; member count is not checked
    pub fn update_room_label(&self, host_id: &str, code: &str, criteria: Option<C>) -> Result<()> {
        let room = self.authorized_room(host_id, code)?;

        {
            let mut guard = room.lock()?;
            if !guard.is_open() {
                return Err(room_not_found(code));
            }
            debug!(
                "Room {} label set to {:?}",
                code,
                criteria.as_ref().map(|c| c.grouping_key())
            );
            guard.set_criteria(criteria.clone());
            self.events.push(MatchEvent::LabelUpdated {
                code: code.to_string(),
                criteria,
                timestamp: current_timestamp(),
            });
        }

        self.events.flush();
        Ok(())
    }

    pub fn get_room(&self, code: &str) -> Result<Option<RoomSnapshot<P, C>>> {
        let Some(room) = self.room(code) else {
            return Ok(None);
        };
        let snapshot = room.snapshot()?;
        Ok((snapshot.state == RoomState::Open).then_some(snapshot))
    }

    /// Snapshots of every open room, oldest first
    pub fn list_rooms(&self) -> Result<Vec<RoomSnapshot<P, C>>> {
        let rooms: Vec<Arc<Room<P, C>>> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut snapshots = Vec::with_capacity(rooms.len());
        for room in rooms {
            let snapshot = room.snapshot()?;
            if snapshot.state == RoomState::Open {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));
        Ok(snapshots)
    }

    pub fn room_code_for(&self, participant_id: &str) -> Option<RoomCode> {
        self.participant_rooms
            .get(participant_id)
            .map(|code| code.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Participants currently seated in any room
    pub fn occupant_count(&self) -> usize {
        self.participant_rooms.len()
    }

    fn room(&self, code: &str) -> Option<Arc<Room<P, C>>> {
        self.rooms.get(code).map(|room| room.value().clone())
    }

    fn authorized_room(&self, host_id: &str, code: &str) -> Result<Arc<Room<P, C>>> {
        let room = self.room(code).ok_or_else(|| room_not_found(code))?;
        if !room.is_host(host_id) {
            warn!(
                "'{}' attempted a host-only action on room {} (host is '{}')",
                host_id,
                code,
                room.host_id()
            );
            return Err(MatchmakingError::Unauthorized {
                participant_id: host_id.to_string(),
                code: code.to_string(),
            }
            .into());
        }
        Ok(room)
    }

    /// Drop a participant's index entry if it still points at `code`
    fn release_index(&self, participant_id: &str, code: &str) {
        self.participant_rooms
            .remove_if(participant_id, |_, indexed| indexed == code);
    }

    /// Unregister a room that has just reached a terminal state
    fn retire(&self, room: &Arc<Room<P, C>>, members: &[P]) {
        for member in members {
            self.release_index(member.id(), room.code());
        }
        self.rooms
            .remove_if(room.code(), |_, live| Arc::ptr_eq(live, room));
    }
}

fn room_not_found(code: &str) -> anyhow::Error {
    MatchmakingError::RoomNotFound {
        code: code.to_string(),
    }
    .into()
}
