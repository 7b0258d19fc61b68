//! Common types used throughout the matchmaking engine
//!
//! The engine is generic over the host application's participant and
//! grouping-criteria types; only the capabilities below are required.
//! [`Player`] and [`QueueLabel`] are simple implementations used by the
//! bundled binaries and tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Six-digit decimal room code
pub type RoomCode = String;

/// Unique identifier for assembled matches
pub type MatchId = Uuid;

/// Something that can wait in the queue or sit in a room
pub trait Participant: Clone + Debug + Send + Sync + 'static {
    /// Stable, unique identifier
    fn id(&self) -> &str;
}

/// Describes which participants can be matched together and how many
/// of them one match needs
pub trait GroupingCriteria: Clone + Debug + Send + Sync + 'static {
    /// Participants sharing a key are matchable against each other
    fn grouping_key(&self) -> &str;

    /// Number of participants required for one match (positive)
    fn match_size(&self) -> usize;
}

/// Default participant implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

impl Participant for Player {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Default grouping criteria: a game mode key plus the players it needs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueLabel {
    pub key: String,
    pub match_size: usize,
}

impl QueueLabel {
    pub fn new(key: impl Into<String>, match_size: usize) -> Self {
        Self {
            key: key.into(),
            match_size,
        }
    }
}

impl GroupingCriteria for QueueLabel {
    fn grouping_key(&self) -> &str {
        &self.key
    }

    fn match_size(&self) -> usize {
        self.match_size
    }
}

/// How a match was assembled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSource {
    /// A full group of ready queue entries
    Queue,
    /// An under-full group accepted after the maximum wait time
    BotFill,
    /// A room started by its host
    Room { code: RoomCode },
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchSource::Queue => write!(f, "queue"),
            MatchSource::BotFill => write!(f, "bot_fill"),
            MatchSource::Room { .. } => write!(f, "room"),
        }
    }
}

/// Event emitted when a set of participants has been matched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFound<P, C> {
    pub match_id: MatchId,
    pub participants: Vec<P>,
    /// Absent only for rooms started without a label
    pub criteria: Option<C>,
    pub source: MatchSource,
    /// Slots the consumer must fill with synthetic participants
    pub open_slots: usize,
    pub timestamp: DateTime<Utc>,
}

/// Outcomes announced to subscribers, in the order they were produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchEvent<P, C> {
    JoinedQueue {
        participant: P,
        criteria: C,
        timestamp: DateTime<Utc>,
    },
    LeftQueue {
        participant: P,
        criteria: C,
        timestamp: DateTime<Utc>,
    },
    MatchFound(MatchFound<P, C>),
    MatchNotFound {
        participant: P,
        criteria: C,
        timestamp: DateTime<Utc>,
    },
    JoinedRoom {
        participant: P,
        code: RoomCode,
        timestamp: DateTime<Utc>,
    },
    LeftRoom {
        participant: P,
        code: RoomCode,
        timestamp: DateTime<Utc>,
    },
    KickedFromRoom {
        participant: P,
        code: RoomCode,
        timestamp: DateTime<Utc>,
    },
    RoomDestroyed {
        code: RoomCode,
        timestamp: DateTime<Utc>,
    },
    LabelUpdated {
        code: RoomCode,
        criteria: Option<C>,
        timestamp: DateTime<Utc>,
    },
}

impl<P, C> MatchEvent<P, C> {
    /// Short event name for logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            MatchEvent::JoinedQueue { .. } => "joined_queue",
            MatchEvent::LeftQueue { .. } => "left_queue",
            MatchEvent::MatchFound(_) => "match_found",
            MatchEvent::MatchNotFound { .. } => "match_not_found",
            MatchEvent::JoinedRoom { .. } => "joined_room",
            MatchEvent::LeftRoom { .. } => "left_room",
            MatchEvent::KickedFromRoom { .. } => "kicked_from_room",
            MatchEvent::RoomDestroyed { .. } => "room_destroyed",
            MatchEvent::LabelUpdated { .. } => "label_updated",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MatchEvent::JoinedQueue { timestamp, .. }
            | MatchEvent::LeftQueue { timestamp, .. }
            | MatchEvent::MatchNotFound { timestamp, .. }
            | MatchEvent::JoinedRoom { timestamp, .. }
            | MatchEvent::LeftRoom { timestamp, .. }
            | MatchEvent::KickedFromRoom { timestamp, .. }
            | MatchEvent::RoomDestroyed { timestamp, .. }
            | MatchEvent::LabelUpdated { timestamp, .. } => *timestamp,
            MatchEvent::MatchFound(found) => found.timestamp,
        }
    }
}
