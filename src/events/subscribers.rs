//! Stock event subscribers

use crate::events::bus::EventSubscriber;
use crate::types::{GroupingCriteria, MatchEvent, Participant};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

/// Logs every outcome through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSubscriber;

impl<P: Participant, C: GroupingCriteria> EventSubscriber<P, C> for LoggingSubscriber {
    fn on_event(&self, event: &MatchEvent<P, C>) {
        match event {
            MatchEvent::JoinedQueue {
                participant,
                criteria,
                ..
            } => debug!(
                "'{}' joined queue '{}'",
                participant.id(),
                criteria.grouping_key()
            ),
            MatchEvent::LeftQueue {
                participant,
                criteria,
                ..
            } => debug!(
                "'{}' left queue '{}'",
                participant.id(),
                criteria.grouping_key()
            ),
            MatchEvent::MatchFound(found) => {
                let ids: Vec<&str> = found.participants.iter().map(|p| p.id()).collect();
                info!(
                    "Match {} found ({}) - key: {}, participants: {:?}, open_slots: {}",
                    found.match_id,
                    found.source,
                    found
                        .criteria
                        .as_ref()
                        .map(|c| c.grouping_key())
                        .unwrap_or("<none>"),
                    ids,
                    found.open_slots
                );
            }
            MatchEvent::MatchNotFound {
                participant,
                criteria,
                ..
            } => info!(
                "No match found for '{}' in '{}' before the maximum wait time",
                participant.id(),
                criteria.grouping_key()
            ),
            MatchEvent::JoinedRoom {
                participant, code, ..
            } => debug!("'{}' joined room {}", participant.id(), code),
            MatchEvent::LeftRoom {
                participant, code, ..
            } => debug!("'{}' left room {}", participant.id(), code),
            MatchEvent::KickedFromRoom {
                participant, code, ..
            } => info!("'{}' was kicked from room {}", participant.id(), code),
            MatchEvent::RoomDestroyed { code, .. } => info!("Room {} destroyed", code),
            MatchEvent::LabelUpdated { code, criteria, .. } => debug!(
                "Room {} label updated to {:?}",
                code,
                criteria.as_ref().map(|c| c.grouping_key())
            ),
        }
    }
}

/// Async stream of events produced by a [`ChannelSubscriber`]
pub type EventStream<P, C> = UnboundedReceiverStream<MatchEvent<P, C>>;

/// Forwards events into an unbounded channel for async consumers
pub struct ChannelSubscriber<P, C> {
    sender: mpsc::UnboundedSender<MatchEvent<P, C>>,
}

impl<P, C> ChannelSubscriber<P, C> {
    pub fn new() -> (Self, EventStream<P, C>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, UnboundedReceiverStream::new(receiver))
    }
}

impl<P, C> EventSubscriber<P, C> for ChannelSubscriber<P, C>
where
    P: Clone + Send + Sync,
    C: Clone + Send + Sync,
{
    fn on_event(&self, event: &MatchEvent<P, C>) {
        if self.sender.send(event.clone()).is_err() {
            debug!("Event stream receiver dropped, discarding {} event", event.kind());
        }
    }
}

/// Captures published events in memory (for testing and tooling)
pub struct RecordingSubscriber<P, C> {
    events: Mutex<Vec<MatchEvent<P, C>>>,
}

impl<P, C> Default for RecordingSubscriber<P, C> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<P: Clone, C: Clone> RecordingSubscriber<P, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events
    pub fn events(&self) -> Vec<MatchEvent<P, C>> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events of a specific kind (see [`MatchEvent::kind`])
    pub fn count_of(&self, kind: &str) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.kind() == kind).count())
            .unwrap_or(0)
    }

    /// Kinds of all recorded events, in order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(|e| e.kind()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl<P, C> EventSubscriber<P, C> for RecordingSubscriber<P, C>
where
    P: Clone + Send + Sync,
    C: Clone + Send + Sync,
{
    fn on_event(&self, event: &MatchEvent<P, C>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
