//! Test fixtures shared by the integration suites

#![allow(dead_code)]

use anteroom::config::MatchmakerConfig;
use anteroom::events::RecordingSubscriber;
use anteroom::types::{MatchEvent, MatchFound, Player, QueueLabel};
use anteroom::Matchmaker;
use std::sync::Arc;
use std::time::Duration;

pub type TestMatchmaker = Matchmaker<Player, QueueLabel>;
pub type TestRecorder = RecordingSubscriber<Player, QueueLabel>;

/// Deterministic engine: no settling period, no shuffling, 30s maximum wait
pub fn immediate_config() -> MatchmakerConfig {
    MatchmakerConfig::immediate().with_wait_times(Duration::ZERO, Duration::from_secs(30))
}

/// Build a matchmaker with a recording subscriber attached
pub fn create_test_system(config: MatchmakerConfig) -> (Arc<TestMatchmaker>, Arc<TestRecorder>) {
    let matchmaker = Arc::new(Matchmaker::new(config).expect("valid test config"));
    let recorder = Arc::new(RecordingSubscriber::new());
    matchmaker.subscribe(recorder.clone());
    (matchmaker, recorder)
}

pub fn player(id: &str) -> Player {
    Player::new(id)
}

pub fn label(key: &str, size: usize) -> QueueLabel {
    QueueLabel::new(key, size)
}

/// All match-found events the recorder has seen, in order
pub fn matches_found(recorder: &TestRecorder) -> Vec<MatchFound<Player, QueueLabel>> {
    recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            MatchEvent::MatchFound(found) => Some(found),
            _ => None,
        })
        .collect()
}

/// Participants announced as not found, in order
pub fn not_found_ids(recorder: &TestRecorder) -> Vec<String> {
    recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            MatchEvent::MatchNotFound { participant, .. } => Some(participant.id),
            _ => None,
        })
        .collect()
}

pub fn sorted_ids(players: &[Player]) -> Vec<String> {
    let mut ids: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
    ids.sort();
    ids
}
