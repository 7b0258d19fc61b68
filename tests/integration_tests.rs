//! Integration tests for the anteroom matchmaking engine
//!
//! These tests validate the system working together, including:
//! - Queue matching, bot fill and timeouts across sweeps
//! - Room lifecycle and host authority
//! - Event ordering as seen by subscribers
//! - Concurrent request handling

// Modules for organizing tests
mod fixtures;
mod integration;
mod load;

use anteroom::config::MatchmakerConfig;
use anteroom::MatchmakingError;
use chrono::Duration as ChronoDuration;
use fixtures::{
    create_test_system, immediate_config, label, matches_found, not_found_ids, player, sorted_ids,
};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_pair_is_matched_on_next_sweep() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    assert_ok!(matchmaker.join_queue(player("p1"), label("duo", 2)));
    assert_ok!(matchmaker.join_queue(player("p2"), label("duo", 2)));

    let report = matchmaker.run_sweep().unwrap();
    assert_eq!(report.matches_found, 1);
    assert_eq!(matchmaker.queue_len(), 0);

    let found = matches_found(&recorder);
    assert_eq!(found.len(), 1);
    assert_eq!(sorted_ids(&found[0].participants), vec!["p1", "p2"]);
    assert_eq!(found[0].open_slots, 0);
    assert_eq!(found[0].criteria.as_ref().unwrap().key, "duo");
}

#[test]
fn test_arrival_order_without_shuffle() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    for id in ["A", "B", "C"] {
        matchmaker.join_queue(player(id), label("duo", 2)).unwrap();
    }

    matchmaker.run_sweep().unwrap();

    let found = matches_found(&recorder);
    assert_eq!(found.len(), 1);
    let ids: Vec<&str> = found[0].participants.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);

    assert!(matchmaker.is_queued("C"));
    assert_eq!(matchmaker.queue_len(), 1);
    assert_eq!(recorder.count_of("match_not_found"), 0);
}

#[test]
fn test_settling_period_defers_matching() {
    let config = MatchmakerConfig::immediate()
        .with_wait_times(Duration::from_secs(5), Duration::from_secs(30));
    let (matchmaker, recorder) = create_test_system(config);

    matchmaker.join_queue(player("p1"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p2"), label("duo", 2)).unwrap();

    let report = matchmaker.run_sweep().unwrap();
    assert!(report.is_idle());
    assert_eq!(matchmaker.queue_len(), 2);

    let later = chrono::Utc::now() + ChronoDuration::seconds(6);
    matchmaker.run_sweep_at(later).unwrap();
    assert_eq!(matches_found(&recorder).len(), 1);
    assert_eq!(matchmaker.queue_len(), 0);
}

#[test]
fn test_bot_fill_accepts_under_full_group() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    matchmaker.join_queue(player("p1"), label("squad", 4)).unwrap();
    matchmaker.join_queue(player("p2"), label("squad", 4)).unwrap();

    // Nothing happens before the maximum wait
    matchmaker.run_sweep().unwrap();
    assert_eq!(matchmaker.queue_len(), 2);

    let later = chrono::Utc::now() + ChronoDuration::seconds(31);
    let report = matchmaker.run_sweep_at(later).unwrap();
    assert_eq!(report.bot_filled, 1);

    let found = matches_found(&recorder);
    assert_eq!(found.len(), 1);
    assert_eq!(sorted_ids(&found[0].participants), vec!["p1", "p2"]);
    assert_eq!(found[0].open_slots, 2);
    assert_eq!(matchmaker.queue_len(), 0);
}

#[test]
fn test_timeout_removes_only_the_earliest_participant() {
    let config = MatchmakerConfig::immediate()
        .with_bot_fill(false)
        .with_wait_times(Duration::ZERO, Duration::from_millis(100));
    let (matchmaker, recorder) = create_test_system(config);

    matchmaker.join_queue(player("early"), label("squad", 4)).unwrap();
    std::thread::sleep(Duration::from_millis(150));
    matchmaker.join_queue(player("late"), label("squad", 4)).unwrap();

    let report = matchmaker.run_sweep().unwrap();
    assert_eq!(report.timed_out, 1);

    assert_eq!(not_found_ids(&recorder), vec!["early".to_string()]);
    assert!(matches_found(&recorder).is_empty());
    assert!(!matchmaker.is_queued("early"));
    assert!(matchmaker.is_queued("late"));
}

#[test]
fn test_groups_are_matched_independently() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    matchmaker.join_queue(player("a1"), label("alpha", 2)).unwrap();
    matchmaker.join_queue(player("b1"), label("beta", 2)).unwrap();
    matchmaker.join_queue(player("a2"), label("alpha", 2)).unwrap();
    matchmaker.join_queue(player("c1"), label("gamma", 3)).unwrap();

    let report = matchmaker.run_sweep().unwrap();
    assert_eq!(report.matches_found, 1);

    let found = matches_found(&recorder);
    assert_eq!(sorted_ids(&found[0].participants), vec!["a1", "a2"]);

    let remaining: Vec<String> = matchmaker
        .list_queued_participants(None)
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(remaining, vec!["b1", "c1"]);

    let beta = matchmaker.list_queued_participants(Some(&label("beta", 2)));
    assert_eq!(beta.len(), 1);
    assert_eq!(beta[0].id, "b1");
}

#[test]
fn test_leave_queue_twice_is_a_no_op() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    matchmaker.join_queue(player("p1"), label("duo", 2)).unwrap();

    let removed = matchmaker.leave_queue("p1");
    assert_eq!(removed.map(|p| p.id), Some("p1".to_string()));
    assert_eq!(recorder.count_of("left_queue"), 1);

    assert!(matchmaker.leave_queue("p1").is_none());
    assert_eq!(recorder.count_of("left_queue"), 1);
}

#[test]
fn test_duplicate_join_is_rejected() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    assert_ok!(matchmaker.join_queue(player("p1"), label("duo", 2)));
    let err = assert_err!(matchmaker.join_queue(player("p1"), label("squad", 4)));

    assert!(matches!(
        MatchmakingError::from_anyhow(&err),
        Some(MatchmakingError::AlreadyQueued { .. })
    ));
    assert_eq!(matchmaker.queue_len(), 1);
    assert_eq!(recorder.count_of("joined_queue"), 1);
}

#[test]
fn test_matched_participant_can_requeue() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    matchmaker.join_queue(player("p1"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p2"), label("duo", 2)).unwrap();
    matchmaker.run_sweep().unwrap();

    assert_ok!(matchmaker.join_queue(player("p1"), label("duo", 2)));
    assert!(matchmaker.is_queued("p1"));
}

#[test]
fn test_event_order_across_operations() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    matchmaker.join_queue(player("p1"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p2"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p3"), label("solo", 1)).unwrap();
    matchmaker.leave_queue("p3");
    matchmaker.run_sweep().unwrap();

    assert_eq!(
        recorder.kinds(),
        vec![
            "joined_queue",
            "joined_queue",
            "joined_queue",
            "left_queue",
            "match_found"
        ]
    );
}

#[test]
fn test_stats_follow_activity() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    matchmaker.join_queue(player("p1"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p2"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p3"), label("duo", 2)).unwrap();
    matchmaker.run_sweep().unwrap();

    let stats = matchmaker.get_stats().unwrap();
    assert_eq!(stats.participants_queued, 3);
    assert_eq!(stats.queue_matches, 1);
    assert_eq!(stats.sweeps_run, 1);
    assert_eq!(stats.participants_waiting, 1);
    assert!(stats.last_sweep_at.is_some());
}

#[tokio::test]
async fn test_scheduler_matches_without_manual_sweeps() {
    let config = immediate_config().with_sweep_interval(Duration::from_millis(20));
    let (matchmaker, recorder) = create_test_system(config);

    assert_ok!(matchmaker.start());
    matchmaker.join_queue(player("p1"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("p2"), label("duo", 2)).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while matchmaker.queue_len() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    matchmaker.stop().await;
    assert!(!matchmaker.is_running());
    assert_eq!(matches_found(&recorder).len(), 1);
}
