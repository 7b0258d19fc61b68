//! High concurrency stress tests for queue and room operations
//!
//! These tests validate behaviour under many simultaneous callers and ensure
//! no participant is lost or duplicated while sweeps run concurrently.

use anteroom::types::{MatchEvent, MatchSource};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::fixtures::{create_test_system, immediate_config, label, matches_found, player};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_100_concurrent_queue_requests() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let start = Instant::now();
    let handles = (0..100).map(|i| {
        let matchmaker = matchmaker.clone();
        tokio::spawn(async move {
            matchmaker.join_queue(player(&format!("load_{}", i)), label("duo", 2))
        })
    });
    let results = join_all(handles).await;

    let successes = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(()))))
        .count();
    assert_eq!(successes, 100);
    assert_eq!(matchmaker.queue_len(), 100);
    println!("100 concurrent joins took {:?}", start.elapsed());

    matchmaker.run_sweep().unwrap();
    assert_eq!(matchmaker.queue_len(), 0);
    assert_eq!(matches_found(&recorder).len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_joins_racing_sweeps_lose_nobody() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let sweeper = {
        let matchmaker = matchmaker.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                matchmaker.run_sweep().unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let joins = (0..400).map(|i| {
        let matchmaker = matchmaker.clone();
        tokio::spawn(async move {
            let key = if i % 2 == 0 { "even" } else { "odd" };
            matchmaker.join_queue(player(&format!("race_{}", i)), label(key, 4))
        })
    });
    for result in join_all(joins).await {
        assert!(matches!(result, Ok(Ok(()))));
    }
    sweeper.await.unwrap();
    matchmaker.run_sweep().unwrap();

    let mut seen = HashSet::new();
    for found in matches_found(&recorder) {
        assert_eq!(found.participants.len(), 4);
        let key = &found.criteria.as_ref().unwrap().key;
        for p in &found.participants {
            let n: usize = p.id.trim_start_matches("race_").parse().unwrap();
            assert_eq!(key == "even", n % 2 == 0, "keys mixed in {}", found.match_id);
            assert!(seen.insert(p.id.clone()), "{} matched twice", p.id);
        }
    }

    // Everyone is either matched or still waiting, never both
    for p in matchmaker.list_queued_participants(None) {
        assert!(!seen.contains(&p.id));
        seen.insert(p.id);
    }
    assert_eq!(seen.len(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_joined_queue_always_precedes_match_found() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let sweeper = {
        let matchmaker = matchmaker.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                matchmaker.run_sweep().unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let joiners = (0..4).map(|worker| {
        let matchmaker = matchmaker.clone();
        tokio::spawn(async move {
            for i in 0..250 {
                matchmaker
                    .join_queue(player(&format!("w{}_{}", worker, i)), label("duo", 2))
                    .unwrap();
                if i % 16 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    });
    for result in join_all(joiners).await {
        result.unwrap();
    }
    sweeper.await.unwrap();
    matchmaker.run_sweep().unwrap();

    // Delivery order must match the order in which state changed
    let mut announced = HashSet::new();
    for event in recorder.events() {
        match event {
            MatchEvent::JoinedQueue { participant, .. } => {
                assert!(announced.insert(participant.id.clone()));
            }
            MatchEvent::MatchFound(found) => {
                for p in &found.participants {
                    assert!(
                        announced.contains(&p.id),
                        "match-found for '{}' delivered before its joined-queue",
                        p.id
                    );
                }
            }
            _ => {}
        }
    }
    assert_eq!(announced.len(), 1000);
    assert_eq!(matches_found(&recorder).len(), 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_room_events_never_follow_room_start() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    for round in 0..20 {
        let host = format!("host_{}", round);
        let code = matchmaker.create_room(player(&host), None).unwrap();

        let joins = (0..8).map(|i| {
            let matchmaker = matchmaker.clone();
            let code = code.clone();
            tokio::spawn(async move {
                matchmaker
                    .join_room(player(&format!("r{}_{}", round, i)), &code)
                    .unwrap()
            })
        });
        let start = {
            let matchmaker = matchmaker.clone();
            let code = code.clone();
            tokio::spawn(async move { matchmaker.start_room(&host, &code, true).unwrap() })
        };

        let joined = join_all(joins)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count();
        let found = start.await.unwrap();
        assert_eq!(found.participants.len(), joined + 1);
    }

    let mut started = HashSet::new();
    for event in recorder.events() {
        match event {
            MatchEvent::JoinedRoom { code, participant, .. } => {
                assert!(
                    !started.contains(&code),
                    "'{}' announced in room {} after it started",
                    participant.id,
                    code
                );
            }
            MatchEvent::MatchFound(found) => {
                if let MatchSource::Room { code } = found.source {
                    assert!(started.insert(code));
                }
            }
            _ => {}
        }
    }
    assert_eq!(started.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_room_joins_respect_single_membership() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let codes: Vec<String> = (0..10)
        .map(|i| matchmaker.create_room(player(&format!("host_{}", i)), None).unwrap())
        .collect();
    let codes = Arc::new(codes);

    // Each guest tries every room at once; at most one can succeed
    let attempts = (0..50).flat_map(|guest| {
        let codes = codes.clone();
        let matchmaker = matchmaker.clone();
        (0..codes.len()).map(move |room| {
            let matchmaker = matchmaker.clone();
            let code = codes[room].clone();
            tokio::spawn(async move {
                let joined = matchmaker
                    .join_room(player(&format!("guest_{}", guest)), &code)
                    .unwrap();
                (guest, joined)
            })
        })
    });

    let mut joins_per_guest = vec![0; 50];
    for result in join_all(attempts).await {
        let (guest, joined) = result.unwrap();
        if joined {
            joins_per_guest[guest] += 1;
        }
    }
    assert!(joins_per_guest.iter().all(|&n| n == 1));

    let members: usize = matchmaker
        .list_rooms()
        .unwrap()
        .iter()
        .map(|room| room.member_count())
        .sum();
    assert_eq!(members, 60);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_teardown_and_joins() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let code = matchmaker.create_room(player("host"), None).unwrap();

    let joins = (0..100).map(|i| {
        let matchmaker = matchmaker.clone();
        let code = code.clone();
        tokio::spawn(async move {
            matchmaker
                .join_room(player(&format!("late_{}", i)), &code)
                .unwrap()
        })
    });
    let teardown = {
        let matchmaker = matchmaker.clone();
        let code = code.clone();
        tokio::spawn(async move { matchmaker.leave_room("host", &code).unwrap() })
    };

    join_all(joins).await;
    assert!(teardown.await.unwrap());

    // No participant may stay indexed to a room that no longer exists
    assert!(matchmaker.get_room(&code).unwrap().is_none());
    for i in 0..100 {
        assert!(matchmaker.room_code_for(&format!("late_{}", i)).is_none());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_system_under_sustained_load() {
    let config = immediate_config().with_sweep_interval(Duration::from_millis(10));
    let (matchmaker, recorder) = create_test_system(config);
    matchmaker.start().unwrap();

    let start = Instant::now();
    for wave in 0..10 {
        let joins = (0..20).map(|i| {
            let matchmaker = matchmaker.clone();
            tokio::spawn(async move {
                matchmaker.join_queue(player(&format!("wave{}_{}", wave, i)), label("duo", 2))
            })
        });
        join_all(joins).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while matchmaker.queue_len() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    matchmaker.stop().await;

    assert_eq!(matchmaker.queue_len(), 0);
    assert_eq!(matches_found(&recorder).len(), 100);
    println!("200 participants matched in {:?}", start.elapsed());

    let stats = matchmaker.get_stats().unwrap();
    assert_eq!(stats.queue_matches, 100);
    assert_eq!(stats.sweeps_failed, 0);
}
