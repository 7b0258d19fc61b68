//! Room lifecycle integration tests
//!
//! Host authority, membership changes and room teardown as observed
//! through the public matchmaker surface.

use anteroom::utils::is_valid_room_code;
use anteroom::{MatchSource, MatchmakingError, RoomState};
use std::collections::HashSet;
use tokio_test::{assert_err, assert_ok};

use crate::fixtures::{create_test_system, immediate_config, label, player, sorted_ids};

fn error_of(result: anyhow::Result<impl std::fmt::Debug>) -> MatchmakingError {
    let err = assert_err!(result);
    match err.downcast::<MatchmakingError>() {
        Ok(e) => e,
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_room_codes_are_six_digits_and_unique() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let mut codes = HashSet::new();
    for i in 0..200 {
        let code = matchmaker
            .create_room(player(&format!("host_{}", i)), None)
            .unwrap();
        assert!(is_valid_room_code(&code), "bad code {}", code);
        assert_eq!(code.len(), 6);
        assert!(codes.insert(code));
    }

    assert_eq!(matchmaker.list_rooms().unwrap().len(), 200);
}

#[test]
fn test_complete_room_workflow() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let code = matchmaker
        .create_room(player("host"), Some(label("duo", 2)))
        .unwrap();
    assert_eq!(matchmaker.room_code_for("host"), Some(code.clone()));

    assert!(assert_ok!(matchmaker.join_room(player("guest"), &code)));
    assert_eq!(matchmaker.room_code_for("guest"), Some(code.clone()));

    let snapshot = matchmaker.get_room(&code).unwrap().unwrap();
    assert_eq!(snapshot.host.id, "host");
    assert_eq!(snapshot.member_ids(), vec!["host", "guest"]);
    assert_eq!(snapshot.state, RoomState::Open);

    let found = assert_ok!(matchmaker.start_room("host", &code, false));
    assert_eq!(sorted_ids(&found.participants), vec!["guest", "host"]);
    assert_eq!(found.source, MatchSource::Room { code: code.clone() });
    assert_eq!(found.open_slots, 0);

    // Started rooms are gone and cannot be restarted
    assert!(matchmaker.get_room(&code).unwrap().is_none());
    assert!(matchmaker.room_code_for("host").is_none());
    assert!(matchmaker.room_code_for("guest").is_none());
    assert!(matches!(
        error_of(matchmaker.start_room("host", &code, true)),
        MatchmakingError::RoomNotFound { .. }
    ));

    assert_eq!(
        recorder.kinds(),
        vec!["joined_room", "joined_room", "match_found"],
        "the host's own arrival is announced too"
    );
}

#[test]
fn test_host_leaving_destroys_room_for_everyone() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let code = matchmaker.create_room(player("host"), None).unwrap();
    matchmaker.join_room(player("m1"), &code).unwrap();
    matchmaker.join_room(player("m2"), &code).unwrap();

    assert!(matchmaker.leave_room("host", &code).unwrap());

    assert!(matchmaker.get_room(&code).unwrap().is_none());
    for id in ["host", "m1", "m2"] {
        assert!(matchmaker.room_code_for(id).is_none(), "{} still indexed", id);
    }
    assert_eq!(recorder.count_of("room_destroyed"), 1);

    // Former members are free to host their own rooms
    assert_ok!(matchmaker.create_room(player("m1"), None));
}

#[test]
fn test_non_host_leaving_keeps_room() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let code = matchmaker.create_room(player("host"), None).unwrap();
    matchmaker.join_room(player("m1"), &code).unwrap();
    matchmaker.join_room(player("m2"), &code).unwrap();

    assert!(matchmaker.leave_room("m1", &code).unwrap());

    let snapshot = matchmaker.get_room(&code).unwrap().unwrap();
    assert_eq!(snapshot.member_ids(), vec!["host", "m2"]);
    assert!(matchmaker.room_code_for("m1").is_none());
    assert_eq!(matchmaker.room_code_for("m2"), Some(code.clone()));
    assert_eq!(recorder.count_of("left_room"), 1);

    // Leaving again changes nothing and publishes nothing
    assert!(!matchmaker.leave_room("m1", &code).unwrap());
    assert_eq!(recorder.count_of("left_room"), 1);
}

#[test]
fn test_start_requires_exact_size_unless_forced() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let code = matchmaker
        .create_room(player("host"), Some(label("squad", 4)))
        .unwrap();
    matchmaker.join_room(player("m1"), &code).unwrap();

    assert!(matches!(
        error_of(matchmaker.start_room("host", &code, false)),
        MatchmakingError::InvalidState { .. }
    ));
    assert!(matchmaker.get_room(&code).unwrap().is_some());

    let found = assert_ok!(matchmaker.start_room("host", &code, true));
    assert_eq!(found.participants.len(), 2);
    assert_eq!(found.open_slots, 2);
}

#[test]
fn test_start_without_label_accepts_any_size() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let code = matchmaker.create_room(player("host"), None).unwrap();
    let found = assert_ok!(matchmaker.start_room("host", &code, false));

    assert!(found.criteria.is_none());
    assert_eq!(found.participants.len(), 1);
}

#[test]
fn test_host_only_operations_reject_members() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let code = matchmaker
        .create_room(player("host"), Some(label("duo", 2)))
        .unwrap();
    matchmaker.join_room(player("m1"), &code).unwrap();

    assert!(matches!(
        error_of(matchmaker.start_room("m1", &code, true)),
        MatchmakingError::Unauthorized { .. }
    ));
    assert!(matches!(
        error_of(matchmaker.kick_from_room("m1", "host", &code)),
        MatchmakingError::Unauthorized { .. }
    ));
    assert!(matches!(
        error_of(matchmaker.update_room_label("m1", &code, None)),
        MatchmakingError::Unauthorized { .. }
    ));
    assert!(matches!(
        error_of(matchmaker.kick_from_room("host", "m1", "999999x")),
        MatchmakingError::RoomNotFound { .. }
    ));
}

#[test]
fn test_kick_and_relabel() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let code = matchmaker
        .create_room(player("host"), Some(label("duo", 2)))
        .unwrap();
    matchmaker.join_room(player("m1"), &code).unwrap();
    matchmaker.join_room(player("m2"), &code).unwrap();

    assert!(matchmaker.kick_from_room("host", "m2", &code).unwrap());
    assert!(!matchmaker.kick_from_room("host", "m2", &code).unwrap());
    assert!(matchmaker.room_code_for("m2").is_none());
    assert_eq!(recorder.count_of("kicked_from_room"), 1);

    // Relabeling never checks the current member count
    assert_ok!(matchmaker.update_room_label("host", &code, Some(label("squad", 4))));
    let snapshot = matchmaker.get_room(&code).unwrap().unwrap();
    assert_eq!(snapshot.criteria.unwrap().key, "squad");
    assert_eq!(recorder.count_of("label_updated"), 1);

    assert!(matches!(
        error_of(matchmaker.start_room("host", &code, false)),
        MatchmakingError::InvalidState { .. }
    ));
}

#[test]
fn test_join_room_no_op_conditions() {
    let (matchmaker, recorder) = create_test_system(immediate_config());

    let first = matchmaker.create_room(player("host_a"), None).unwrap();
    let second = matchmaker.create_room(player("host_b"), None).unwrap();

    assert!(!matchmaker.join_room(player("guest"), "000000x").unwrap());
    assert!(matchmaker.join_room(player("guest"), &first).unwrap());
    assert!(!matchmaker.join_room(player("guest"), &first).unwrap());
    assert!(!matchmaker.join_room(player("guest"), &second).unwrap());
    assert!(!matchmaker.join_room(player("host_b"), &first).unwrap());

    // Two hosts plus the one successful guest
    assert_eq!(recorder.count_of("joined_room"), 3);
    assert_eq!(matchmaker.room_code_for("guest"), Some(first));
}

#[test]
fn test_host_cannot_create_second_room() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    matchmaker.create_room(player("host"), None).unwrap();
    assert!(matches!(
        error_of(matchmaker.create_room(player("host"), None)),
        MatchmakingError::AlreadyInRoom { .. }
    ));
    assert_eq!(matchmaker.list_rooms().unwrap().len(), 1);
}

#[test]
fn test_rooms_and_queue_are_independent() {
    let (matchmaker, _recorder) = create_test_system(immediate_config());

    let code = matchmaker.create_room(player("host"), None).unwrap();
    matchmaker.join_queue(player("host"), label("duo", 2)).unwrap();
    matchmaker.join_queue(player("other"), label("duo", 2)).unwrap();

    matchmaker.run_sweep().unwrap();

    assert_eq!(matchmaker.queue_len(), 0);
    assert_eq!(matchmaker.room_code_for("host"), Some(code.clone()));
    assert!(matchmaker.get_room(&code).unwrap().is_some());
}
