//! Utility functions for the matchmaking engine

use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;
use uuid::Uuid;

/// Highest room code value (inclusive)
pub const MAX_ROOM_CODE: u32 = 999_999;

/// Generate a new unique match ID
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a six-digit, zero-padded room code uniformly over 000000-999999
pub fn generate_room_code() -> String {
    let value = rand::thread_rng().gen_range(0..=MAX_ROOM_CODE);
    format!("{:06}", value)
}

/// Check that a string has the room code shape
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Time elapsed between `since` and `now`; zero if `since` lies in the future
pub fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}
