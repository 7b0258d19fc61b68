//! Error types for the matchmaking engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to branch on a specific failure
//! can `downcast_ref::<MatchmakingError>()` the returned error.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Room not found: {code}")]
    RoomNotFound { code: String },

    #[error("Participant {participant_id} is not the host of room {code}")]
    Unauthorized {
        participant_id: String,
        code: String,
    },

    #[error("Invalid room state: {reason}")]
    InvalidState { reason: String },

    #[error("Participant already queued: {participant_id}")]
    AlreadyQueued { participant_id: String },

    #[error("Participant {participant_id} already occupies room {code}")]
    AlreadyInRoom {
        participant_id: String,
        code: String,
    },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Borrow the matchmaking error inside an `anyhow::Error`, if that is what it holds
    pub fn from_anyhow(error: &anyhow::Error) -> Option<&MatchmakingError> {
        error.downcast_ref::<MatchmakingError>()
    }
}
