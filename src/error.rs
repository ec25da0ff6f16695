//! Error taxonomy for room commands.
//!
//! None of these are fatal: a rejected command leaves the room untouched and
//! at most produces an `error` event for the connection that issued it.

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("{action} is not available while {state}")]
    InvalidAction { action: String, state: String },

    #[error("Wall state mismatch: {0}")]
    InconsistentWallState(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Unknown team {0}")]
    UnknownTeam(String),

    #[error("Unknown round {0}")]
    UnknownRound(String),

    #[error("Room is closed")]
    RoomClosed,
}

impl EngineError {
    pub fn invalid(action: impl ToString, state: impl ToString) -> Self {
        EngineError::InvalidAction {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Stable code sent to clients in `error` events
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidAction { .. } => "INVALID_ACTION",
            EngineError::InconsistentWallState(_) => "INVALID_ACTION",
            EngineError::Unauthorized(_) => "UNAUTHORIZED",
            EngineError::UnknownTeam(_) => "UNKNOWN_TEAM",
            EngineError::UnknownRound(_) => "UNKNOWN_ROUND",
            EngineError::RoomClosed => "ROOM_CLOSED",
        }
    }
}
