use serde::{Deserialize, Serialize};

use crate::engine::Action;
use crate::error::EngineError;
use crate::types::{Answer, TeamId};
use crate::view::{EpisodeInfo, RoomView};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ClientMessage {
    Action {
        action: Action,
    },
    Vote {
        #[serde(default)]
        team: Option<TeamId>,
        vote: Answer,
    },
    /// Select or deselect a clue on the connecting wall
    Toggle {
        word: String,
    },
    // Manager-only
    Skip {
        round_name: String,
    },
    /// Ask for a full resync
    Setup,
    // Manager-only
    Close,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ServerMessage {
    StateChange {
        state: RoomView,
    },
    Setup {
        episode: EpisodeInfo,
        state: RoomView,
    },
    Close,
    Error {
        code: String,
        message: String,
    },
    Voted {
        team: Option<TeamId>,
        vote: Answer,
    },
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<EngineError> for ServerMessage {
    fn from(err: EngineError) -> Self {
        ServerMessage::error(err.code(), err.to_string())
    }
}
