use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types
pub type RoomCode = String;
pub type TeamId = String;
pub type SessionId = String;
pub type ConnectionId = String;
pub type EpisodeId = String;

/// The closed set of supported show formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    OnlyConnect,
    ThisOrThat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    PreGame,
    InRound,
    PostGame,
}

/// Who is on the other end of a connection (or issuing a command)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Manager,
    Team(TeamId),
    Audience(SessionId),
}

/// Connection counts by role
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ConnectionCounts {
    pub managers: u32,
    pub teams: u32,
    pub audience: u32,
}

/// A This-or-That vote / answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    This,
    That,
    Both,
    Neither,
}

impl Answer {
    pub fn from_flags(is_this: bool, is_that: bool) -> Self {
        match (is_this, is_that) {
            (true, true) => Answer::Both,
            (true, false) => Answer::This,
            (false, true) => Answer::That,
            (false, false) => Answer::Neither,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::This => "this",
            Answer::That => "that",
            Answer::Both => "both",
            Answer::Neither => "neither",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A competing team and its running score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub score: i32,
    /// Current This-or-That vote (cleared when a new question opens)
    #[serde(default)]
    pub vote: Option<Answer>,
    /// Whether the team has buzzed on the current prompt
    #[serde(default)]
    pub buzzed: bool,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.into(),
            score: 0,
            vote: None,
            buzzed: false,
        }
    }
}

/// Options chosen by the host when starting a room
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoomOptions {
    /// Team names, in play order
    #[serde(default)]
    pub teams: Vec<String>,
    /// Whether the audience may vote
    #[serde(default)]
    pub audience: bool,
    /// Seed for wall shuffles and generated prompts (random when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}
