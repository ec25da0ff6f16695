//! Episode content model
//!
//! Episodes are read-only once loaded. Rooms hold an `Arc<Episode>` and never
//! mutate it.

pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::engine::connect::RoundSlot;
use crate::types::{Answer, EpisodeId, GameKind};

pub use store::{DirectoryEpisodeStore, EpisodeStore, MemoryEpisodeStore};

/// Questions per connections/completions round
pub const MAX_QUESTIONS_PER_ROUND: usize = 6;
/// Clues per connection question, and groups per wall
pub const SLOTS_PER_CONNECTION: usize = 4;
/// Clues on a connecting wall
pub const WALL_SIZE: usize = SLOTS_PER_CONNECTION * SLOTS_PER_CONNECTION;
/// One wall per team, at most two teams
pub const MAX_WALLS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum EpisodeError {
    #[error("Failed to read episode file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse episode: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid episode {id}: {reason}")]
    Invalid { id: EpisodeId, reason: String },

    #[error("Episode not found: {0}")]
    NotFound(EpisodeId),
}

/// Reference to an externally hosted media blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRef {
    pub blob_id: String,
    pub url: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: EpisodeId,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub content: EpisodeContent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum EpisodeContent {
    OnlyConnect(OnlyConnectEpisode),
    ThisOrThat(ThisOrThatEpisode),
}

/// Four elements sharing a connection. Used for connections, completions and
/// as a single group on a connecting wall.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionQuestion {
    pub connection: String,
    #[serde(default)]
    pub details: String,
    pub elements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ConnectingWall {
    pub groups: Vec<ConnectionQuestion>,
}

impl ConnectingWall {
    /// All sixteen clues in canonical (group-major) order
    pub fn clues(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.elements.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VowelWord {
    pub answer: String,
    /// Pre-written prompt; generated from the answer when absent
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VowelGroup {
    pub connection: String,
    pub words: Vec<VowelWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OnlyConnectEpisode {
    #[serde(default)]
    pub connections: Vec<ConnectionQuestion>,
    #[serde(default)]
    pub completions: Vec<ConnectionQuestion>,
    #[serde(default)]
    pub connecting_walls: Vec<ConnectingWall>,
    #[serde(default)]
    pub missing_vowels: Vec<VowelGroup>,
}

impl OnlyConnectEpisode {
    /// Whether there is enough content to play `slot` with `team_count` teams.
    /// Each team gets its own wall.
    pub fn has_round(&self, slot: RoundSlot, team_count: usize) -> bool {
        match slot {
            RoundSlot::PreGame | RoundSlot::PostGame => true,
            RoundSlot::Connections => !self.connections.is_empty(),
            RoundSlot::Completions => !self.completions.is_empty(),
            RoundSlot::ConnectingWalls => {
                self.connecting_walls.len() >= team_count.clamp(1, MAX_WALLS)
            }
            RoundSlot::MissingVowels => self.missing_vowels.iter().any(|g| !g.words.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThisOrThatQuestion {
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub question_media: Option<MediaRef>,
    #[serde(default)]
    pub is_this: bool,
    #[serde(default)]
    pub is_that: bool,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub answer_media: Option<MediaRef>,
}

impl ThisOrThatQuestion {
    pub fn answer(&self) -> Answer {
        Answer::from_flags(self.is_this, self.is_that)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThisOrThatEpisode {
    pub this: String,
    pub that: String,
    #[serde(default)]
    pub questions: Vec<ThisOrThatQuestion>,
}

impl ThisOrThatEpisode {
    /// Display label for an answer ("Both"/"Neither" or a category name)
    pub fn answer_label(&self, answer: Answer) -> &str {
        match answer {
            Answer::This => &self.this,
            Answer::That => &self.that,
            Answer::Both => "Both",
            Answer::Neither => "Neither",
        }
    }

    pub fn has_both(&self) -> bool {
        self.questions.iter().any(|q| q.answer() == Answer::Both)
    }

    pub fn has_neither(&self) -> bool {
        self.questions.iter().any(|q| q.answer() == Answer::Neither)
    }
}

/// Listing entry for `GET /api/episodes`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EpisodeSummary {
    pub id: EpisodeId,
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub game: GameKind,
    /// Names of the rounds this episode can play
    pub rounds: Vec<String>,
}

impl Episode {
    pub fn kind(&self) -> GameKind {
        match self.content {
            EpisodeContent::OnlyConnect(_) => GameKind::OnlyConnect,
            EpisodeContent::ThisOrThat(_) => GameKind::ThisOrThat,
        }
    }

    pub fn summary(&self) -> EpisodeSummary {
        let rounds = match &self.content {
            // Listed as played by two teams
            EpisodeContent::OnlyConnect(oc) => RoundSlot::ALL
                .into_iter()
                .filter(|slot| !matches!(slot, RoundSlot::PreGame | RoundSlot::PostGame))
                .filter(|slot| oc.has_round(*slot, 2))
                .map(|slot| slot.as_str().to_string())
                .collect(),
            EpisodeContent::ThisOrThat(_) => vec!["QUESTIONS".to_string()],
        };

        EpisodeSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            game: self.kind(),
            rounds,
        }
    }

    /// Check structural constraints the engines rely on
    pub fn validate(&self) -> Result<(), EpisodeError> {
        let invalid = |reason: String| EpisodeError::Invalid {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("episode id is empty".to_string()));
        }

        match &self.content {
            EpisodeContent::OnlyConnect(oc) => {
                for (name, bank) in [
                    ("connections", &oc.connections),
                    ("completions", &oc.completions),
                ] {
                    if bank.len() > MAX_QUESTIONS_PER_ROUND {
                        return Err(invalid(format!(
                            "{} has {} questions (max {})",
                            name,
                            bank.len(),
                            MAX_QUESTIONS_PER_ROUND
                        )));
                    }
                    for (i, q) in bank.iter().enumerate() {
                        if q.elements.len() != SLOTS_PER_CONNECTION {
                            return Err(invalid(format!(
                                "{} question {} has {} elements",
                                name,
                                i + 1,
                                q.elements.len()
                            )));
                        }
                    }
                }

                if oc.connecting_walls.len() > MAX_WALLS {
                    return Err(invalid(format!(
                        "{} connecting walls (max {})",
                        oc.connecting_walls.len(),
                        MAX_WALLS
                    )));
                }

                for (i, wall) in oc.connecting_walls.iter().enumerate() {
                    if wall.groups.len() != SLOTS_PER_CONNECTION
                        || wall
                            .groups
                            .iter()
                            .any(|g| g.elements.len() != SLOTS_PER_CONNECTION)
                    {
                        return Err(invalid(format!("wall {} is not 4 groups of 4", i + 1)));
                    }
                    let distinct: HashSet<String> = wall.clues().into_iter().collect();
                    if distinct.len() != WALL_SIZE {
                        return Err(invalid(format!("wall {} has duplicate clues", i + 1)));
                    }
                }

                for group in &oc.missing_vowels {
                    if group.words.iter().any(|w| w.answer.trim().is_empty()) {
                        return Err(invalid(format!(
                            "missing vowels group '{}' has an empty answer",
                            group.connection
                        )));
                    }
                }
            }
            EpisodeContent::ThisOrThat(tot) => {
                if tot.this.trim().is_empty() || tot.that.trim().is_empty() {
                    return Err(invalid("this/that categories must be named".to_string()));
                }
            }
        }

        Ok(())
    }
}
