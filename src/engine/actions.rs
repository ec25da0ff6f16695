use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire identifiers for every command a client can issue via `{"cmd":"action"}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    StartGame,
    StartNextRound,
    NextQuestion,
    SelectTwoReeds,
    SelectLion,
    SelectTwistedFlax,
    SelectHornedViper,
    SelectWater,
    SelectEyeOfHorus,
    NextClue,
    LockIn,
    BuzzTeam1,
    BuzzTeam2,
    ScoreTeam1,
    ScoreTeam2,
    ScoreSteal,
    ScoreIncorrect,
    RevealAnswer,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StartGame => "START_GAME",
            Action::StartNextRound => "START_NEXT_ROUND",
            Action::NextQuestion => "NEXT_QUESTION",
            Action::SelectTwoReeds => "SELECT_TWO_REEDS",
            Action::SelectLion => "SELECT_LION",
            Action::SelectTwistedFlax => "SELECT_TWISTED_FLAX",
            Action::SelectHornedViper => "SELECT_HORNED_VIPER",
            Action::SelectWater => "SELECT_WATER",
            Action::SelectEyeOfHorus => "SELECT_EYE_OF_HORUS",
            Action::NextClue => "NEXT_CLUE",
            Action::LockIn => "LOCK_IN",
            Action::BuzzTeam1 => "BUZZ_TEAM1",
            Action::BuzzTeam2 => "BUZZ_TEAM2",
            Action::ScoreTeam1 => "SCORE_TEAM1",
            Action::ScoreTeam2 => "SCORE_TEAM2",
            Action::ScoreSteal => "SCORE_STEAL",
            Action::ScoreIncorrect => "SCORE_INCORRECT",
            Action::RevealAnswer => "REVEAL_ANSWER",
        }
    }

    /// The question selector this action picks, if it is a `SELECT_*`
    pub fn selector(&self) -> Option<Hieroglyph> {
        match self {
            Action::SelectTwoReeds => Some(Hieroglyph::TwoReeds),
            Action::SelectLion => Some(Hieroglyph::Lion),
            Action::SelectTwistedFlax => Some(Hieroglyph::TwistedFlax),
            Action::SelectHornedViper => Some(Hieroglyph::HornedViper),
            Action::SelectWater => Some(Hieroglyph::Water),
            Action::SelectEyeOfHorus => Some(Hieroglyph::EyeOfHorus),
            _ => None,
        }
    }

    /// Zero-based team index for `BUZZ_TEAMn` / `SCORE_TEAMn`
    pub fn team_index(&self) -> Option<usize> {
        match self {
            Action::BuzzTeam1 | Action::ScoreTeam1 => Some(0),
            Action::BuzzTeam2 | Action::ScoreTeam2 => Some(1),
            _ => None,
        }
    }

    pub fn score_team(index: usize) -> Option<Action> {
        match index {
            0 => Some(Action::ScoreTeam1),
            1 => Some(Action::ScoreTeam2),
            _ => None,
        }
    }

    pub fn buzz_team(index: usize) -> Option<Action> {
        match index {
            0 => Some(Action::BuzzTeam1),
            1 => Some(Action::BuzzTeam2),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question selectors, in board order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Hieroglyph {
    TwoReeds,
    Lion,
    TwistedFlax,
    HornedViper,
    Water,
    EyeOfHorus,
}

impl Hieroglyph {
    pub const ALL: [Hieroglyph; 6] = [
        Hieroglyph::TwoReeds,
        Hieroglyph::Lion,
        Hieroglyph::TwistedFlax,
        Hieroglyph::HornedViper,
        Hieroglyph::Water,
        Hieroglyph::EyeOfHorus,
    ];

    /// Selectors used for the two connecting walls
    pub const WALLS: [Hieroglyph; 2] = [Hieroglyph::Lion, Hieroglyph::Water];

    pub fn action(&self) -> Action {
        match self {
            Hieroglyph::TwoReeds => Action::SelectTwoReeds,
            Hieroglyph::Lion => Action::SelectLion,
            Hieroglyph::TwistedFlax => Action::SelectTwistedFlax,
            Hieroglyph::HornedViper => Action::SelectHornedViper,
            Hieroglyph::Water => Action::SelectWater,
            Hieroglyph::EyeOfHorus => Action::SelectEyeOfHorus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_as_str() {
        for action in [
            Action::StartGame,
            Action::SelectEyeOfHorus,
            Action::BuzzTeam2,
            Action::ScoreTeam1,
            Action::ScoreIncorrect,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        assert!(serde_json::from_str::<Action>("\"REVEAL_FOR_STEAL\"").is_err());
    }

    #[test]
    fn test_selector_round_trips_through_action() {
        for glyph in Hieroglyph::ALL {
            assert_eq!(glyph.action().selector(), Some(glyph));
        }
        assert_eq!(Action::NextClue.selector(), None);
    }
}
