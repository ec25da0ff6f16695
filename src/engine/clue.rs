//! Clue-reveal questions (connections and completions rounds)

use super::actions::{Action, Hieroglyph};
use crate::episode::ConnectionQuestion;
use crate::error::{EngineError, EngineResult};

/// Points for a correct answer after 1, 2, 3 or 4 revealed clues
pub const CLUE_SCORES: [i32; 4] = [5, 3, 2, 1];
pub const STEAL_POINTS: i32 = 1;

/// Placeholder shown for the hidden last clue of a completions question
pub const HIDDEN_CLUE: &str = "?";

/// A question on the board with clues being revealed one at a time
#[derive(Debug, Clone, PartialEq)]
pub struct ClueQuestion {
    pub index: usize,
    pub selector: Hieroglyph,
    pub question: ConnectionQuestion,
    pub revealed: usize,
    /// Clues that may be shown before the answer (3 for completions)
    pub max_revealed: usize,
    pub locked: bool,
    /// Opposing team gets one attempt with every revealable clue showing
    pub stealing: bool,
}

impl ClueQuestion {
    pub fn new(
        index: usize,
        selector: Hieroglyph,
        question: ConnectionQuestion,
        max_revealed: usize,
    ) -> Self {
        let max_revealed = max_revealed.clamp(1, question.elements.len().max(1));
        let mut clue = Self {
            index,
            selector,
            question,
            revealed: 1,
            max_revealed,
            locked: false,
            stealing: false,
        };
        if clue.revealed >= clue.max_revealed {
            clue.locked = true;
        }
        clue
    }

    pub fn can_reveal(&self) -> bool {
        !self.locked && self.revealed < self.max_revealed
    }

    /// Show the next clue; showing the last one locks in
    pub fn reveal_next(&mut self) -> EngineResult<()> {
        if !self.can_reveal() {
            return Err(EngineError::invalid(Action::NextClue, self.describe()));
        }
        self.revealed += 1;
        if self.revealed == self.max_revealed {
            self.locked = true;
        }
        Ok(())
    }

    pub fn lock_in(&mut self) -> EngineResult<()> {
        if self.locked {
            return Err(EngineError::invalid(Action::LockIn, self.describe()));
        }
        self.locked = true;
        Ok(())
    }

    /// Points for a correct primary answer at the current reveal count
    pub fn points(&self) -> i32 {
        CLUE_SCORES
            .get(self.revealed.saturating_sub(1))
            .copied()
            .unwrap_or(0)
    }

    pub fn open_steal(&mut self) {
        self.revealed = self.max_revealed;
        self.locked = true;
        self.stealing = true;
    }

    /// Clues visible to players
    pub fn visible_clues(&self) -> Vec<String> {
        let mut clues: Vec<String> = self
            .question
            .elements
            .iter()
            .take(self.revealed)
            .cloned()
            .collect();
        if self.stealing && self.max_revealed < self.question.elements.len() {
            clues.push(HIDDEN_CLUE.to_string());
        }
        clues
    }

    pub fn describe(&self) -> &'static str {
        if self.stealing {
            "a steal is in progress"
        } else if self.locked {
            "the answer is locked in"
        } else {
            "clues are being revealed"
        }
    }
}
