//! Connecting wall: sixteen shuffled clues to be sorted into four groups.
//!
//! A wall runs in three phases. In the freeform phase the active team toggles
//! clues; four selected clues are evaluated against the canonical groups. The
//! phase ends when every group is found, on the third strike, or when the team
//! gives up. The manager then walks through the four groups scoring each
//! connection guess, after which the wall is complete.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::actions::{Action, Hieroglyph};
use crate::episode::{ConnectingWall, ConnectionQuestion, SLOTS_PER_CONNECTION};
use crate::error::{EngineError, EngineResult};

pub const MAX_STRIKES: u8 = 3;

/// Last evaluated selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirming {
    pub clues: Vec<String>,
    pub matched: bool,
    /// Canonical group index; never sent to players
    #[serde(skip)]
    pub group: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallPhase {
    Freeform,
    Connections { step: usize },
    Complete,
}

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Changed,
    /// The freeform phase is over; the team found this many groups
    Ended { groups_found: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallPuzzle {
    pub selector: Hieroglyph,
    groups: Vec<ConnectionQuestion>,
    ungrouped: Vec<String>,
    grouped: Vec<String>,
    not_found: Vec<String>,
    found: Vec<usize>,
    revealed: Vec<usize>,
    selected: Vec<usize>,
    strikes: u8,
    confirming: Option<Confirming>,
    connections: Vec<Option<bool>>,
    phase: WallPhase,
}

impl WallPuzzle {
    pub fn new<R: Rng + ?Sized>(selector: Hieroglyph, wall: &ConnectingWall, rng: &mut R) -> Self {
        let mut ungrouped = wall.clues();
        ungrouped.shuffle(rng);

        Self {
            selector,
            groups: wall.groups.clone(),
            ungrouped,
            grouped: Vec::new(),
            not_found: Vec::new(),
            found: Vec::new(),
            revealed: Vec::new(),
            selected: Vec::new(),
            strikes: 0,
            confirming: None,
            connections: vec![None; wall.groups.len()],
            phase: WallPhase::Freeform,
        }
    }

    pub fn phase(&self) -> WallPhase {
        self.phase
    }

    pub fn groups(&self) -> &[ConnectionQuestion] {
        &self.groups
    }

    pub fn ungrouped(&self) -> &[String] {
        &self.ungrouped
    }

    pub fn grouped(&self) -> &[String] {
        &self.grouped
    }

    pub fn not_found(&self) -> &[String] {
        &self.not_found
    }

    /// Indices into `ungrouped`
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn strikes(&self) -> u8 {
        self.strikes
    }

    pub fn confirming(&self) -> Option<&Confirming> {
        self.confirming.as_ref()
    }

    pub fn groups_found(&self) -> usize {
        self.found.len()
    }

    /// Connection guess results by canonical group index
    pub fn connection_results(&self) -> &[Option<bool>] {
        &self.connections
    }

    /// Groups in walkthrough order: found ones first, then auto-revealed
    pub fn walkthrough(&self) -> Vec<usize> {
        self.found.iter().chain(self.revealed.iter()).copied().collect()
    }

    /// Position in the walkthrough whose connection is being scored
    pub fn scoring_step(&self) -> Option<usize> {
        match self.phase {
            WallPhase::Connections { step } => Some(step),
            _ => None,
        }
    }

    pub fn toggle(&mut self, word: &str) -> EngineResult<Toggle> {
        if self.phase != WallPhase::Freeform {
            return Err(EngineError::invalid("toggle", "the wall is no longer being solved"));
        }

        let index = self
            .ungrouped
            .iter()
            .position(|w| w == word)
            .ok_or_else(|| EngineError::InconsistentWallState(format!("'{}' is not on the wall", word)))?;

        if let Some(pos) = self.selected.iter().position(|i| *i == index) {
            self.selected.remove(pos);
            return Ok(Toggle::Changed);
        }

        self.selected.push(index);
        if self.selected.len() < SLOTS_PER_CONNECTION {
            return Ok(Toggle::Changed);
        }

        Ok(self.evaluate())
    }

    fn evaluate(&mut self) -> Toggle {
        let mut words: Vec<String> = self
            .selected
            .iter()
            .filter_map(|i| self.ungrouped.get(*i).cloned())
            .collect();
        self.selected.clear();

        let matched = self.find_group(&words);
        words.sort();

        match matched {
            Some(group) => {
                self.confirm_group(group);
                self.confirming = Some(Confirming {
                    clues: self.groups[group].elements.clone(),
                    matched: true,
                    group: Some(group),
                });

                if self.found.len() == SLOTS_PER_CONNECTION - 1 {
                    if let Some(last) = self.find_group(&self.ungrouped.clone()) {
                        tracing::debug!("Auto-confirming last wall group {}", last);
                        self.confirm_group(last);
                    }
                }

                if self.ungrouped.is_empty() {
                    return Toggle::Ended {
                        groups_found: self.end_freeform(),
                    };
                }
            }
            None => {
                self.strikes = (self.strikes + 1).min(MAX_STRIKES);
                self.confirming = Some(Confirming {
                    clues: words,
                    matched: false,
                    group: None,
                });

                if self.strikes >= MAX_STRIKES {
                    return Toggle::Ended {
                        groups_found: self.end_freeform(),
                    };
                }
            }
        }

        Toggle::Changed
    }

    /// Canonical group not yet found whose clues are exactly `words`
    fn find_group(&self, words: &[String]) -> Option<usize> {
        if words.len() != SLOTS_PER_CONNECTION {
            return None;
        }
        self.groups.iter().enumerate().find_map(|(i, group)| {
            let unclaimed = !self.found.contains(&i) && !self.revealed.contains(&i);
            let same = words.iter().all(|w| group.elements.contains(w));
            (unclaimed && same).then_some(i)
        })
    }

    fn confirm_group(&mut self, group: usize) {
        let elements = self.groups[group].elements.clone();
        self.ungrouped.retain(|w| !elements.contains(w));
        self.grouped.extend(elements);
        self.found.push(group);
    }

    /// Stop solving; the active team keeps the groups found so far
    pub fn give_up(&mut self) -> EngineResult<usize> {
        if self.phase != WallPhase::Freeform {
            return Err(EngineError::invalid(Action::LockIn, "the wall is no longer being solved"));
        }
        Ok(self.end_freeform())
    }

    fn end_freeform(&mut self) -> usize {
        self.selected.clear();

        for group in 0..self.groups.len() {
            if self.found.contains(&group) || self.revealed.contains(&group) {
                continue;
            }
            let elements = self.groups[group].elements.clone();
            self.ungrouped.retain(|w| !elements.contains(w));
            self.not_found.extend(elements);
            self.revealed.push(group);
        }

        self.phase = WallPhase::Connections { step: 0 };
        self.found.len()
    }

    /// Score the connection guess for the current walkthrough group and
    /// return the points earned
    pub fn score_connection(&mut self, correct: bool) -> EngineResult<i32> {
        let WallPhase::Connections { step } = self.phase else {
            return Err(EngineError::invalid(
                if correct { "SCORE_TEAM" } else { "SCORE_INCORRECT" },
                "no wall connection is being scored",
            ));
        };
        let group = self
            .walkthrough()
            .get(step)
            .copied()
            .ok_or_else(|| EngineError::InconsistentWallState("walkthrough overran".to_string()))?;

        self.connections[group] = Some(correct);

        self.phase = if step + 1 >= self.groups.len() {
            WallPhase::Complete
        } else {
            WallPhase::Connections { step: step + 1 }
        };

        Ok(i32::from(correct))
    }
}
