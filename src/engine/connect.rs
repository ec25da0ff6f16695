//! Only Connect round sequencing

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use super::actions::{Action, Hieroglyph};
use super::buzz::{build_prompts, BuzzPrompt};
use super::clue::{ClueQuestion, STEAL_POINTS};
use super::ledger::Ledger;
use super::selection::QuestionBank;
use super::wall::{Toggle, WallPhase, WallPuzzle};
use crate::episode::{OnlyConnectEpisode, SLOTS_PER_CONNECTION};
use crate::error::{EngineError, EngineResult};

/// Rounds of an Only Connect game, in play order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundSlot {
    PreGame,
    Connections,
    Completions,
    ConnectingWalls,
    MissingVowels,
    PostGame,
}

impl RoundSlot {
    pub const ALL: [RoundSlot; 6] = [
        RoundSlot::PreGame,
        RoundSlot::Connections,
        RoundSlot::Completions,
        RoundSlot::ConnectingWalls,
        RoundSlot::MissingVowels,
        RoundSlot::PostGame,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundSlot::PreGame => "PRE_GAME",
            RoundSlot::Connections => "CONNECTIONS",
            RoundSlot::Completions => "COMPLETIONS",
            RoundSlot::ConnectingWalls => "CONNECTING_WALLS",
            RoundSlot::MissingVowels => "MISSING_VOWELS",
            RoundSlot::PostGame => "POST_GAME",
        }
    }
}

impl fmt::Display for RoundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundSlot {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        RoundSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownRound(s.to_string()))
    }
}

/// State of the current round
#[derive(Debug, Clone, PartialEq)]
pub enum RoundState {
    PreRound,
    Selecting,
    ClueQuestion(ClueQuestion),
    WallPlaying(WallPuzzle),
    BuzzQuestion(BuzzPrompt),
    PostRound,
}

impl RoundState {
    pub fn name(&self) -> &'static str {
        match self {
            RoundState::PreRound => "pre_round",
            RoundState::Selecting => "selecting",
            RoundState::ClueQuestion(_) => "clue_question",
            RoundState::WallPlaying(_) => "wall_playing",
            RoundState::BuzzQuestion(_) => "buzz_question",
            RoundState::PostRound => "post_round",
        }
    }
}

/// How the manager judged an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// Correct answer by the team at this index
    Team(usize),
    /// The opposing team's steal was correct
    Steal,
    Incorrect,
}

/// The most recently resolved question, kept for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviousAnswer {
    pub connection: String,
    pub details: String,
    pub answer: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConnectGame {
    content: OnlyConnectEpisode,
    slot: RoundSlot,
    state: RoundState,
    /// Team whose turn it is in clue and wall rounds
    turn: usize,
    team_count: usize,
    bank: QuestionBank,
    prompts: VecDeque<BuzzPrompt>,
    previous: Option<PreviousAnswer>,
}

impl ConnectGame {
    pub fn new(content: OnlyConnectEpisode, team_count: usize) -> Self {
        Self {
            content,
            slot: RoundSlot::PreGame,
            state: RoundState::PreRound,
            turn: 0,
            team_count,
            bank: QuestionBank::empty(),
            prompts: VecDeque::new(),
            previous: None,
        }
    }

    pub fn slot(&self) -> RoundSlot {
        self.slot
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn previous(&self) -> Option<&PreviousAnswer> {
        self.previous.as_ref()
    }

    /// Exactly one team is active while a clue or wall round is in play
    pub fn active_team(&self) -> Option<usize> {
        match self.state {
            RoundState::Selecting | RoundState::ClueQuestion(_) | RoundState::WallPlaying(_) => {
                Some(self.turn)
            }
            _ => None,
        }
    }

    pub fn is_buzzing(&self) -> bool {
        matches!(self.state, RoundState::BuzzQuestion(_))
    }

    fn describe(&self) -> String {
        format!("{} is {}", self.slot, self.state.name())
    }

    fn other_team(&self) -> usize {
        if self.team_count > 1 {
            (self.turn + 1) % self.team_count
        } else {
            self.turn
        }
    }

    fn pass_turn(&mut self) {
        if self.team_count > 1 {
            self.turn = self.other_team();
        }
    }

    /// Whether the episode provides content for `slot`
    pub fn slot_available(&self, slot: RoundSlot) -> bool {
        self.content.has_round(slot, self.team_count)
    }

    /// First playable slot after the current one
    pub fn next_slot(&self) -> RoundSlot {
        RoundSlot::ALL
            .into_iter()
            .filter(|slot| *slot > self.slot)
            .find(|slot| self.slot_available(*slot))
            .unwrap_or(RoundSlot::PostGame)
    }

    /// Enter a slot with a fresh round state
    pub fn enter(&mut self, slot: RoundSlot, ledger: &mut Ledger, rng: &mut StdRng) -> EngineResult<()> {
        if !self.slot_available(slot) {
            return Err(EngineError::invalid(
                format!("skip to {}", slot),
                "the episode has no content for that round",
            ));
        }

        ledger.clear_buzzes();
        self.previous = None;
        self.prompts.clear();
        self.bank = QuestionBank::empty();
        self.slot = slot;
        self.state = match slot {
            RoundSlot::PostGame => RoundState::PostRound,
            _ => RoundState::PreRound,
        };

        match slot {
            RoundSlot::Connections => {
                self.bank = QuestionBank::new(&Hieroglyph::ALL, self.content.connections.len());
                self.turn = 0;
            }
            RoundSlot::Completions => {
                self.bank = QuestionBank::new(&Hieroglyph::ALL, self.content.completions.len());
                self.turn = if self.team_count > 1 { 1 } else { 0 };
            }
            RoundSlot::ConnectingWalls => {
                self.bank = QuestionBank::new(&Hieroglyph::WALLS, self.content.connecting_walls.len());
                self.turn = ledger.wall_starter();
            }
            RoundSlot::MissingVowels => {
                self.prompts = build_prompts(&self.content.missing_vowels, rng).into();
            }
            RoundSlot::PreGame | RoundSlot::PostGame => {}
        }

        tracing::info!("Entered round {}", slot);
        Ok(())
    }

    pub fn legal_actions(&self, ledger: &Ledger) -> BTreeSet<Action> {
        let mut actions = BTreeSet::new();

        match self.slot {
            RoundSlot::PreGame => {
                actions.insert(Action::StartGame);
                return actions;
            }
            RoundSlot::PostGame => return actions,
            _ => {}
        }

        match &self.state {
            RoundState::PreRound => {
                actions.insert(Action::NextQuestion);
            }
            RoundState::Selecting => {
                actions.extend(self.bank.available().iter().map(|g| g.action()));
            }
            RoundState::ClueQuestion(clue) => {
                if clue.stealing {
                    actions.insert(Action::ScoreSteal);
                    actions.insert(Action::ScoreIncorrect);
                } else if clue.locked {
                    actions.extend(Action::score_team(self.turn));
                    actions.insert(Action::ScoreIncorrect);
                } else {
                    actions.insert(Action::LockIn);
                    if clue.can_reveal() {
                        actions.insert(Action::NextClue);
                    }
                }
            }
            RoundState::WallPlaying(wall) => match wall.phase() {
                WallPhase::Freeform => {
                    actions.insert(Action::LockIn);
                }
                WallPhase::Connections { .. } => {
                    actions.extend(Action::score_team(self.turn));
                    actions.insert(Action::ScoreIncorrect);
                }
                WallPhase::Complete => {
                    actions.insert(Action::NextQuestion);
                }
            },
            RoundState::BuzzQuestion(prompt) => {
                for (index, team) in ledger.teams().iter().enumerate() {
                    actions.extend(Action::score_team(index));
                    if prompt.answering.is_none() && !team.buzzed {
                        actions.extend(Action::buzz_team(index));
                    }
                }
                actions.insert(Action::ScoreIncorrect);
            }
            RoundState::PostRound => {
                actions.insert(Action::StartNextRound);
            }
        }

        actions
    }

    pub fn next_question(&mut self, ledger: &mut Ledger) -> EngineResult<()> {
        match &self.state {
            RoundState::PreRound if self.in_round() => match self.slot {
                RoundSlot::MissingVowels => {
                    self.next_prompt(ledger);
                    Ok(())
                }
                _ => {
                    self.state = if self.bank.is_exhausted() {
                        RoundState::PostRound
                    } else {
                        RoundState::Selecting
                    };
                    Ok(())
                }
            },
            RoundState::WallPlaying(wall) if wall.phase() == WallPhase::Complete => {
                if self.team_count <= 1 || self.bank.is_exhausted() {
                    self.state = RoundState::PostRound;
                } else {
                    self.pass_turn();
                    self.state = RoundState::Selecting;
                }
                Ok(())
            }
            _ => Err(EngineError::invalid(Action::NextQuestion, self.describe())),
        }
    }

    fn in_round(&self) -> bool {
        !matches!(self.slot, RoundSlot::PreGame | RoundSlot::PostGame)
    }

    pub fn pick_question(&mut self, glyph: Hieroglyph, rng: &mut StdRng) -> EngineResult<()> {
        if self.state != RoundState::Selecting {
            return Err(EngineError::invalid(glyph.action(), self.describe()));
        }

        let index = self.bank.pick(glyph)?;
        self.state = match self.slot {
            RoundSlot::Connections => {
                let question = self.content.connections[index].clone();
                RoundState::ClueQuestion(ClueQuestion::new(index, glyph, question, SLOTS_PER_CONNECTION))
            }
            RoundSlot::Completions => {
                let question = self.content.completions[index].clone();
                RoundState::ClueQuestion(ClueQuestion::new(
                    index,
                    glyph,
                    question,
                    SLOTS_PER_CONNECTION - 1,
                ))
            }
            RoundSlot::ConnectingWalls => {
                let wall = &self.content.connecting_walls[index];
                RoundState::WallPlaying(WallPuzzle::new(glyph, wall, rng))
            }
            _ => return Err(EngineError::invalid(glyph.action(), self.describe())),
        };

        tracing::debug!("Team #{} picked {:?}", self.turn + 1, glyph);
        Ok(())
    }

    pub fn reveal_next_clue(&mut self) -> EngineResult<()> {
        match &mut self.state {
            RoundState::ClueQuestion(clue) => clue.reveal_next(),
            _ => Err(EngineError::invalid(Action::NextClue, self.describe())),
        }
    }

    /// Freeze reveals on a clue question, or give up on a wall
    pub fn lock_in(&mut self, ledger: &mut Ledger) -> EngineResult<()> {
        let turn = self.turn;
        match &mut self.state {
            RoundState::ClueQuestion(clue) if !clue.stealing => clue.lock_in(),
            RoundState::WallPlaying(wall) => {
                let found = wall.give_up()?;
                ledger.award(turn, found as i32)
            }
            _ => Err(EngineError::invalid(Action::LockIn, self.describe())),
        }
    }

    /// Buzz in on the current prompt for the team at `team`
    pub fn buzz(&mut self, team: usize, ledger: &mut Ledger) -> EngineResult<()> {
        let action = Action::buzz_team(team).unwrap_or(Action::LockIn);
        let described = self.describe();
        let RoundState::BuzzQuestion(prompt) = &mut self.state else {
            return Err(EngineError::invalid(action, described));
        };

        if prompt.answering.is_some() {
            return Err(EngineError::invalid(action, "another team is answering"));
        }
        let entry = ledger.team_mut(team)?;
        if entry.buzzed {
            return Err(EngineError::invalid(action, "that team has already buzzed"));
        }

        entry.buzzed = true;
        prompt.answering = Some(team);
        Ok(())
    }

    pub fn toggle(&mut self, word: &str, ledger: &mut Ledger) -> EngineResult<()> {
        let turn = self.turn;
        let described = self.describe();
        let RoundState::WallPlaying(wall) = &mut self.state else {
            return Err(EngineError::invalid("toggle", described));
        };

        if let Toggle::Ended { groups_found } = wall.toggle(word)? {
            ledger.award(turn, groups_found as i32)?;
        }
        Ok(())
    }

    pub fn score(&mut self, outcome: ScoreOutcome, ledger: &mut Ledger) -> EngineResult<()> {
        let action = match outcome {
            ScoreOutcome::Team(index) => Action::score_team(index).unwrap_or(Action::ScoreTeam1),
            ScoreOutcome::Steal => Action::ScoreSteal,
            ScoreOutcome::Incorrect => Action::ScoreIncorrect,
        };
        let invalid = |state: &str| EngineError::invalid(action, state);
        let described = self.describe();
        let turn = self.turn;
        let other = self.other_team();
        let team_count = self.team_count;

        match &mut self.state {
            RoundState::ClueQuestion(clue) => match outcome {
                ScoreOutcome::Team(index) if clue.locked && !clue.stealing && index == turn => {
                    ledger.award(index, clue.points())?;
                    self.finish_clue();
                    Ok(())
                }
                ScoreOutcome::Steal if clue.stealing => {
                    ledger.award(other, STEAL_POINTS)?;
                    self.finish_clue();
                    Ok(())
                }
                ScoreOutcome::Incorrect if clue.locked && !clue.stealing && team_count > 1 => {
                    clue.open_steal();
                    Ok(())
                }
                ScoreOutcome::Incorrect if clue.locked => {
                    self.finish_clue();
                    Ok(())
                }
                _ => Err(invalid(&described)),
            },
            RoundState::WallPlaying(wall) => match outcome {
                ScoreOutcome::Team(index) if index == turn => {
                    let points = wall.score_connection(true)?;
                    ledger.award(index, points)
                }
                ScoreOutcome::Incorrect => wall.score_connection(false).map(|_| ()),
                _ => Err(invalid(&described)),
            },
            RoundState::BuzzQuestion(prompt) => match outcome {
                ScoreOutcome::Team(index) => {
                    ledger.award(index, 1)?;
                    self.next_prompt(ledger);
                    Ok(())
                }
                ScoreOutcome::Incorrect => {
                    let released = prompt.answering.take().is_some();
                    let everyone_buzzed = ledger.teams().iter().all(|t| t.buzzed);
                    if !released || everyone_buzzed {
                        self.next_prompt(ledger);
                    }
                    Ok(())
                }
                ScoreOutcome::Steal => Err(invalid(&described)),
            },
            _ => Err(invalid(&described)),
        }
    }

    fn finish_clue(&mut self) {
        if let RoundState::ClueQuestion(clue) = &self.state {
            self.previous = Some(PreviousAnswer {
                connection: clue.question.connection.clone(),
                details: clue.question.details.clone(),
                answer: clue.question.elements.clone(),
            });
        }

        self.pass_turn();
        self.state = if self.bank.is_exhausted() {
            RoundState::PostRound
        } else {
            RoundState::Selecting
        };
    }

    /// Resolve the current prompt (if any) and move to the next one
    fn next_prompt(&mut self, ledger: &mut Ledger) {
        if let RoundState::BuzzQuestion(prompt) = &self.state {
            self.previous = Some(PreviousAnswer {
                connection: prompt.connection.clone(),
                details: String::new(),
                answer: vec![prompt.answer.clone()],
            });
        }

        ledger.clear_buzzes();
        self.state = match self.prompts.pop_front() {
            Some(prompt) => RoundState::BuzzQuestion(prompt),
            None => RoundState::PostRound,
        };
    }
}
