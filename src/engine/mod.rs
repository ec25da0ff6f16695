//! Room engine: the sole authority over one room's game state.
//!
//! Every command is checked against the legal-action set for the issuing
//! actor before anything is mutated. Rejected commands leave the engine
//! untouched.

pub mod actions;
pub mod audience;
pub mod buzz;
pub mod clue;
pub mod connect;
pub mod ledger;
pub mod selection;
pub mod this_or_that;
pub mod wall;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::episode::{Episode, EpisodeContent};
use crate::error::{EngineError, EngineResult};
use crate::types::{Answer, GameKind, GamePhase, Role, RoomOptions, SessionId, TeamId};

pub use actions::{Action, Hieroglyph};
pub use audience::AudienceAggregate;
pub use connect::{ConnectGame, PreviousAnswer, RoundSlot, RoundState, ScoreOutcome};
pub use ledger::Ledger;
pub use this_or_that::{Stage, ThisOrThatGame};

/// The closed set of formats a room can run
#[derive(Debug, Clone)]
pub enum Format {
    Connect(ConnectGame),
    ThisOrThat(ThisOrThatGame),
}

/// Who a vote was recorded for
#[derive(Debug, Clone, PartialEq)]
pub enum VoteReceipt {
    Team(TeamId, Answer),
    Audience(Answer),
}

#[derive(Debug, Clone)]
pub struct RoomEngine {
    episode: Arc<Episode>,
    ledger: Ledger,
    audience: Option<AudienceAggregate>,
    format: Format,
    rng: StdRng,
}

impl RoomEngine {
    pub fn new(episode: Arc<Episode>, options: &RoomOptions) -> Self {
        let ledger = Ledger::new(&options.teams);
        let format = match &episode.content {
            EpisodeContent::OnlyConnect(content) => {
                Format::Connect(ConnectGame::new(content.clone(), ledger.len()))
            }
            EpisodeContent::ThisOrThat(content) => {
                Format::ThisOrThat(ThisOrThatGame::new(content.clone()))
            }
        };
        let seed = options.seed.unwrap_or_else(rand::random::<u64>);

        Self {
            episode,
            ledger,
            audience: options.audience.then(AudienceAggregate::new),
            format,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn episode(&self) -> &Arc<Episode> {
        &self.episode
    }

    pub fn kind(&self) -> GameKind {
        self.episode.kind()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn audience(&self) -> Option<&AudienceAggregate> {
        self.audience.as_ref()
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn phase(&self) -> GamePhase {
        match &self.format {
            Format::Connect(game) => match game.slot() {
                RoundSlot::PreGame => GamePhase::PreGame,
                RoundSlot::PostGame => GamePhase::PostGame,
                _ => GamePhase::InRound,
            },
            Format::ThisOrThat(game) => match game.stage() {
                Stage::PreGame => GamePhase::PreGame,
                Stage::PostGame => GamePhase::PostGame,
                _ => GamePhase::InRound,
            },
        }
    }

    pub fn active_team(&self) -> Option<usize> {
        match &self.format {
            Format::Connect(game) => game.active_team(),
            Format::ThisOrThat(_) => None,
        }
    }

    fn describe(&self) -> String {
        match &self.format {
            Format::Connect(game) => format!("{} is {}", game.slot(), game.state().name()),
            Format::ThisOrThat(game) => game.stage().name().to_string(),
        }
    }

    fn is_buzzing(&self) -> bool {
        matches!(&self.format, Format::Connect(game) if game.is_buzzing())
    }

    /// Actions `actor` may issue right now
    pub fn legal_actions(&self, actor: &Role) -> BTreeSet<Action> {
        let all = match &self.format {
            Format::Connect(game) => game.legal_actions(&self.ledger),
            Format::ThisOrThat(game) => game.legal_actions(),
        };

        match actor {
            Role::Manager => all,
            Role::Team(id) => match self.ledger.index_of(id) {
                Ok(index) => self.team_actions(index, &all),
                Err(_) => BTreeSet::new(),
            },
            Role::Audience(_) => BTreeSet::new(),
        }
    }

    fn team_actions(&self, index: usize, all: &BTreeSet<Action>) -> BTreeSet<Action> {
        let mut allowed = BTreeSet::new();

        if self.active_team() == Some(index) {
            allowed.extend(
                all.iter()
                    .copied()
                    .filter(|a| a.selector().is_some() || matches!(a, Action::NextClue | Action::LockIn)),
            );
        }

        if self.is_buzzing() && Action::buzz_team(index).is_some_and(|b| all.contains(&b)) {
            allowed.insert(Action::LockIn);
        }

        allowed
    }

    /// Validate `action` for `actor` and apply it
    pub fn perform(&mut self, actor: &Role, action: Action) -> EngineResult<()> {
        if let Role::Team(id) = actor {
            self.ledger.index_of(id)?;
        }

        if !self.legal_actions(actor).contains(&action) {
            let manager_may = self.legal_actions(&Role::Manager).contains(&action);
            return Err(match actor {
                Role::Audience(_) => {
                    EngineError::Unauthorized("The audience can only vote".to_string())
                }
                Role::Team(_) if manager_may => {
                    EngineError::Unauthorized(format!("Only the game manager can {} now", action))
                }
                _ => EngineError::invalid(action, self.describe()),
            });
        }

        tracing::debug!("{:?} performs {}", actor, action);

        match (actor, action) {
            (Role::Team(id), Action::LockIn) if self.is_buzzing() => {
                let index = self.ledger.index_of(id)?;
                self.lock_in_buzz(index)
            }
            (_, Action::StartGame) => self.start_game(),
            (_, Action::StartNextRound) => self.start_next_round(),
            (_, Action::NextQuestion) => self.next_question(),
            (_, Action::NextClue) => self.reveal_next_clue(),
            (_, Action::LockIn) => self.lock_in(),
            (_, Action::BuzzTeam1 | Action::BuzzTeam2) => {
                self.lock_in_buzz(action.team_index().unwrap_or_default())
            }
            (_, Action::ScoreTeam1 | Action::ScoreTeam2) => {
                self.score(ScoreOutcome::Team(action.team_index().unwrap_or_default()))
            }
            (_, Action::ScoreSteal) => self.score(ScoreOutcome::Steal),
            (_, Action::ScoreIncorrect) => self.score(ScoreOutcome::Incorrect),
            (_, Action::RevealAnswer) => self.reveal_answer(),
            (_, select) => match select.selector() {
                Some(glyph) => self.pick_question(glyph),
                None => Err(EngineError::invalid(select, self.describe())),
            },
        }
    }

    pub fn start_game(&mut self) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => {
                if game.slot() != RoundSlot::PreGame {
                    return Err(EngineError::invalid(Action::StartGame, "the game has already started"));
                }
                let first = game.next_slot();
                game.enter(first, &mut self.ledger, &mut self.rng)
            }
            Format::ThisOrThat(game) => game.start(&mut self.ledger, self.audience.as_mut()),
        }
    }

    /// Enter the given round with fresh state
    pub fn select_round(&mut self, slot: RoundSlot) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.enter(slot, &mut self.ledger, &mut self.rng),
            Format::ThisOrThat(game) => match slot {
                RoundSlot::PostGame => {
                    game.skip_to_end();
                    Ok(())
                }
                _ => Err(EngineError::invalid(
                    format!("skip to {}", slot),
                    "this game has no rounds",
                )),
            },
        }
    }

    pub fn start_next_round(&mut self) -> EngineResult<()> {
        let next = match &self.format {
            Format::Connect(game) if game.state() == &RoundState::PostRound => game.next_slot(),
            _ => return Err(EngineError::invalid(Action::StartNextRound, self.describe())),
        };
        self.select_round(next)
    }

    pub fn next_question(&mut self) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.next_question(&mut self.ledger),
            Format::ThisOrThat(game) => game.next_question(&mut self.ledger, self.audience.as_mut()),
        }
    }

    pub fn pick_question(&mut self, selector: Hieroglyph) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.pick_question(selector, &mut self.rng),
            Format::ThisOrThat(_) => Err(EngineError::invalid(selector.action(), self.describe())),
        }
    }

    pub fn reveal_next_clue(&mut self) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.reveal_next_clue(),
            Format::ThisOrThat(_) => Err(EngineError::invalid(Action::NextClue, self.describe())),
        }
    }

    /// Lock in a clue answer, or give up on a wall
    pub fn lock_in(&mut self) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.lock_in(&mut self.ledger),
            Format::ThisOrThat(_) => Err(EngineError::invalid(Action::LockIn, self.describe())),
        }
    }

    /// Buzz in on a missing-vowels prompt for the team at `team`
    pub fn lock_in_buzz(&mut self, team: usize) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.buzz(team, &mut self.ledger),
            Format::ThisOrThat(_) => Err(EngineError::invalid(Action::LockIn, self.describe())),
        }
    }

    pub fn score(&mut self, outcome: ScoreOutcome) -> EngineResult<()> {
        match &mut self.format {
            Format::Connect(game) => game.score(outcome, &mut self.ledger),
            Format::ThisOrThat(_) => Err(EngineError::invalid("score", self.describe())),
        }
    }

    /// Toggle a wall clue on behalf of `actor`
    pub fn toggle_wall_clue(&mut self, actor: &Role, clue: &str) -> EngineResult<()> {
        match actor {
            Role::Manager => {}
            Role::Team(id) => {
                let index = self.ledger.index_of(id)?;
                if self.active_team() != Some(index) {
                    return Err(EngineError::Unauthorized(
                        "Only the team playing the wall can select clues".to_string(),
                    ));
                }
            }
            Role::Audience(_) => {
                return Err(EngineError::Unauthorized("The audience can only vote".to_string()))
            }
        }

        match &mut self.format {
            Format::Connect(game) => game.toggle(clue, &mut self.ledger),
            Format::ThisOrThat(_) => Err(EngineError::invalid("toggle", self.describe())),
        }
    }

    pub fn skip_to_round(&mut self, name: &str) -> EngineResult<()> {
        let slot: RoundSlot = name.parse()?;
        tracing::info!("Skipping to {}", slot);
        self.select_round(slot)
    }

    pub fn skip_to_end(&mut self) -> EngineResult<()> {
        self.select_round(RoundSlot::PostGame)
    }

    pub fn reveal_answer(&mut self) -> EngineResult<()> {
        match &mut self.format {
            Format::ThisOrThat(game) => game.reveal_answer(&mut self.ledger, self.audience.as_mut()),
            Format::Connect(_) => Err(EngineError::invalid(Action::RevealAnswer, self.describe())),
        }
    }

    fn ensure_votes_open(&self) -> EngineResult<()> {
        match &self.format {
            Format::ThisOrThat(game) if game.is_open() => Ok(()),
            _ => Err(EngineError::invalid("vote", format!("{} (voting is closed)", self.describe()))),
        }
    }

    /// Record a team's vote; last write wins
    pub fn team_vote(&mut self, team: usize, answer: Answer) -> EngineResult<()> {
        self.ensure_votes_open()?;
        self.ledger.team_mut(team)?.vote = Some(answer);
        Ok(())
    }

    /// Record an audience member's vote; last write wins
    pub fn audience_vote(&mut self, session: &SessionId, answer: Answer) -> EngineResult<()> {
        self.ensure_votes_open()?;
        let audience = self
            .audience
            .as_mut()
            .ok_or_else(|| EngineError::Unauthorized("Audience voting is disabled".to_string()))?;
        audience.vote(session, answer);
        Ok(())
    }

    /// Route a `vote` command from `actor`
    pub fn cast_vote(
        &mut self,
        actor: &Role,
        team: Option<&TeamId>,
        answer: Answer,
    ) -> EngineResult<VoteReceipt> {
        match (actor, team) {
            (Role::Audience(session), None) => {
                self.audience_vote(session, answer)?;
                Ok(VoteReceipt::Audience(answer))
            }
            (Role::Audience(_), Some(_)) => Err(EngineError::Unauthorized(
                "The audience cannot vote for a team".to_string(),
            )),
            (Role::Team(own), team) => {
                if team.is_some_and(|t| t != own) {
                    return Err(EngineError::Unauthorized(
                        "Teams can only vote for themselves".to_string(),
                    ));
                }
                let index = self.ledger.index_of(own)?;
                self.team_vote(index, answer)?;
                Ok(VoteReceipt::Team(own.clone(), answer))
            }
            (Role::Manager, Some(team)) => {
                let index = self.ledger.index_of(team)?;
                self.team_vote(index, answer)?;
                Ok(VoteReceipt::Team(team.clone(), answer))
            }
            (Role::Manager, None) => Err(EngineError::UnknownTeam(
                "a team is required for manager votes".to_string(),
            )),
        }
    }

    pub fn join_audience(&mut self, session: &SessionId) {
        if let Some(audience) = self.audience.as_mut() {
            audience.join(session);
        }
    }

    pub fn leave_audience(&mut self, session: &SessionId) {
        if let Some(audience) = self.audience.as_mut() {
            audience.leave(session);
        }
    }
}
