//! Role-specific snapshots of a room.
//!
//! Projection is a pure function of the engine state: only ordered
//! collections are used, so projecting unchanged state twice serializes to
//! identical bytes.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::engine::wall::WallPhase;
use crate::engine::{
    Action, Format, Hieroglyph, PreviousAnswer, RoomEngine, RoundSlot, RoundState, Stage,
};
use crate::episode::{ConnectionQuestion, Episode, EpisodeContent, MediaRef, ThisOrThatQuestion};
use crate::types::{Answer, GameKind, GamePhase, Role, TeamId};

/// Whose eyes a snapshot is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lens {
    Manager,
    Team(usize),
    Audience,
}

impl Lens {
    fn is_manager(&self) -> bool {
        matches!(self, Lens::Manager)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamView {
    pub id: TeamId,
    pub name: String,
    pub score: i32,
    pub voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<Answer>,
    pub buzzed: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudienceView {
    pub score: f64,
    pub voted: usize,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tally: Option<BTreeMap<Answer, u32>>,
}

/// A wall group once the freeform phase is over
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WallGroupView {
    pub clues: Vec<String>,
    pub found: bool,
    /// Hidden from players until the connection has been scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfirmingView {
    pub clues: Vec<String>,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Board {
    PreGame,
    PreRound,
    Selecting {
        active_team: TeamId,
        available: Vec<Hieroglyph>,
    },
    ClueQuestion {
        active_team: TeamId,
        selector: Hieroglyph,
        revealed: usize,
        clues: Vec<String>,
        locked: bool,
        stealing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        solution: Option<ConnectionQuestion>,
    },
    WallPlaying {
        active_team: TeamId,
        selector: Hieroglyph,
        phase: &'static str,
        ungrouped: Vec<String>,
        grouped: Vec<String>,
        not_found: Vec<String>,
        selected: Vec<usize>,
        strikes: u8,
        confirming: Option<ConfirmingView>,
        groups: Vec<WallGroupView>,
        /// Index into `groups` whose connection is being scored
        scoring: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        solution: Option<Vec<ConnectionQuestion>>,
    },
    BuzzQuestion {
        connection: String,
        prompt: String,
        answering: Option<TeamId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    PostRound,
    Question {
        number: usize,
        headline: String,
        text: Option<String>,
        media: Option<MediaRef>,
        #[serde(skip_serializing_if = "Option::is_none")]
        full_question: Option<ThisOrThatQuestion>,
    },
    Answer {
        number: usize,
        headline: String,
        answer: Answer,
        text: Option<String>,
        media: Option<MediaRef>,
        full_question: ThisOrThatQuestion,
    },
    PostGame,
}

/// The `state` payload of `state_change` and `setup` events
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomView {
    pub game: GameKind,
    pub phase: GamePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<AudienceView>,
    pub board: Board,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousAnswer>,
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub me: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
}

/// Public episode details sent with `setup`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EpisodeInfo {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub game: GameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub this: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub that: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_both: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_neither: Option<bool>,
}

impl From<&Episode> for EpisodeInfo {
    fn from(episode: &Episode) -> Self {
        let mut info = EpisodeInfo {
            id: episode.id.clone(),
            title: episode.title.clone(),
            author: episode.author.clone(),
            description: episode.description.clone(),
            game: episode.kind(),
            this: None,
            that: None,
            has_both: None,
            has_neither: None,
        };
        if let EpisodeContent::ThisOrThat(tot) = &episode.content {
            info.this = Some(tot.this.clone());
            info.that = Some(tot.that.clone());
            info.has_both = Some(tot.has_both());
            info.has_neither = Some(tot.has_neither());
        }
        info
    }
}

/// Snapshots for every role in a room, computed once per state change
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSet {
    pub manager: RoomView,
    pub teams: BTreeMap<TeamId, RoomView>,
    pub audience: RoomView,
}

impl ViewSet {
    pub fn project(engine: &RoomEngine) -> Self {
        let teams = engine
            .ledger()
            .teams()
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), project(engine, Lens::Team(i))))
            .collect();

        Self {
            manager: project(engine, Lens::Manager),
            teams,
            audience: project(engine, Lens::Audience),
        }
    }

    pub fn for_role(&self, role: &Role) -> Option<&RoomView> {
        match role {
            Role::Manager => Some(&self.manager),
            Role::Team(id) => self.teams.get(id),
            Role::Audience(_) => Some(&self.audience),
        }
    }
}

pub fn project(engine: &RoomEngine, lens: Lens) -> RoomView {
    let manager = lens.is_manager();
    let team_id = |index: usize| {
        engine
            .ledger()
            .teams()
            .get(index)
            .map(|t| t.id.clone())
            .unwrap_or_default()
    };

    let votes_public = matches!(engine.format(), Format::ThisOrThat(g) if g.is_revealed());
    let active = engine.active_team();
    let teams = match lens {
        Lens::Audience => None,
        _ => Some(
            engine
                .ledger()
                .teams()
                .iter()
                .enumerate()
                .map(|(i, t)| TeamView {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    score: t.score,
                    voted: t.vote.is_some(),
                    vote: if manager || votes_public || lens == Lens::Team(i) {
                        t.vote
                    } else {
                        None
                    },
                    buzzed: t.buzzed,
                    active: active == Some(i),
                })
                .collect(),
        ),
    };

    let audience = engine.audience().map(|a| AudienceView {
        score: a.score(),
        voted: a.voted(),
        count: a.count(),
        tally: manager.then(|| a.tally()),
    });

    let (round, board, previous) = match engine.format() {
        Format::Connect(game) => {
            let slot = game.slot();
            let turn = game.active_team().map(team_id).unwrap_or_default();
            let board = match (slot, game.state()) {
                (RoundSlot::PreGame, _) => Board::PreGame,
                (RoundSlot::PostGame, _) => Board::PostGame,
                (_, RoundState::PreRound) => Board::PreRound,
                (_, RoundState::PostRound) => Board::PostRound,
                (_, RoundState::Selecting) => Board::Selecting {
                    active_team: turn,
                    available: game.bank().available(),
                },
                (_, RoundState::ClueQuestion(clue)) => Board::ClueQuestion {
                    active_team: turn,
                    selector: clue.selector,
                    revealed: clue.revealed,
                    clues: clue.visible_clues(),
                    locked: clue.locked,
                    stealing: clue.stealing,
                    solution: manager.then(|| clue.question.clone()),
                },
                (_, RoundState::WallPlaying(wall)) => {
                    let results = wall.connection_results();
                    let groups = wall
                        .walkthrough()
                        .into_iter()
                        .filter_map(|g| {
                            let group = wall.groups().get(g)?;
                            let scored = results.get(g).copied().flatten();
                            Some(WallGroupView {
                                clues: group.elements.clone(),
                                found: group
                                    .elements
                                    .first()
                                    .is_some_and(|e| wall.grouped().contains(e)),
                                connection: (manager || scored.is_some())
                                    .then(|| group.connection.clone()),
                                correct: scored,
                            })
                        })
                        .collect();
                    let confirming = wall.confirming().map(|c| ConfirmingView {
                        clues: c.clues.clone(),
                        matched: c.matched,
                        connection: c
                            .group
                            .filter(|g| manager || results.get(*g).copied().flatten().is_some())
                            .and_then(|g| wall.groups().get(g))
                            .map(|g| g.connection.clone()),
                    });

                    Board::WallPlaying {
                        active_team: turn,
                        selector: wall.selector,
                        phase: match wall.phase() {
                            WallPhase::Freeform => "freeform",
                            WallPhase::Connections { .. } => "connections",
                            WallPhase::Complete => "complete",
                        },
                        ungrouped: wall.ungrouped().to_vec(),
                        grouped: wall.grouped().to_vec(),
                        not_found: wall.not_found().to_vec(),
                        selected: wall.selected().to_vec(),
                        strikes: wall.strikes(),
                        confirming,
                        groups,
                        scoring: wall.scoring_step(),
                        solution: manager.then(|| wall.groups().to_vec()),
                    }
                }
                (_, RoundState::BuzzQuestion(prompt)) => Board::BuzzQuestion {
                    connection: prompt.connection.clone(),
                    prompt: prompt.prompt.clone(),
                    answering: prompt.answering.map(team_id),
                    answer: manager.then(|| prompt.answer.clone()),
                },
            };
            let previous = match lens {
                Lens::Audience => None,
                _ => game.previous().cloned(),
            };
            (Some(slot), board, previous)
        }
        Format::ThisOrThat(game) => {
            let content = game.content();
            let board = match (game.stage(), game.current()) {
                (Stage::Question(_), Some((index, question))) => Board::Question {
                    number: index + 1,
                    headline: format!("Question #{}", index + 1),
                    text: question.question_text.clone(),
                    media: question.question_media.clone(),
                    full_question: manager.then(|| question.clone()),
                },
                (Stage::Answer(_), Some((index, question))) => Board::Answer {
                    number: index + 1,
                    headline: content.answer_label(question.answer()).to_string(),
                    answer: question.answer(),
                    text: question.answer_text.clone(),
                    media: question.answer_media.clone(),
                    full_question: question.clone(),
                },
                (Stage::PreGame, _) => Board::PreGame,
                _ => Board::PostGame,
            };
            (None, board, None)
        }
    };

    RoomView {
        game: engine.kind(),
        phase: engine.phase(),
        round,
        teams,
        audience,
        board,
        previous,
        me: match lens {
            Lens::Team(i) => Some(team_id(i)),
            _ => None,
        },
        actions: manager.then(|| engine.legal_actions(&Role::Manager).into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use crate::types::RoomOptions;
    use std::sync::Arc;

    fn options(audience: bool) -> RoomOptions {
        RoomOptions {
            teams: vec!["Alpha".to_string(), "Beta".to_string()],
            audience,
            seed: Some(5),
        }
    }

    #[test]
    fn test_projection_is_deterministic() {
        let mut engine = RoomEngine::new(Arc::new(fixtures::only_connect()), &options(true));
        engine.skip_to_round("CONNECTING_WALLS").unwrap();
        engine.next_question().unwrap();
        engine.pick_question(Hieroglyph::Lion).unwrap();

        let first = serde_json::to_string(&ViewSet::project(&engine).manager).unwrap();
        let second = serde_json::to_string(&ViewSet::project(&engine).manager).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_only_manager_sees_actions_and_solution() {
        let mut engine = RoomEngine::new(Arc::new(fixtures::only_connect()), &options(false));
        engine.start_game().unwrap();
        engine.next_question().unwrap();
        engine.pick_question(Hieroglyph::TwoReeds).unwrap();

        let views = ViewSet::project(&engine);
        assert!(views.manager.actions.is_some());
        assert!(matches!(
            views.manager.board,
            Board::ClueQuestion { solution: Some(_), .. }
        ));

        for view in views.teams.values().chain([&views.audience]) {
            assert!(view.actions.is_none());
            let Board::ClueQuestion { solution, clues, .. } = &view.board else {
                panic!("Expected clue question board");
            };
            assert!(solution.is_none());
            assert_eq!(clues, &vec!["Mercury".to_string()]);
        }

        let json = serde_json::to_value(&views.manager).unwrap();
        assert_eq!(json["board"]["state"], "clue_question");
        assert_eq!(json["phase"], "in-round");
        assert_eq!(json["round"], "CONNECTIONS");
    }

    #[test]
    fn test_wall_groups_hidden_from_players() {
        let mut engine = RoomEngine::new(Arc::new(fixtures::only_connect()), &options(false));
        engine.skip_to_round("CONNECTING_WALLS").unwrap();
        engine.next_question().unwrap();
        engine.pick_question(Hieroglyph::Lion).unwrap();
        for word in ["a11", "a12", "a13", "a14"] {
            engine.toggle_wall_clue(&Role::Manager, word).unwrap();
        }

        let views = ViewSet::project(&engine);
        let team_view = views.teams.values().next().unwrap();
        let json = serde_json::to_string(team_view).unwrap();
        assert!(!json.contains("a group 1"));
        assert!(!json.contains("solution"));

        let manager_json = serde_json::to_string(&views.manager).unwrap();
        assert!(manager_json.contains("a group 1"));
    }

    #[test]
    fn test_team_sees_only_own_vote_until_reveal() {
        let episode = Arc::new(fixtures::this_or_that(&[(true, false)]));
        let mut engine = RoomEngine::new(episode, &options(true));
        engine.start_game().unwrap();
        engine.team_vote(0, Answer::This).unwrap();
        engine.team_vote(1, Answer::That).unwrap();

        let views = ViewSet::project(&engine);
        let alpha_id = engine.ledger().teams()[0].id.clone();
        let alpha_view = &views.teams[&alpha_id];
        let teams = alpha_view.teams.as_ref().unwrap();
        assert_eq!(teams[0].vote, Some(Answer::This));
        assert_eq!(teams[1].vote, None);
        assert!(teams[1].voted);
        assert_eq!(alpha_view.me.as_deref(), Some(alpha_id.as_str()));

        assert!(views.audience.teams.is_none());
        assert!(views.audience.audience.as_ref().unwrap().tally.is_none());
        assert!(views.manager.audience.as_ref().unwrap().tally.is_some());

        engine.reveal_answer().unwrap();
        let views = ViewSet::project(&engine);
        let teams = views.teams[&alpha_id].teams.as_ref().unwrap();
        assert_eq!(teams[1].vote, Some(Answer::That));
        let Board::Answer { headline, .. } = &views.audience.board else {
            panic!("Expected answer board");
        };
        assert_eq!(headline, "Cheese");
    }

    #[test]
    fn test_episode_info_for_this_or_that() {
        let episode = fixtures::this_or_that(&[(true, true)]);
        let info = EpisodeInfo::from(&episode);
        assert_eq!(info.this.as_deref(), Some("Cheese"));
        assert_eq!(info.has_both, Some(true));
        assert_eq!(info.has_neither, Some(false));
    }
}
