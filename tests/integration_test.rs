use quizroom::config::ServerConfig;
use quizroom::engine::{Action, Hieroglyph};
use quizroom::episode::{DirectoryEpisodeStore, Episode, MemoryEpisodeStore};
use quizroom::protocol::{ClientMessage, ServerMessage};
use quizroom::state::{AppState, Room, RoomEvent};
use quizroom::types::{Answer, GamePhase, Role, RoomOptions, TeamId};
use quizroom::view::{Board, RoomView};
use quizroom::ws::handlers::handle_message;
use std::sync::Arc;

fn only_connect_json() -> serde_json::Value {
    let wall = |prefix: &str| {
        (1..=4)
            .map(|g| {
                serde_json::json!({
                    "connection": format!("{} group {}", prefix, g),
                    "elements": (1..=4).map(|c| format!("{}{}{}", prefix, g, c)).collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>()
    };

    serde_json::json!({
        "id": "pilot",
        "title": "Pilot",
        "author": "Quizmaster",
        "game": "only_connect",
        "connections": [
            {"connection": "Planets", "details": "Inner planets", "elements": ["Mercury", "Venus", "Earth", "Mars"]},
            {"connection": "Fish", "elements": ["Cod", "Ling", "Hake", "Dab"]}
        ],
        "completions": [
            {"connection": "Numbers", "elements": ["One", "Two", "Three", "Four"]}
        ],
        "connecting_walls": [wall("a"), wall("b")],
        "missing_vowels": [
            {"connection": "Rivers", "words": [
                {"answer": "THAMES", "prompt": "TH MS"},
                {"answer": "SEVERN", "prompt": "SVR N"}
            ]}
        ]
    })
}

fn this_or_that_json() -> serde_json::Value {
    serde_json::json!({
        "id": "cheese-or-font",
        "title": "Cheese or Font?",
        "game": "this_or_that",
        "this": "Cheese",
        "that": "Font",
        "questions": [
            {"question_text": "Brie", "is_this": true, "answer_text": "A soft cheese"},
            {"question_text": "Comic Sans", "is_that": true},
            {"question_text": "Emmental", "is_this": true, "is_that": true}
        ]
    })
}

fn app_state() -> Arc<AppState> {
    let mut store = MemoryEpisodeStore::new();
    for json in [only_connect_json(), this_or_that_json()] {
        let episode: Episode = serde_json::from_value(json).expect("Episode should parse");
        store.insert(episode).expect("Episode should validate");
    }
    Arc::new(AppState::new(Arc::new(store), ServerConfig::default()))
}

async fn open_room(
    state: &Arc<AppState>,
    episode: &str,
    teams: &[&str],
    audience: bool,
) -> (Arc<Room>, Vec<TeamId>) {
    let room = state
        .create_room(
            episode,
            RoomOptions {
                teams: teams.iter().map(|t| t.to_string()).collect(),
                audience,
                seed: Some(42),
            },
        )
        .await
        .expect("Room should be created");
    let ids = room.summary().await.teams.into_iter().map(|t| t.id).collect();
    (room, ids)
}

async fn send(
    state: &Arc<AppState>,
    room: &Arc<Room>,
    role: &Role,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    handle_message(msg, role, room, state).await
}

async fn act(state: &Arc<AppState>, room: &Arc<Room>, role: &Role, action: Action) {
    let reply = send(state, room, role, ClientMessage::Action { action }).await;
    assert!(reply.is_none(), "{} should succeed, got {:?}", action, reply);
}

async fn manager_view(room: &Room) -> RoomView {
    room.view_for(&Role::Manager)
        .await
        .expect("Manager always has a view")
}

fn scores(view: &RoomView) -> Vec<i32> {
    view.teams
        .as_ref()
        .expect("Manager sees teams")
        .iter()
        .map(|t| t.score)
        .collect()
}

fn error_code(reply: Option<ServerMessage>) -> String {
    match reply {
        Some(ServerMessage::Error { code, .. }) => code,
        other => panic!("Expected error, got {:?}", other),
    }
}

/// Two clues score 3, the turn passes, and a miss opens a steal
#[tokio::test]
async fn test_connections_round_flow() {
    let state = app_state();
    let (room, teams) = open_room(&state, "pilot", &["Alpha", "Beta"], false).await;
    let manager = Role::Manager;
    let alpha = Role::Team(teams[0].clone());
    let beta = Role::Team(teams[1].clone());

    act(&state, &room, &manager, Action::StartGame).await;
    act(&state, &room, &manager, Action::NextQuestion).await;

    let view = manager_view(&room).await;
    match &view.board {
        Board::Selecting {
            active_team,
            available,
        } => {
            assert_eq!(active_team, &teams[0]);
            assert_eq!(available, &vec![Hieroglyph::TwoReeds, Hieroglyph::Lion]);
        }
        other => panic!("Expected Selecting, got {:?}", other),
    }

    // Beta is not on turn
    let reply = send(
        &state,
        &room,
        &beta,
        ClientMessage::Action {
            action: Action::SelectTwoReeds,
        },
    )
    .await;
    assert_eq!(error_code(reply), "UNAUTHORIZED");

    act(&state, &room, &alpha, Action::SelectTwoReeds).await;
    act(&state, &room, &alpha, Action::NextClue).await;
    act(&state, &room, &alpha, Action::LockIn).await;

    // Scoring is the manager's call
    let reply = send(
        &state,
        &room,
        &alpha,
        ClientMessage::Action {
            action: Action::ScoreTeam1,
        },
    )
    .await;
    assert_eq!(error_code(reply), "UNAUTHORIZED");

    act(&state, &room, &manager, Action::ScoreTeam1).await;

    let view = manager_view(&room).await;
    assert_eq!(scores(&view), vec![3, 0]);
    assert!(matches!(&view.board, Board::Selecting { active_team, .. } if active_team == &teams[1]));
    assert_eq!(view.previous.as_ref().unwrap().connection, "Planets");

    // Beta misses, Alpha steals
    act(&state, &room, &beta, Action::SelectLion).await;
    act(&state, &room, &beta, Action::LockIn).await;
    act(&state, &room, &manager, Action::ScoreIncorrect).await;

    let view = manager_view(&room).await;
    match &view.board {
        Board::ClueQuestion {
            stealing, clues, ..
        } => {
            assert!(*stealing);
            assert_eq!(clues.len(), 4);
        }
        other => panic!("Expected steal, got {:?}", other),
    }

    act(&state, &room, &manager, Action::ScoreSteal).await;
    let view = manager_view(&room).await;
    assert_eq!(scores(&view), vec![4, 0]);
    assert!(matches!(view.board, Board::PostRound));

    act(&state, &room, &manager, Action::StartNextRound).await;
    assert_eq!(
        manager_view(&room).await.round.map(|r| r.to_string()),
        Some("COMPLETIONS".to_string())
    );
}

/// Strikes, a confirmed group, and the third strike revealing the rest
#[tokio::test]
async fn test_connecting_wall_flow() {
    let state = app_state();
    let (room, teams) = open_room(&state, "pilot", &["Alpha", "Beta"], false).await;
    let manager = Role::Manager;

    act(&state, &room, &manager, Action::StartGame).await;
    let reply = send(
        &state,
        &room,
        &manager,
        ClientMessage::Skip {
            round_name: "CONNECTING_WALLS".to_string(),
        },
    )
    .await;
    assert!(reply.is_none());
    act(&state, &room, &manager, Action::NextQuestion).await;

    // Tied scores: the first team starts
    let player = Role::Team(teams[0].clone());
    act(&state, &room, &player, Action::SelectLion).await;

    let toggle = |word: &str| ClientMessage::Toggle {
        word: word.to_string(),
    };

    // A mixed selection is a strike
    for word in ["a11", "a21", "a31", "a41"] {
        assert!(send(&state, &room, &player, toggle(word)).await.is_none());
    }
    match manager_view(&room).await.board {
        Board::WallPlaying {
            strikes,
            selected,
            ungrouped,
            ..
        } => {
            assert_eq!(strikes, 1);
            assert!(selected.is_empty());
            assert_eq!(ungrouped.len(), 16);
        }
        other => panic!("Expected wall, got {:?}", other),
    }

    // The other team cannot touch the wall
    let reply = send(&state, &room, &Role::Team(teams[1].clone()), toggle("a11")).await;
    assert_eq!(error_code(reply), "UNAUTHORIZED");

    // A clue not on the wall
    let reply = send(&state, &room, &player, toggle("zebra")).await;
    assert_eq!(error_code(reply), "INVALID_ACTION");

    // A canonical group confirms without a strike
    for word in ["a14", "a12", "a11", "a13"] {
        send(&state, &room, &player, toggle(word)).await;
    }
    match manager_view(&room).await.board {
        Board::WallPlaying {
            strikes, grouped, ..
        } => {
            assert_eq!(strikes, 1);
            assert_eq!(grouped, vec!["a11", "a12", "a13", "a14"]);
        }
        other => panic!("Expected wall, got {:?}", other),
    }

    // Two more misses end the freeform phase
    for _ in 0..2 {
        for word in ["a21", "a31", "a41", "a22"] {
            send(&state, &room, &player, toggle(word)).await;
        }
    }

    let view = manager_view(&room).await;
    assert_eq!(scores(&view), vec![1, 0]);
    match &view.board {
        Board::WallPlaying {
            phase,
            strikes,
            ungrouped,
            grouped,
            not_found,
            confirming,
            scoring,
            ..
        } => {
            assert_eq!(*phase, "connections");
            assert_eq!(*strikes, 3);
            let confirming = confirming.as_ref().expect("Last selection is shown");
            assert!(!confirming.matched);
            assert_eq!(confirming.clues, vec!["a21", "a22", "a31", "a41"]);
            assert_eq!(*scoring, Some(0));
            assert!(ungrouped.is_empty());
            let expected: Vec<String> = (2..=4)
                .flat_map(|g| (1..=4).map(move |c| format!("a{}{}", g, c)))
                .collect();
            assert_eq!(not_found, &expected);
            assert_eq!(grouped.len() + not_found.len(), 16);
        }
        other => panic!("Expected wall, got {:?}", other),
    }

    // One point per connection guessed
    for action in [
        Action::ScoreTeam1,
        Action::ScoreTeam1,
        Action::ScoreIncorrect,
        Action::ScoreTeam1,
    ] {
        act(&state, &room, &manager, action).await;
    }
    assert_eq!(scores(&manager_view(&room).await), vec![4, 0]);

    act(&state, &room, &manager, Action::NextQuestion).await;
    let view = manager_view(&room).await;
    match &view.board {
        Board::Selecting {
            active_team,
            available,
        } => {
            assert_eq!(active_team, &teams[1]);
            assert_eq!(available, &vec![Hieroglyph::Water]);
        }
        other => panic!("Expected Selecting, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_vowels_buzzing() {
    let state = app_state();
    let (room, teams) = open_room(&state, "pilot", &["Alpha", "Beta"], false).await;
    let manager = Role::Manager;
    let alpha = Role::Team(teams[0].clone());
    let beta = Role::Team(teams[1].clone());

    act(&state, &room, &manager, Action::StartGame).await;
    send(
        &state,
        &room,
        &manager,
        ClientMessage::Skip {
            round_name: "missing vowels".to_string(),
        },
    )
    .await;
    act(&state, &room, &manager, Action::NextQuestion).await;

    match room.view_for(&alpha).await.unwrap().board {
        Board::BuzzQuestion { prompt, answer, .. } => {
            assert_eq!(prompt, "TH MS");
            assert!(answer.is_none());
        }
        other => panic!("Expected buzz question, got {:?}", other),
    }

    act(&state, &room, &beta, Action::LockIn).await;
    // Only one team answers at a time
    let reply = send(
        &state,
        &room,
        &alpha,
        ClientMessage::Action {
            action: Action::LockIn,
        },
    )
    .await;
    assert!(reply.is_some());

    act(&state, &room, &manager, Action::ScoreTeam2).await;
    assert_eq!(scores(&manager_view(&room).await), vec![0, 1]);

    // Both teams miss the second prompt
    act(&state, &room, &alpha, Action::LockIn).await;
    act(&state, &room, &manager, Action::ScoreIncorrect).await;
    match manager_view(&room).await.board {
        Board::BuzzQuestion {
            prompt, answering, ..
        } => {
            assert_eq!(prompt, "SVR N");
            assert!(answering.is_none());
        }
        other => panic!("Expected buzz question, got {:?}", other),
    }
    act(&state, &room, &beta, Action::LockIn).await;
    act(&state, &room, &manager, Action::ScoreIncorrect).await;

    let view = manager_view(&room).await;
    assert!(matches!(view.board, Board::PostRound));
    assert_eq!(view.previous.unwrap().answer, vec!["SEVERN".to_string()]);

    act(&state, &room, &manager, Action::StartNextRound).await;
    let view = manager_view(&room).await;
    assert_eq!(view.phase, GamePhase::PostGame);
    assert!(view.actions.unwrap().is_empty());
}

#[tokio::test]
async fn test_this_or_that_team_votes() {
    let state = app_state();
    let (room, teams) = open_room(&state, "cheese-or-font", &["Alpha", "Beta"], false).await;
    let manager = Role::Manager;
    let alpha = Role::Team(teams[0].clone());

    // Votes are closed before the first question
    let ballot = |team: Option<TeamId>, vote: Answer| ClientMessage::Vote { team, vote };
    assert_eq!(
        error_code(send(&state, &room, &alpha, ballot(None, Answer::This)).await),
        "INVALID_ACTION"
    );

    act(&state, &room, &manager, Action::StartGame).await;

    assert_eq!(
        send(&state, &room, &alpha, ballot(None, Answer::That)).await,
        Some(ServerMessage::Voted {
            team: Some(teams[0].clone()),
            vote: Answer::That
        })
    );
    // Last write wins
    send(&state, &room, &alpha, ballot(None, Answer::This)).await;
    // The manager votes on a team's behalf
    send(
        &state,
        &room,
        &manager,
        ballot(Some(teams[1].clone()), Answer::That),
    )
    .await;
    // Teams cannot vote for each other
    assert_eq!(
        error_code(send(&state, &room, &alpha, ballot(Some(teams[1].clone()), Answer::Both)).await),
        "UNAUTHORIZED"
    );

    act(&state, &room, &manager, Action::RevealAnswer).await;
    let view = manager_view(&room).await;
    assert_eq!(scores(&view), vec![1, 0]);
    match view.board {
        Board::Answer {
            number,
            headline,
            answer,
            ..
        } => {
            assert_eq!(number, 1);
            assert_eq!(headline, "Cheese");
            assert_eq!(answer, Answer::This);
        }
        other => panic!("Expected answer, got {:?}", other),
    }

    act(&state, &room, &manager, Action::NextQuestion).await;
    let view = manager_view(&room).await;
    assert!(view.teams.unwrap().iter().all(|t| !t.voted));

    send(
        &state,
        &room,
        &manager,
        ClientMessage::Skip {
            round_name: "POST_GAME".to_string(),
        },
    )
    .await;
    assert_eq!(manager_view(&room).await.phase, GamePhase::PostGame);
}

/// Sixty of a hundred audience votes matching the answer score 0.6
#[tokio::test]
async fn test_audience_vote_share() {
    let state = app_state();
    let (room, _) = open_room(&state, "cheese-or-font", &[], true).await;
    let manager = Role::Manager;

    act(&state, &room, &manager, Action::StartGame).await;

    for n in 0..100 {
        let role = Role::Audience(format!("viewer-{}", n));
        room.register(role.clone()).await.unwrap();
        let answer = if n < 60 { Answer::This } else { Answer::That };
        let reply = send(
            &state,
            &room,
            &role,
            ClientMessage::Vote {
                team: None,
                vote: answer,
            },
        )
        .await;
        assert_eq!(
            reply,
            Some(ServerMessage::Voted {
                team: None,
                vote: answer
            })
        );
    }

    let audience = manager_view(&room).await.audience.unwrap();
    assert_eq!(audience.count, 100);
    assert_eq!(audience.voted, 100);
    let tally = audience.tally.unwrap();
    assert_eq!(tally.get(&Answer::This), Some(&60));
    assert_eq!(tally.get(&Answer::That), Some(&40));

    // The audience sees progress but not the split
    let audience_view = room
        .view_for(&Role::Audience("viewer-0".to_string()))
        .await
        .unwrap();
    assert!(audience_view.audience.unwrap().tally.is_none());
    assert!(audience_view.teams.is_none());

    act(&state, &room, &manager, Action::RevealAnswer).await;
    let audience = manager_view(&room).await.audience.unwrap();
    assert!((audience.score - 0.6).abs() < 1e-9);
    assert_eq!(audience.voted, 0);
}

/// A fresh setup equals what a connected client already holds
#[tokio::test]
async fn test_reconnect_matches_live_view() {
    let state = app_state();
    let (room, teams) = open_room(&state, "pilot", &["Alpha", "Beta"], false).await;
    let manager = Role::Manager;
    let beta = Role::Team(teams[1].clone());

    let mut live = room.subscribe();

    act(&state, &room, &manager, Action::StartGame).await;
    act(&state, &room, &manager, Action::NextQuestion).await;
    act(&state, &room, &Role::Team(teams[0].clone()), Action::SelectLion).await;
    act(&state, &room, &manager, Action::NextClue).await;

    let mut last = None;
    while let Ok(event) = live.try_recv() {
        if let RoomEvent::StateChanged(views) = event {
            last = views.for_role(&beta).cloned();
        }
    }
    let last = last.expect("Beta should have received state changes");

    match send(&state, &room, &beta, ClientMessage::Setup).await {
        Some(ServerMessage::Setup { episode, state }) => {
            assert_eq!(episode.id, "pilot");
            assert_eq!(state, last);
            assert_eq!(state.me, Some(teams[1].clone()));
            assert!(state.actions.is_none());
        }
        other => panic!("Expected setup, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_commands_leave_state_untouched() {
    let state = app_state();
    let (room, _) = open_room(&state, "pilot", &["Alpha"], false).await;
    let manager = Role::Manager;

    act(&state, &room, &manager, Action::StartGame).await;
    let before = manager_view(&room).await;

    for action in [Action::LockIn, Action::ScoreSteal, Action::RevealAnswer] {
        let reply = send(&state, &room, &manager, ClientMessage::Action { action }).await;
        assert_eq!(error_code(reply), "INVALID_ACTION");
    }
    let reply = send(
        &state,
        &room,
        &manager,
        ClientMessage::Skip {
            round_name: "LIGHTNING".to_string(),
        },
    )
    .await;
    assert_eq!(error_code(reply), "UNKNOWN_ROUND");

    let reply = send(
        &state,
        &room,
        &Role::Audience("lurker".to_string()),
        ClientMessage::Action {
            action: Action::NextQuestion,
        },
    )
    .await;
    assert_eq!(error_code(reply), "UNAUTHORIZED");

    assert!(serde_json::from_str::<ClientMessage>(r#"{"cmd":"action","action":"WIN"}"#).is_err());

    assert_eq!(manager_view(&room).await, before);
}

#[tokio::test]
async fn test_close_room_notifies_connections() {
    let state = app_state();
    let (room, _) = open_room(&state, "pilot", &["Alpha"], false).await;
    let mut rx = room.subscribe();

    assert!(send(&state, &room, &Role::Manager, ClientMessage::Close)
        .await
        .is_none());
    assert!(matches!(rx.recv().await.unwrap(), RoomEvent::Closed));
    assert!(state.get_room(&room.code).await.is_none());

    // Late commands are dropped without a reply
    let reply = send(
        &state,
        &room,
        &Role::Manager,
        ClientMessage::Action {
            action: Action::StartGame,
        },
    )
    .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_rooms_from_episode_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pilot.json"),
        serde_json::to_string_pretty(&only_connect_json()).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let store = DirectoryEpisodeStore::load(dir.path()).unwrap();
    let state = Arc::new(AppState::new(Arc::new(store), ServerConfig::default()));

    let listed = state.episodes.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Pilot");

    let (room, teams) = open_room(&state, "pilot", &["Solo"], false).await;
    assert_eq!(teams.len(), 1);

    act(&state, &room, &Role::Manager, Action::StartGame).await;
    let summary = room.summary().await;
    assert_eq!(summary.phase, GamePhase::InRound);
    assert_eq!(summary.episode_id, "pilot");
}
