//! WebSocket message dispatch
//!
//! Every command is applied to the room engine atomically. Successful changes
//! reach clients through the room broadcast, so most commands have no direct
//! reply; rejections come back to the sender only.

use crate::engine::VoteReceipt;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, Room};
use crate::types::Role;
use std::sync::Arc;

/// Macro to check manager authorization and return early if unauthorized
macro_rules! check_manager {
    ($role:expr, $action:expr) => {
        if *$role != Role::Manager {
            return Some(ServerMessage::error(
                "UNAUTHORIZED",
                format!("Only the manager can {}", $action),
            ));
        }
    };
}

/// Turn an engine result into the sender's reply. Commands against a closed
/// room are dropped without a reply.
fn reply<T>(
    room: &Room,
    result: EngineResult<T>,
    ok: impl FnOnce(T) -> Option<ServerMessage>,
) -> Option<ServerMessage> {
    match result {
        Ok(value) => ok(value),
        Err(EngineError::RoomClosed) => {
            tracing::debug!(room = %room.code, "Ignoring command for closed room");
            None
        }
        Err(e) => {
            tracing::info!(room = %room.code, code = e.code(), "Rejected command: {}", e);
            Some(e.into())
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    room: &Arc<Room>,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    room.touch().await;

    match msg {
        ClientMessage::Action { action } => {
            let result = room.apply(|engine| engine.perform(role, action)).await;
            reply(room, result, |_| None)
        }

        ClientMessage::Vote { team, vote } => {
            // Audience votes are coalesced into the periodic flush
            let result = if matches!(role, Role::Audience(_)) {
                room.apply_coalesced(|engine| engine.cast_vote(role, team.as_ref(), vote))
                    .await
            } else {
                room.apply(|engine| engine.cast_vote(role, team.as_ref(), vote))
                    .await
            };

            reply(room, result, |receipt| {
                Some(match receipt {
                    VoteReceipt::Team(team, vote) => ServerMessage::Voted {
                        team: Some(team),
                        vote,
                    },
                    VoteReceipt::Audience(vote) => ServerMessage::Voted { team: None, vote },
                })
            })
        }

        ClientMessage::Toggle { word } => {
            let result = room
                .apply(|engine| engine.toggle_wall_clue(role, &word))
                .await;
            reply(room, result, |_| None)
        }

        ClientMessage::Skip { round_name } => {
            check_manager!(role, "skip rounds");
            let result = room
                .apply(|engine| engine.skip_to_round(&round_name))
                .await;
            reply(room, result, |_| None)
        }

        ClientMessage::Setup => {
            let result = room.setup_message(role).await;
            reply(room, result, Some)
        }

        ClientMessage::Close => {
            check_manager!(role, "close the room");
            if let Err(e) = state.close_room(&room.code).await {
                tracing::debug!(room = %room.code, "Close requested twice: {}", e);
            }
            None
        }
    }
}
