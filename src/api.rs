//! HTTP API endpoints for room management.
//!
//! Rooms are created and torn down here; gameplay happens over the websocket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::episode::{EpisodeError, EpisodeSummary};
use crate::state::{AppState, RoomError};
use crate::types::{RoomCode, RoomOptions, Team};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub episode_id: String,
    #[serde(flatten)]
    pub options: RoomOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomResponse {
    pub room: RoomCode,
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
    pub episodes: usize,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = match &self {
            RoomError::Episode(EpisodeError::NotFound(_)) | RoomError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RoomError::Episode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RoomError::TeamCount { .. } | RoomError::TeamNames => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// List playable episodes.
///
/// GET /api/episodes
pub async fn list_episodes(State(state): State<Arc<AppState>>) -> Json<Vec<EpisodeSummary>> {
    Json(state.episodes.list())
}

/// Open a room for an episode.
///
/// POST /api/rooms
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Response {
    match state.create_room(&request.episode_id, request.options).await {
        Ok(room) => {
            let teams = room.summary().await.teams;
            (
                StatusCode::CREATED,
                Json(CreateRoomResponse {
                    room: room.code.clone(),
                    teams,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(episode = %request.episode_id, "Room creation failed: {}", e);
            e.into_response()
        }
    }
}

/// Room summary with connection counts per role.
///
/// GET /api/rooms/{room}
pub async fn get_room(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.get_room(&code).await {
        Some(room) => Json(room.summary().await).into_response(),
        None => RoomError::NotFound(code).into_response(),
    }
}

/// Close a room; connected clients receive `close`.
///
/// DELETE /api/rooms/{room}
pub async fn delete_room(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.close_room(&code).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: state.room_count().await,
        episodes: state.episodes.list().len(),
    })
}
