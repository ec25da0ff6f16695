pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, Room, RoomEvent};
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
    pub team: Option<String>,
    pub session: Option<String>,
}

impl WsQuery {
    /// Resolve the connection role. Audience members without a session id get
    /// a fresh one.
    pub fn role(&self) -> Result<Role, String> {
        match self.role.as_deref().unwrap_or("audience") {
            "manager" => Ok(Role::Manager),
            "team" => self
                .team
                .clone()
                .map(Role::Team)
                .ok_or_else(|| "team role requires a team id".to_string()),
            "audience" => Ok(Role::Audience(
                self.session
                    .clone()
                    .unwrap_or_else(|| ulid::Ulid::new().to_string()),
            )),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={}, role={:?}, team={:?}",
        code,
        params.role,
        params.team
    );

    let role = match params.role() {
        Ok(role) => role,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    let Some(room) = state.get_room(&code).await else {
        return (StatusCode::NOT_FOUND, "Room not found").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, role, room, state))
}

async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, role: Role, room: Arc<Room>, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let conn_id = match room.register(role.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(room = %room.code, "Rejected connection: {}", e);
            let _ = send_message(&mut sender, &ServerMessage::from(e)).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    // Subscribe before the resync so no change slips between the two
    let mut events = room.subscribe();

    let synced = match room.setup_message(&role).await {
        Ok(setup) => send_message(&mut sender, &setup).await,
        Err(_) => {
            let _ = send_message(&mut sender, &ServerMessage::Close).await;
            false
        }
    };

    if synced {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(RoomEvent::StateChanged(views)) => {
                            let Some(view) = views.for_role(&role) else {
                                continue;
                            };
                            let msg = ServerMessage::StateChange { state: view.clone() };
                            if !send_message(&mut sender, &msg).await {
                                break;
                            }
                        }
                        Ok(RoomEvent::Closed) | Err(RecvError::Closed) => {
                            let _ = send_message(&mut sender, &ServerMessage::Close).await;
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(room = %room.code, skipped, "Connection lagged, resyncing");
                            match room.setup_message(&role).await {
                                Ok(setup) => {
                                    if !send_message(&mut sender, &setup).await {
                                        break;
                                    }
                                }
                                Err(_) => break,
                            }
                        }
                    }
                }

                ws_msg = receiver.next() => {
                    match ws_msg {
                        Some(Ok(Message::Text(text))) => {
                            tracing::debug!(room = %room.code, "Received message: {}", text);

                            let response = match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => {
                                    handlers::handle_message(client_msg, &role, &room, &state).await
                                }
                                Err(e) => {
                                    tracing::warn!(room = %room.code, "Failed to parse client message: {}", e);
                                    Some(ServerMessage::error(
                                        "PARSE_ERROR",
                                        format!("Invalid message format: {}", e),
                                    ))
                                }
                            };

                            if let Some(response) = response {
                                if !send_message(&mut sender, &response).await {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("WebSocket closed");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if sender.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("WebSocket error: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    room.unregister(&conn_id).await;
    tracing::info!(room = %room.code, "WebSocket connection closed for role: {:?}", role);
}
