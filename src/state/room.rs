use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::engine::RoomEngine;
use crate::episode::Episode;
use crate::error::{EngineError, EngineResult};
use crate::protocol::ServerMessage;
use crate::types::{ConnectionCounts, ConnectionId, GameKind, GamePhase, Role, RoomCode, RoomOptions, Team};
use crate::view::{EpisodeInfo, RoomView, ViewSet};

/// Fan-out event for every connection in a room
#[derive(Debug, Clone)]
pub enum RoomEvent {
    StateChanged(Arc<ViewSet>),
    Closed,
}

/// Summary for `GET /api/rooms/{room}`
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub room: RoomCode,
    pub episode_id: String,
    pub title: String,
    pub game: GameKind,
    pub phase: GamePhase,
    pub created_at: DateTime<Utc>,
    pub teams: Vec<Team>,
    pub connections: ConnectionCounts,
}

/// One live room: its engine, its connections and its broadcast channel
pub struct Room {
    pub code: RoomCode,
    pub created_at: DateTime<Utc>,
    episode: Arc<Episode>,
    engine: Mutex<RoomEngine>,
    events: broadcast::Sender<RoomEvent>,
    connections: RwLock<HashMap<ConnectionId, Role>>,
    last_activity: RwLock<Instant>,
    closed: AtomicBool,
    audience_dirty: AtomicBool,
}

impl Room {
    pub fn new(code: RoomCode, episode: Arc<Episode>, options: &RoomOptions, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            code,
            created_at: Utc::now(),
            engine: Mutex::new(RoomEngine::new(episode.clone(), options)),
            episode,
            events: tx,
            connections: RwLock::new(HashMap::new()),
            last_activity: RwLock::new(Instant::now()),
            closed: AtomicBool::new(false),
            audience_dirty: AtomicBool::new(false),
        }
    }

    pub fn episode(&self) -> &Arc<Episode> {
        &self.episode
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Refresh the idle timer
    pub async fn touch(&self) {
        *self.last_activity.write().await = Instant::now();
    }

    pub async fn idle_for(&self) -> Duration {
        self.last_activity.read().await.elapsed()
    }

    /// Add a connection to the registry. Team roles must name a team in this
    /// room; audience members join the aggregate.
    pub async fn register(&self, role: Role) -> EngineResult<ConnectionId> {
        if self.is_closed() {
            return Err(EngineError::RoomClosed);
        }

        {
            let mut engine = self.engine.lock().await;
            match &role {
                Role::Team(id) => {
                    engine.ledger().index_of(id)?;
                }
                Role::Audience(session) => {
                    engine.join_audience(session);
                    self.audience_dirty.store(true, Ordering::SeqCst);
                }
                Role::Manager => {}
            }
        }

        let id = ulid::Ulid::new().to_string();
        self.connections.write().await.insert(id.clone(), role.clone());
        self.touch().await;
        tracing::info!(room = %self.code, connection = %id, "Registered {:?}", role);
        Ok(id)
    }

    /// Drop a connection; an audience member's pending vote goes with it
    pub async fn unregister(&self, id: &ConnectionId) {
        let removed = self.connections.write().await.remove(id);

        if let Some(Role::Audience(session)) = &removed {
            let still_connected = self
                .connections
                .read()
                .await
                .values()
                .any(|r| matches!(r, Role::Audience(s) if s == session));
            if !still_connected {
                self.engine.lock().await.leave_audience(session);
                self.audience_dirty.store(true, Ordering::SeqCst);
            }
        }

        if removed.is_some() {
            tracing::info!(room = %self.code, connection = %id, "Unregistered connection");
        }
    }

    pub async fn connection_counts(&self) -> ConnectionCounts {
        let mut counts = ConnectionCounts::default();
        for role in self.connections.read().await.values() {
            match role {
                Role::Manager => counts.managers += 1,
                Role::Team(_) => counts.teams += 1,
                Role::Audience(_) => counts.audience += 1,
            }
        }
        counts
    }

    /// Mutate the engine and, on success, broadcast fresh snapshots.
    ///
    /// Projection and send happen under the engine lock so every receiver sees
    /// state changes in the order they were applied.
    pub async fn apply<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut RoomEngine) -> EngineResult<T>,
    {
        if self.is_closed() {
            return Err(EngineError::RoomClosed);
        }

        let mut engine = self.engine.lock().await;
        let result = f(&mut engine)?;

        let views = Arc::new(ViewSet::project(&engine));
        // No receivers is fine
        let _ = self.events.send(RoomEvent::StateChanged(views));
        self.audience_dirty.store(false, Ordering::SeqCst);

        Ok(result)
    }

    /// Mutate the engine without broadcasting; the change goes out with the
    /// next audience flush
    pub async fn apply_coalesced<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut RoomEngine) -> EngineResult<T>,
    {
        if self.is_closed() {
            return Err(EngineError::RoomClosed);
        }

        let mut engine = self.engine.lock().await;
        let result = f(&mut engine)?;
        self.audience_dirty.store(true, Ordering::SeqCst);
        Ok(result)
    }

    /// Broadcast pending audience changes. Returns whether anything was sent.
    pub async fn flush_audience(&self) -> bool {
        if self.is_closed() || !self.audience_dirty.swap(false, Ordering::SeqCst) {
            return false;
        }

        let engine = self.engine.lock().await;
        let views = Arc::new(ViewSet::project(&engine));
        let _ = self.events.send(RoomEvent::StateChanged(views));
        true
    }

    /// Snapshot for one role, or `None` for a team not in this room
    pub async fn view_for(&self, role: &Role) -> Option<RoomView> {
        let engine = self.engine.lock().await;
        ViewSet::project(&engine).for_role(role).cloned()
    }

    /// Full resync for a (re)connecting client
    pub async fn setup_message(&self, role: &Role) -> EngineResult<ServerMessage> {
        if self.is_closed() {
            return Err(EngineError::RoomClosed);
        }

        let state = self
            .view_for(role)
            .await
            .ok_or_else(|| EngineError::UnknownTeam(format!("{:?}", role)))?;

        Ok(ServerMessage::Setup {
            episode: EpisodeInfo::from(self.episode.as_ref()),
            state,
        })
    }

    /// Tear the room down and tell every connection
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.events.send(RoomEvent::Closed);
        tracing::info!(room = %self.code, "Room closed");
    }

    pub async fn summary(&self) -> RoomSummary {
        let (phase, teams) = {
            let engine = self.engine.lock().await;
            (engine.phase(), engine.ledger().teams().to_vec())
        };

        RoomSummary {
            room: self.code.clone(),
            episode_id: self.episode.id.clone(),
            title: self.episode.title.clone(),
            game: self.episode.kind(),
            phase,
            created_at: self.created_at,
            teams,
            connections: self.connection_counts().await,
        }
    }
}
