pub mod room;

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::episode::{EpisodeError, EpisodeStore};
use crate::types::{GameKind, RoomCode, RoomOptions};

pub use room::{Room, RoomEvent, RoomSummary};

/// Room codes avoid 0/O and 1/I/L
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ";
const CODE_LENGTH: usize = 4;

/// Team cap for This or That rooms
pub const MAX_TEAMS: usize = 8;

fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error(transparent)]
    Episode(#[from] EpisodeError),

    #[error("{game:?} rooms need {min} to {max} teams, got {got}")]
    TeamCount {
        game: GameKind,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("Team names must be non-empty and unique")]
    TeamNames,

    #[error("Room not found: {0}")]
    NotFound(RoomCode),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomCode, Arc<Room>>>>,
    pub episodes: Arc<dyn EpisodeStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(episodes: Arc<dyn EpisodeStore>, config: ServerConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            episodes,
            config: Arc::new(config),
        }
    }

    /// Open a room for an episode with the given teams
    pub async fn create_room(
        &self,
        episode_id: &str,
        mut options: RoomOptions,
    ) -> Result<Arc<Room>, RoomError> {
        let episode = self.episodes.get(episode_id)?;

        let (min, max) = match episode.kind() {
            GameKind::OnlyConnect => (1, 2),
            GameKind::ThisOrThat => (0, MAX_TEAMS),
        };
        if !(min..=max).contains(&options.teams.len()) {
            return Err(RoomError::TeamCount {
                game: episode.kind(),
                min,
                max,
                got: options.teams.len(),
            });
        }

        options.teams = options.teams.iter().map(|n| n.trim().to_string()).collect();
        let mut seen = std::collections::HashSet::new();
        if options.teams.iter().any(|n| n.is_empty() || !seen.insert(n.clone())) {
            return Err(RoomError::TeamNames);
        }

        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let room = Arc::new(Room::new(
            code.clone(),
            episode,
            &options,
            self.config.broadcast_capacity,
        ));
        rooms.insert(code.clone(), room.clone());

        tracing::info!(
            room = %code,
            episode = %episode_id,
            teams = options.teams.len(),
            audience = options.audience,
            "Room created"
        );
        Ok(room)
    }

    /// Look up an open room; codes are case-insensitive
    pub async fn get_room(&self, code: &str) -> Option<Arc<Room>> {
        self.rooms
            .read()
            .await
            .get(&code.to_uppercase())
            .cloned()
    }

    /// Close a room and drop it from the registry
    pub async fn close_room(&self, code: &str) -> Result<(), RoomError> {
        let room = self
            .rooms
            .write()
            .await
            .remove(&code.to_uppercase())
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        room.close();
        Ok(())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Close rooms with no activity for `timeout`, returning their codes
    pub async fn reap_idle(&self, timeout: Duration) -> Vec<RoomCode> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut idle = Vec::new();
        for room in rooms {
            if room.is_closed() || room.idle_for().await >= timeout {
                idle.push(room.code.clone());
            }
        }

        for code in &idle {
            if self.close_room(code).await.is_ok() {
                tracing::info!(room = %code, "Closed idle room");
            }
        }
        idle
    }
}
