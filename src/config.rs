use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:6573";
const DEFAULT_EPISODE_DIR: &str = "episodes";
const DEFAULT_ROOM_IDLE_MINUTES: u64 = 15;
const DEFAULT_BROADCAST_CAPACITY: usize = 64;
const DEFAULT_AUDIENCE_FLUSH_MS: u64 = 500;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub episode_dir: PathBuf,
    /// Rooms without inbound traffic for this long are closed
    pub room_idle_timeout: Duration,
    /// Per-room broadcast channel capacity
    pub broadcast_capacity: usize,
    /// How often coalesced audience votes are pushed out
    pub audience_flush_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6573)),
            episode_dir: PathBuf::from(DEFAULT_EPISODE_DIR),
            room_idle_timeout: Duration::from_secs(DEFAULT_ROOM_IDLE_MINUTES * 60),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            audience_flush_interval: Duration::from_millis(DEFAULT_AUDIENCE_FLUSH_MS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = parse_var("BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 6573)));

        let episode_dir = std::env::var("EPISODE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EPISODE_DIR));

        let idle_minutes = parse_var("ROOM_IDLE_MINUTES", Some(DEFAULT_ROOM_IDLE_MINUTES))
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_ROOM_IDLE_MINUTES);

        let broadcast_capacity =
            parse_var("BROADCAST_CAPACITY", Some(DEFAULT_BROADCAST_CAPACITY))
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_BROADCAST_CAPACITY);

        let flush_ms = parse_var("AUDIENCE_FLUSH_MS", Some(DEFAULT_AUDIENCE_FLUSH_MS))
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_AUDIENCE_FLUSH_MS);

        let config = Self {
            bind_addr,
            episode_dir,
            room_idle_timeout: Duration::from_secs(idle_minutes.saturating_mul(60)),
            broadcast_capacity,
            audience_flush_interval: Duration::from_millis(flush_ms),
        };

        tracing::info!(
            bind_addr = %config.bind_addr,
            episode_dir = %config.episode_dir.display(),
            idle_minutes,
            broadcast_capacity,
            flush_ms,
            "Server config loaded"
        );

        config
    }
}

/// Read and parse an env var, warning and returning `default` when the value
/// does not parse.
fn parse_var<T: std::str::FromStr>(key: &str, default: Option<T>) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
