use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Longest the reaper sleeps between sweeps
const REAP_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn a background task that pushes coalesced audience changes to every room
pub fn spawn_audience_flusher(state: Arc<AppState>) {
    let interval = state.config.audience_flush_interval;

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            flush_all(&state).await;
        }
    });
}

/// Flush pending audience updates in every open room. Returns how many rooms
/// sent a snapshot.
pub async fn flush_all(state: &AppState) -> usize {
    let rooms: Vec<_> = state.rooms.read().await.values().cloned().collect();

    let mut flushed = 0;
    for room in rooms {
        if room.flush_audience().await {
            flushed += 1;
        }
    }
    flushed
}

/// Spawn a background task that closes rooms idle past the configured timeout
pub fn spawn_room_reaper(state: Arc<AppState>) {
    let timeout = state.config.room_idle_timeout;
    let interval = timeout.min(REAP_INTERVAL);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let closed = state.reap_idle(timeout).await;
            if !closed.is_empty() {
                tracing::debug!(count = closed.len(), "Reaped idle rooms");
            }
        }
    });
}
