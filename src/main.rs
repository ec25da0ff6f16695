use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizroom::{
    api, broadcast,
    config::ServerConfig,
    episode::{DirectoryEpisodeStore, EpisodeStore, MemoryEpisodeStore},
    state::AppState,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizroom...");

    let config = ServerConfig::from_env();

    let episodes: Arc<dyn EpisodeStore> = match DirectoryEpisodeStore::load(&config.episode_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "Failed to load episodes from {}: {}. No episodes will be available.",
                config.episode_dir.display(),
                e
            );
            Arc::new(MemoryEpisodeStore::new())
        }
    };

    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(episodes, config));

    // Push coalesced audience votes on a fixed cadence
    broadcast::spawn_audience_flusher(state.clone());

    // Close rooms nobody has touched in a while
    broadcast::spawn_room_reaper(state.clone());

    let api_routes = Router::new()
        .route("/api/episodes", get(api::list_episodes))
        .route("/api/rooms", post(api::create_room))
        .route(
            "/api/rooms/{room}",
            get(api::get_room).delete(api::delete_room),
        )
        .route("/health", get(api::health));

    let app = Router::new()
        .merge(api_routes)
        .route("/ws/{room}", get(ws::ws_handler))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
