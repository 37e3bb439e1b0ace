//! FHE Rock-Paper-Scissors Player Service
//!
//! HTTP facade over one player's game coordinator, with a background task
//! that keeps the session views and the last submission current.

mod config;
mod handlers;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::PlayerConfig;
use handlers::*;
use state::AppState;

fn create_router(state: AppState) -> Router {
    Router::new()
        // Coordinator
        .route("/api/state", get(get_state))
        .route("/api/move", post(select_move))
        .route("/api/move/reset", post(reset_move))
        // Games
        .route("/api/game/create", post(create_game))
        .route("/api/game/join", post(join_game))
        .route("/api/game/:game_id", get(get_game))
        .route("/api/games/refresh", post(refresh_games))
        // Health
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PlayerConfig::from_env()?;
    info!("Player: {}", config.player);
    info!("Registry contract: {}", config.ledger.contract_address);
    info!(
        "Encryption backend: {:?}, ledger backend: {:?}",
        config.fhe_backend, config.ledger_backend
    );

    let state = AppState::from_config(&config);
    state.spawn_initialize();
    state.spawn_poller(config.refresh_interval);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Player service listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
