//! Session gateway: the game loop task, WebSocket sessions and HTTP routes.

use crate::config::Config;
use protocol::{ProtocolError, ServerMessage};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, broadcast};
use tracing::info;

pub mod client;
pub mod game;
pub mod http;

pub use game::{GameState, run_game_loop};
pub use http::{AppState, HealthReport, router};

/// An encoded JSON text frame, shared by every subscriber.
pub type Frame = Arc<str>;

/// Encode a message once for all receivers.
pub fn encode_frame(message: &ServerMessage) -> Result<Frame, ProtocolError> {
    Ok(message.encode()?.into())
}

/// Outbound frames buffered per session before it starts lagging.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Start the game loop and serve clients until the listener fails.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let (update_tx, _) = broadcast::channel::<Frame>(UPDATE_CHANNEL_CAPACITY);

    let tick_interval = config.server.tick_interval();
    let sample_interval = config.server.sample_interval();
    let static_dir = config.server.static_dir.clone();
    let listener = TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;

    // Create shared game state
    let game_state = Arc::new(RwLock::new(GameState::new(config, update_tx.clone())));

    // Start the game loop
    tokio::spawn(run_game_loop(
        Arc::clone(&game_state),
        tick_interval,
        sample_interval,
    ));

    let addr = listener.local_addr()?;
    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/ws", addr);
    if let Some(dir) = static_dir.as_deref().filter(|dir| !dir.is_empty()) {
        info!("Serving static files from {}", dir);
    }

    let state = AppState {
        game_state,
        update_tx,
    };
    http::serve(listener, state, static_dir.as_deref()).await
}
