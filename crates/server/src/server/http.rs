//! axum routes: the game WebSocket, a health check and optional static files.

use super::{Frame, GameState};
use axum::{
    Json, Router,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{Sink, SinkExt, StreamExt};
use protocol::Phase;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, broadcast};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub game_state: Arc<RwLock<GameState>>,
    pub update_tx: broadcast::Sender<Frame>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub players: usize,
    pub population: usize,
    pub phase: Phase,
    pub tick: u64,
}

/// Build the router. Unmatched paths are served from `static_dir` when set.
pub fn router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health));

    if let Some(dir) = static_dir.filter(|dir| !dir.is_empty()) {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Serve the router on `listener`.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    let app = router(state, static_dir);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let game = state.game_state.read().await;
    Json(HealthReport {
        status: "ok".to_string(),
        players: game.clients.len(),
        population: game.sim.population(),
        phase: game.sim.state().phase,
        tick: game.sim.state().tick_count,
    })
}

/// Handle WebSocket connections for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket connection from {}", addr);
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_game_connection(socket, addr, state).await {
            error!("Connection error from {}: {}", addr, e);
        }
    })
}

async fn send_frame<S>(write: &mut S, frame: &Frame) -> anyhow::Result<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let text: &str = frame;
    write.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Drive one session: greet, then relay broadcasts out and messages in until
/// either side closes.
async fn handle_game_connection(
    socket: WebSocket,
    addr: SocketAddr,
    state: AppState,
) -> anyhow::Result<()> {
    let (mut write, mut read) = socket.split();

    // Subscribe first so this session also sees its own player count.
    let mut update_rx = state.update_tx.subscribe();

    let (client_id, greeting) = {
        let mut game = state.game_state.write().await;
        let id = game.add_client(addr);
        (id, game.greeting(id))
    };

    let result = async {
        for frame in greeting? {
            send_frame(&mut write, &frame).await?;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let reply = {
                                let mut game = state.game_state.write().await;
                                game.handle_message(client_id, text.as_str())
                            };
                            match reply {
                                Ok(Some(frame)) => send_frame(&mut write, &frame).await?,
                                Ok(None) => {}
                                Err(e) => warn!("Bad message from {}: {}", addr, e),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("WebSocket error from {}: {}", addr, e);
                            break;
                        }
                        _ => {}
                    }
                }
                update = update_rx.recv() => {
                    match update {
                        Ok(frame) => send_frame(&mut write, &frame).await?,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Client {} lagged behind by {} updates", client_id, skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    state.game_state.write().await.remove_client(client_id);
    result
}
