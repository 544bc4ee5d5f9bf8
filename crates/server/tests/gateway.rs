//! End-to-end tests of the WebSocket gateway on an ephemeral port.

use axum::extract::State;
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, MoveIntent, Phase, ServerMessage};
use server::server::{http, run_game_loop};
use server::{AppState, Config, GameState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server. Without the game loop nothing ticks, which keeps the
/// message order deterministic.
async fn start(with_game_loop: bool) -> (SocketAddr, AppState) {
    let mut config = Config::default();
    config.server.seed = Some(7);
    config.server.static_dir = None;
    let tick_interval = config.server.tick_interval();
    let sample_interval = config.server.sample_interval();

    let (update_tx, _) = broadcast::channel(64);
    let game_state = Arc::new(RwLock::new(GameState::new(config, update_tx.clone())));
    if with_game_loop {
        tokio::spawn(run_game_loop(
            Arc::clone(&game_state),
            tick_interval,
            sample_interval,
        ));
    }

    let state = AppState {
        game_state,
        update_tx,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serve_state = state.clone();
    tokio::spawn(async move { http::serve(listener, serve_state, None).await });
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn next_message(ws: &mut Client) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() {
            return ServerMessage::parse(msg.to_text().unwrap()).unwrap();
        }
    }
}

async fn send(ws: &mut Client, message: &ClientMessage) {
    ws.send(Message::Text(message.encode().unwrap().into())).await.unwrap();
}

#[tokio::test]
async fn test_connect_greets_and_counts_players() {
    let (addr, _state) = start(false).await;

    let mut first = connect(addr).await;
    assert_eq!(next_message(&mut first).await, ServerMessage::Welcome { player_id: 1 });
    match next_message(&mut first).await {
        ServerMessage::GameState(snapshot) => {
            assert_eq!(snapshot.cells.len(), 1);
            assert_eq!(snapshot.cells[0].player_id, 1);
            assert!(snapshot.cells[0].is_original);
            assert_eq!(snapshot.dots.len(), 15);
            assert_eq!(snapshot.phase, Phase::Lag);
        }
        other => panic!("unexpected message {:?}", other),
    }
    assert_eq!(next_message(&mut first).await, ServerMessage::PlayerCount(1));

    let mut second = connect(addr).await;
    assert_eq!(next_message(&mut second).await, ServerMessage::Welcome { player_id: 2 });
    assert_eq!(next_message(&mut first).await, ServerMessage::PlayerCount(2));

    second.close(None).await.unwrap();
    assert_eq!(next_message(&mut first).await, ServerMessage::PlayerCount(1));
}

#[tokio::test]
async fn test_restart_rejected_while_pending() {
    let (addr, state) = start(false).await;
    let mut ws = connect(addr).await;
    for _ in 0..3 {
        next_message(&mut ws).await;
    }

    // Garbage is logged and ignored; the session stays open.
    ws.send(Message::Text("garbage".into())).await.unwrap();

    send(&mut ws, &ClientMessage::Restart).await;
    send(&mut ws, &ClientMessage::Restart).await;
    match next_message(&mut ws).await {
        ServerMessage::Notice(text) => assert!(text.contains("pending")),
        other => panic!("unexpected message {:?}", other),
    }
    assert!(state.game_state.read().await.sim.is_restart_pending());
}

#[tokio::test]
async fn test_updates_flow_with_game_loop() {
    let (addr, state) = start(true).await;
    let mut ws = connect(addr).await;
    send(&mut ws, &ClientMessage::Move(MoveIntent::new(1.0, 0.0))).await;

    let snapshot = loop {
        if let ServerMessage::GameUpdate(snapshot) = next_message(&mut ws).await {
            break snapshot;
        }
    };
    assert!(snapshot.cells.iter().any(|cell| cell.player_id == 1));

    let axum::Json(report) = http::health(State(state)).await;
    assert_eq!(report.status, "ok");
    assert_eq!(report.players, 1);
    assert!(report.tick > 0);
}

#[tokio::test]
async fn test_health_without_clients() {
    let (_addr, state) = start(false).await;
    let axum::Json(report) = http::health(State(state)).await;
    assert_eq!(report.players, 0);
    assert_eq!(report.population, 0);
    assert_eq!(report.phase, Phase::Lag);
    assert_eq!(report.tick, 0);
}
