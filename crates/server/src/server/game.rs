//! Game state and main loop.

use crate::config::Config;
use crate::simulation::Simulation;
use futures_util::FutureExt;
use protocol::{ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::client::Client;
use super::{Frame, encode_frame};

/// Ticks between periodic timing reports.
const STATS_EVERY_TICKS: u64 = 600;

/// Main game state: the simulation plus connected sessions.
pub struct GameState {
    pub sim: Simulation,

    // ID counters
    next_client_id: u32,

    // Connected clients
    pub clients: HashMap<u32, Client>,

    // Outbound frames for every session
    update_tx: broadcast::Sender<Frame>,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl GameState {
    /// Create a new game state.
    pub fn new(config: Config, update_tx: broadcast::Sender<Frame>) -> Self {
        let sim = Simulation::from_config(config);
        info!(
            "World initialized: {}x{} arena, {} dots",
            sim.state().arena.width,
            sim.state().arena.height,
            sim.state().dots.len()
        );

        Self {
            sim,
            next_client_id: 1,
            clients: HashMap::new(),
            update_tx,
            update_time_avg: 0.0,
        }
    }

    /// Add a new client and give them a starter cell.
    pub fn add_client(&mut self, addr: SocketAddr) -> u32 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        self.clients.insert(id, Client::new(id, addr));
        let cell_id = self.sim.on_player_join(id);
        info!("Client {} connected from {} (cell {})", id, addr, cell_id);
        self.broadcast_player_count();
        id
    }

    /// Remove a client and all of their cells.
    pub fn remove_client(&mut self, id: u32) {
        if let Some(client) = self.clients.remove(&id) {
            let removed = self.sim.on_player_leave(id);
            info!(
                "Client {} ({}) disconnected after {:?} and {} messages, {} cells removed",
                id,
                client.addr,
                client.session_length(),
                client.messages,
                removed
            );
            self.broadcast_player_count();
        }
    }

    /// Frames a new session receives before any broadcast: its player ID and
    /// the full current state.
    pub fn greeting(&self, client_id: u32) -> anyhow::Result<Vec<Frame>> {
        Ok(vec![
            encode_frame(&ServerMessage::Welcome { player_id: client_id })?,
            encode_frame(&ServerMessage::GameState(self.sim.snapshot()))?,
        ])
    }

    /// Handle a text message from a client. Returns a reply meant only for
    /// that client, if any.
    pub fn handle_message(&mut self, client_id: u32, text: &str) -> anyhow::Result<Option<Frame>> {
        let client = self
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| anyhow::anyhow!("Client not found"))?;
        client.touch();

        match ClientMessage::parse(text)? {
            ClientMessage::Move(intent) => {
                self.sim.on_move_intent(client_id, intent.vector());
                Ok(None)
            }
            ClientMessage::Restart => match self.sim.request_restart() {
                Ok(()) => {
                    info!("Client {} requested a restart", client_id);
                    Ok(None)
                }
                Err(e) => {
                    debug!("Restart from client {} rejected: {}", client_id, e);
                    Ok(Some(encode_frame(&ServerMessage::Notice(e.to_string()))?))
                }
            },
        }
    }

    /// Run one simulation tick. Returns the update frame to broadcast, or
    /// `None` when nobody is listening.
    pub fn tick(&mut self) -> Option<Frame> {
        let report = self.sim.tick();
        if report.restarted {
            info!("Restart applied: {} cells", report.population);
        }
        if !report.starved.is_empty() {
            debug!("{} cells starved at tick {}", report.starved.len(), report.tick);
        }
        if report.tick % STATS_EVERY_TICKS == 0 {
            debug!(
                "Tick #{}: avg {:.3}ms, {} players, {} cells, {} dots, phase {}",
                report.tick,
                self.update_time_avg,
                self.clients.len(),
                report.population,
                self.sim.state().dots.len(),
                report.phase
            );
        }

        if self.update_tx.receiver_count() == 0 {
            return None;
        }
        match encode_frame(&ServerMessage::GameUpdate(self.sim.snapshot())) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Failed to encode game update: {}", e);
                None
            }
        }
    }

    /// Append a population sample stamped with the wall clock.
    pub fn sample_history(&mut self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.sim.sample_history(now);
    }

    fn broadcast_player_count(&self) {
        match encode_frame(&ServerMessage::PlayerCount(self.clients.len())) {
            // No receivers is fine
            Ok(frame) => {
                let _ = self.update_tx.send(frame);
            }
            Err(e) => warn!("Failed to encode player count: {}", e),
        }
    }
}

/// Run the game loop: one tick per `tick_interval`, one history sample per
/// `sample_interval`. Both run in this task so they never interleave.
pub async fn run_game_loop(
    state: Arc<RwLock<GameState>>,
    tick_interval: Duration,
    sample_interval: Duration,
) {
    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    // Skip missed ticks so the simulation speed stays constant.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sampler = interval_at(Instant::now() + sample_interval, sample_interval);
    sampler.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let update_tx = state.read().await.update_tx.clone();
    let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;

    loop {
        tokio::select! {
            scheduled = ticker.tick() => {
                // Drain any backlog so we always process the most recent tick.
                let mut skipped = 0u32;
                while ticker.tick().now_or_never().is_some() {
                    skipped += 1;
                }
                if skipped > 0 {
                    debug!(
                        "Skipped {} ticks to stay current (lag: {:?})",
                        skipped,
                        Instant::now().saturating_duration_since(scheduled)
                    );
                }

                let frame = {
                    let mut game = state.write().await;
                    let tick_start = std::time::Instant::now();
                    let frame = game.tick();
                    let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

                    game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

                    if tick_ms > tick_budget {
                        warn!(
                            "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} cells",
                            game.sim.state().tick_count,
                            tick_ms,
                            tick_budget,
                            game.clients.len(),
                            game.sim.population()
                        );
                    }
                    frame
                }; // Write lock released here

                if let Some(frame) = frame {
                    let _ = update_tx.send(frame);
                }
            }
            _ = sampler.tick() => {
                state.write().await.sample_history();
            }
        }
    }
}
