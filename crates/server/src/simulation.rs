//! The simulation service.
//!
//! `Simulation` owns the state, the connected players and the random source.
//! It is synchronous; the gateway drives `tick` and `sample_history` from its
//! timers and forwards player events between ticks.

use crate::config::Config;
use crate::entity::ColorPalette;
use crate::lifecycle::{self, CollectionEffect};
use crate::phase;
use crate::physics;
use crate::world::SimulationState;
use glam::Vec2;
use protocol::{HistorySample, Phase, Snapshot};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

/// Rejected engine requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("restart rejected: no players connected")]
    NoPlayers,
    #[error("restart already pending")]
    RestartPending,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// A queued restart ran before this tick.
    pub restarted: bool,
    pub collisions: usize,
    pub collected: usize,
    /// Cells promoted to the adapted tier.
    pub promoted: Vec<u32>,
    /// Children born from fission.
    pub spawned: Vec<u32>,
    /// Cells removed by the phase cull.
    pub culled: Option<u32>,
    /// Cells removed by starvation.
    pub starved: Vec<u32>,
    pub dot_spawned: Option<u32>,
    pub phase: Phase,
    pub phase_changed: bool,
    pub population: usize,
}

/// The simulation engine.
pub struct Simulation<R: Rng = Pcg32> {
    config: Config,
    state: SimulationState,
    palette: ColorPalette,
    /// Connected players, ordered so restarts place cells deterministically.
    players: BTreeSet<u32>,
    rng: R,
    restart_pending: bool,
    starvation_ticks: u64,
}

impl Simulation<Pcg32> {
    /// Build an engine seeded from `server.seed`, or from the OS when unset.
    pub fn from_config(config: Config) -> Self {
        let rng = match config.server.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Self::new(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    /// Fresh state in the lag phase with the initial dot pool.
    pub fn new(config: Config, mut rng: R) -> Self {
        let mut state = SimulationState::new(&config);
        state.seed_dots(&config, &mut rng);
        let starvation_ticks = config.starvation_ticks();

        Self {
            config,
            state,
            palette: ColorPalette::default(),
            players: BTreeSet::new(),
            rng,
            restart_pending: false,
            starvation_ticks,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    #[inline]
    pub fn population(&self) -> usize {
        self.state.population()
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_restart_pending(&self) -> bool {
        self.restart_pending
    }

    /// Register a player and give them a starter cell. Returns the cell ID.
    pub fn on_player_join(&mut self, player: u32) -> u32 {
        self.players.insert(player);
        let color = self.palette.assign(player, &mut self.rng);
        self.state
            .spawn_starter(player, color, &self.config, &mut self.rng)
    }

    /// Forget a player and remove all of their cells, offspring included.
    /// Returns the number of cells removed.
    pub fn on_player_leave(&mut self, player: u32) -> usize {
        self.players.remove(&player);
        self.palette.release(player);
        self.state.remove_player_cells(player)
    }

    /// Steer the player's oldest surviving cell. Returns false if they have none.
    pub fn on_move_intent(&mut self, player: u32, vector: Vec2) -> bool {
        match self.state.first_cell_of_mut(player) {
            Some(cell) => {
                cell.steer(vector);
                true
            }
            None => false,
        }
    }

    /// Queue a restart for the start of the next tick.
    pub fn request_restart(&mut self) -> Result<(), EngineError> {
        if self.players.is_empty() {
            return Err(EngineError::NoPlayers);
        }
        if self.restart_pending {
            return Err(EngineError::RestartPending);
        }
        self.restart_pending = true;
        Ok(())
    }

    /// Replace the state with a fresh one holding one starter cell per
    /// connected player.
    pub fn restart(&mut self) {
        let mut fresh = SimulationState::new(&self.config);
        fresh.seed_dots(&self.config, &mut self.rng);
        for &player in &self.players {
            let color = self.palette.assign(player, &mut self.rng);
            fresh.spawn_starter(player, color, &self.config, &mut self.rng);
        }
        self.state = fresh;
        self.restart_pending = false;
        info!("Simulation restarted with {} players", self.players.len());
    }

    /// Run one simulation step.
    pub fn tick(&mut self) -> TickReport {
        let restarted = self.restart_pending;
        if restarted {
            self.restart();
        }

        let Self {
            config,
            state,
            rng,
            starvation_ticks,
            ..
        } = self;
        let arena = state.arena;

        state.tick_count += 1;
        let tick = state.tick_count;
        let mut report = TickReport {
            tick,
            restarted,
            ..Default::default()
        };

        for cell in &mut state.cells {
            lifecycle::integrate(cell, &arena);
        }

        report.collisions = physics::resolve_collisions(&mut state.cells);

        // Children pushed during this loop wait until the next tick.
        let scanned = state.cells.len();
        for index in 0..scanned {
            let Some(dot) = lifecycle::collect(&state.cells[index], &mut state.dots) else {
                continue;
            };
            report.collected += 1;

            match lifecycle::apply_collection(&mut state.cells[index], dot.kind, tick, &config.cell) {
                CollectionEffect::Promoted => report.promoted.push(state.cells[index].id),
                CollectionEffect::Replicate => {
                    let id = state.next_id();
                    let child = lifecycle::replicate(
                        &state.cells[index],
                        id,
                        tick,
                        &config.cell,
                        &arena,
                        rng,
                    );
                    state.cells.push(child);
                    report.spawned.push(id);
                }
                CollectionEffect::Fed | CollectionEffect::Counted => {}
            }
        }

        for cell in &mut state.cells {
            physics::clamp(cell, &arena);
        }

        let previous = state.phase;
        state.phase = phase::determine_phase(state.population(), &config.phase);
        if state.phase != previous {
            debug!(
                "Phase {} -> {} at population {}",
                previous,
                state.phase,
                state.population()
            );
            report.phase_changed = true;
        }
        report.phase = state.phase;

        let effects = phase::apply_phase_effects(state, config, rng);
        report.dot_spawned = effects.spawned_dot;
        report.culled = effects.culled;

        report.starved = lifecycle::cull_starved(&mut state.cells, tick, *starvation_ticks);
        report.population = state.population();
        report
    }

    /// Append a population sample stamped with `timestamp_ms`.
    pub fn sample_history(&mut self, timestamp_ms: u64) {
        let sample = HistorySample {
            time: timestamp_ms,
            population: self.state.population(),
            phase: self.state.phase,
        };
        self.state.history.record(sample);
    }

    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }
}
