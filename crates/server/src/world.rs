//! World state management.
//!
//! `SimulationState` is the aggregate root of the engine: arena, cells, dots,
//! the current phase and the population history.

use crate::config::Config;
use crate::entity::{Cell, Dot};
use crate::history::History;
use glam::Vec2;
use protocol::{Color, Phase, Snapshot};
use rand::Rng;

/// Arena bounds. The origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Lowest legal centre for a circle of `radius`.
    #[inline]
    pub fn min_bound(&self, radius: f32) -> Vec2 {
        Vec2::splat(radius)
    }

    /// Highest legal centre for a circle of `radius`.
    #[inline]
    pub fn max_bound(&self, radius: f32) -> Vec2 {
        Vec2::new(self.width - radius, self.height - radius)
    }

    /// Whether a circle of `radius` at `position` lies fully inside.
    #[inline]
    pub fn contains(&self, position: Vec2, radius: f32) -> bool {
        let min = self.min_bound(radius);
        let max = self.max_bound(radius);
        position.x >= min.x && position.x <= max.x && position.y >= min.y && position.y <= max.y
    }

    /// Uniformly random position at least `inset` away from every border.
    #[inline]
    pub fn random_position(&self, inset: f32, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            rng.random_range(inset..self.width - inset),
            rng.random_range(inset..self.height - inset),
        )
    }
}

/// The simulation state.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Next entity ID to assign.
    next_id: u32,
    pub arena: Arena,
    /// Living cells, in creation order.
    pub cells: Vec<Cell>,
    /// Uncollected dots.
    pub dots: Vec<Dot>,
    pub phase: Phase,
    pub history: History,
    /// Completed ticks.
    pub tick_count: u64,
}

impl SimulationState {
    /// Create an empty state in the lag phase.
    pub fn new(config: &Config) -> Self {
        Self {
            next_id: 1,
            arena: Arena::new(config.arena.width, config.arena.height),
            cells: Vec::with_capacity(128),
            dots: Vec::with_capacity(config.dot.max_amount.max(config.dot.initial_amount)),
            phase: Phase::Lag,
            history: History::new(config.history.capacity),
            tick_count: 0,
        }
    }

    /// Get the next entity ID.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1; // Skip 0
        }
        id
    }

    #[inline]
    pub fn population(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.id == id)
    }

    /// Place a starter cell for `owner` at a random inset position.
    pub fn spawn_starter(
        &mut self,
        owner: u32,
        color: Color,
        config: &Config,
        rng: &mut impl Rng,
    ) -> u32 {
        let position = self.arena.random_position(config.arena.spawn_margin, rng);
        let id = self.next_id();
        self.cells.push(Cell::new(id, owner, position, color, &config.cell, self.tick_count));
        id
    }

    /// Place a new dot at a random inset position.
    pub fn spawn_dot(&mut self, config: &Config, rng: &mut impl Rng) -> u32 {
        let position = self.arena.random_position(config.arena.dot_margin, rng);
        let kind = Dot::roll_kind(rng, config.dot.adaptation_chance);
        let id = self.next_id();
        self.dots.push(Dot::new(id, position, config.dot.radius, kind));
        id
    }

    /// Spawn the initial dot pool.
    pub fn seed_dots(&mut self, config: &Config, rng: &mut impl Rng) {
        for _ in 0..config.dot.initial_amount {
            self.spawn_dot(config, rng);
        }
    }

    /// Remove every cell owned by `owner`. Returns how many were removed.
    pub fn remove_player_cells(&mut self, owner: u32) -> usize {
        let before = self.cells.len();
        self.cells.retain(|cell| cell.owner_id != owner);
        before - self.cells.len()
    }

    /// The oldest surviving cell of `owner`.
    pub fn first_cell_of_mut(&mut self, owner: u32) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|cell| cell.owner_id == owner)
    }

    /// Number of cells owned by `owner`.
    pub fn cells_of(&self, owner: u32) -> usize {
        self.cells.iter().filter(|cell| cell.owner_id == owner).count()
    }

    /// Consistent copy for clients.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cells: self.cells.iter().map(Cell::view).collect(),
            dots: self.dots.iter().map(Dot::view).collect(),
            phase: self.phase,
            population_history: self.history.to_vec(),
        }
    }
}
