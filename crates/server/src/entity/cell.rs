//! Cell type and tier handling.

use crate::config::CellConfig;
use glam::Vec2;
use protocol::{CellView, Color};

/// Size/speed tier of a cell. A cell starts in `Lag` and is promoted to
/// `Adapted` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Lag,
    Adapted,
}

impl Tier {
    #[inline]
    pub fn size(self, config: &CellConfig) -> f32 {
        match self {
            Tier::Lag => config.lag_size,
            Tier::Adapted => config.adapted_size,
        }
    }

    #[inline]
    pub fn speed(self, config: &CellConfig) -> f32 {
        match self {
            Tier::Lag => config.lag_speed,
            Tier::Adapted => config.adapted_speed,
        }
    }
}

/// A living cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Unique cell ID.
    pub id: u32,
    /// Owning player ID.
    pub owner_id: u32,
    /// Centre in arena coordinates.
    pub position: Vec2,
    /// Heading, unit length or zero.
    pub direction: Vec2,
    /// Distance moved per tick along `direction`.
    pub speed: f32,
    /// Radius.
    pub size: f32,
    /// Adaptation dots collected so far.
    pub adaptation_dots: u32,
    pub is_adapted: bool,
    /// True only for the starter cell created when the player joined.
    pub is_original: bool,
    pub color: Color,
    /// Tick of the last dot collection (starvation clock).
    pub last_collect_tick: u64,
}

impl Cell {
    /// Create a stationary lag-tier cell.
    pub fn new(
        id: u32,
        owner_id: u32,
        position: Vec2,
        color: Color,
        config: &CellConfig,
        tick: u64,
    ) -> Self {
        Self {
            id,
            owner_id,
            position,
            direction: Vec2::ZERO,
            speed: Tier::Lag.speed(config),
            size: Tier::Lag.size(config),
            adaptation_dots: 0,
            is_adapted: false,
            is_original: true,
            color,
            last_collect_tick: tick,
        }
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        if self.is_adapted { Tier::Adapted } else { Tier::Lag }
    }

    /// Switch to the adapted tier. Returns false if the cell already was adapted.
    /// The player's color is kept.
    pub fn promote(&mut self, config: &CellConfig) -> bool {
        if self.is_adapted {
            return false;
        }
        self.is_adapted = true;
        self.size = Tier::Adapted.size(config);
        self.speed = Tier::Adapted.speed(config);
        true
    }

    /// Ticks since the last dot collection.
    #[inline]
    pub fn hunger(&self, current_tick: u64) -> u64 {
        current_tick.saturating_sub(self.last_collect_tick)
    }

    /// Set the heading from an untrusted vector: normalized, zero stays zero,
    /// and anything non-finite is treated as zero.
    pub fn steer(&mut self, vector: Vec2) {
        self.direction = if vector.is_finite() {
            vector.normalize_or_zero()
        } else {
            Vec2::ZERO
        };
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.direction != Vec2::ZERO
    }

    /// Wire representation.
    pub fn view(&self) -> CellView {
        CellView {
            id: self.id,
            player_id: self.owner_id,
            x: self.position.x,
            y: self.position.y,
            size: self.size,
            speed: self.speed,
            color: self.color,
            adaptation_dots: self.adaptation_dots,
            is_adapted: self.is_adapted,
            is_original: self.is_original,
        }
    }
}
