//! Per-cell lifecycle: movement, dot collection, promotion, fission and
//! starvation.

use crate::config::CellConfig;
use crate::entity::{Cell, Dot};
use crate::physics;
use crate::world::Arena;
use glam::Vec2;
use protocol::DotKind;
use rand::Rng;
use std::f32::consts::TAU;

/// What a collected dot did to the collecting cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEffect {
    /// Only the starvation clock was refreshed.
    Fed,
    /// Adaptation counter went up without a promotion.
    Counted,
    /// The cell reached the threshold and switched to the adapted tier.
    Promoted,
    /// A growth dot reached an adapted cell; the caller spawns a child.
    Replicate,
}

/// Advance the cell along its heading and keep it inside the arena.
pub fn integrate(cell: &mut Cell, arena: &Arena) {
    if cell.is_moving() {
        cell.position += cell.direction * cell.speed;
    }
    physics::contain(cell, arena);
}

/// Remove and return the first dot (scanning from the back) the cell overlaps.
/// At most one dot per call.
pub fn collect(cell: &Cell, dots: &mut Vec<Dot>) -> Option<Dot> {
    let index = dots
        .iter()
        .rposition(|dot| cell.position.distance(dot.position) < cell.size + dot.radius)?;
    Some(dots.remove(index))
}

/// Apply a collected dot of `kind` to the cell.
pub fn apply_collection(
    cell: &mut Cell,
    kind: DotKind,
    tick: u64,
    config: &CellConfig,
) -> CollectionEffect {
    cell.last_collect_tick = tick;

    match kind {
        DotKind::Adaptation => {
            cell.adaptation_dots = cell.adaptation_dots.saturating_add(1);
            if cell.adaptation_dots >= config.adaptation_threshold && cell.promote(config) {
                CollectionEffect::Promoted
            } else {
                CollectionEffect::Counted
            }
        }
        DotKind::Growth if cell.is_adapted => CollectionEffect::Replicate,
        DotKind::Growth => CollectionEffect::Fed,
    }
}

/// Build the child of a fission. The child sits two radii away from the parent
/// at a random angle, heads the same way with a little jitter, and is already
/// adapted.
pub fn replicate(
    parent: &Cell,
    id: u32,
    tick: u64,
    config: &CellConfig,
    arena: &Arena,
    rng: &mut impl Rng,
) -> Cell {
    let heading = Vec2::from_angle(rng.random_range(0.0..TAU));
    let jitter = Vec2::new(
        (rng.random::<f32>() - 0.5) * config.fission_jitter,
        (rng.random::<f32>() - 0.5) * config.fission_jitter,
    );

    let mut child = Cell::new(
        id,
        parent.owner_id,
        parent.position + heading * (parent.size * 2.0),
        parent.color,
        config,
        tick,
    );
    child.promote(config);
    child.is_original = false;
    child.direction = (heading + jitter).normalize_or_zero();
    physics::contain(&mut child, arena);
    child
}

/// Whether the cell went longer than `limit` ticks without collecting.
#[inline]
pub fn starved(cell: &Cell, tick: u64, limit: u64) -> bool {
    cell.hunger(tick) > limit
}

/// Remove starved cells. Returns their IDs.
pub fn cull_starved(cells: &mut Vec<Cell>, tick: u64, limit: u64) -> Vec<u32> {
    let mut removed = Vec::new();
    cells.retain(|cell| {
        if starved(cell, tick, limit) {
            removed.push(cell.id);
            false
        } else {
            true
        }
    });
    removed
}
