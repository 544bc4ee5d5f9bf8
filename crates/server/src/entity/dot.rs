//! Resource dots.

use glam::Vec2;
use protocol::{DotKind, DotView};
use rand::Rng;

/// A consumable resource point.
#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    pub id: u32,
    pub position: Vec2,
    /// Collection radius.
    pub radius: f32,
    pub kind: DotKind,
}

impl Dot {
    pub fn new(id: u32, position: Vec2, radius: f32, kind: DotKind) -> Self {
        Self {
            id,
            position,
            radius,
            kind,
        }
    }

    /// Roll a dot kind: adaptation with probability `adaptation_chance`.
    #[inline]
    pub fn roll_kind(rng: &mut impl Rng, adaptation_chance: f64) -> DotKind {
        if rng.random_bool(adaptation_chance) {
            DotKind::Adaptation
        } else {
            DotKind::Growth
        }
    }

    pub fn view(&self) -> DotView {
        DotView {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            kind: self.kind,
        }
    }
}
