//! Per-player color assignment.

use protocol::Color;
use rand::Rng;
use std::collections::HashMap;

/// Fixed player palette.
pub const PALETTE: [Color; 8] = [
    Color::new(0x00, 0xff, 0xff),
    Color::new(0x00, 0x99, 0xff),
    Color::new(0x00, 0xff, 0x99),
    Color::new(0x99, 0xff, 0x00),
    Color::new(0xff, 0x99, 0x00),
    Color::new(0xff, 0x00, 0x99),
    Color::new(0x99, 0x00, 0xff),
    Color::new(0xff, 0x00, 0xff),
];

/// Hands out palette colors to players.
///
/// A player keeps its color until released. New players get the first color
/// nobody holds; once the palette is exhausted colors are reused at random.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<Color>,
    assigned: HashMap<u32, Color>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new(PALETTE.to_vec())
    }
}

impl ColorPalette {
    /// Create a palette. `colors` must not be empty.
    pub fn new(colors: Vec<Color>) -> Self {
        debug_assert!(!colors.is_empty());
        Self {
            colors,
            assigned: HashMap::new(),
        }
    }

    /// Color for `player`, assigning one if needed.
    pub fn assign(&mut self, player: u32, rng: &mut impl Rng) -> Color {
        if let Some(&color) = self.assigned.get(&player) {
            return color;
        }
        let color = self
            .colors
            .iter()
            .copied()
            .find(|color| !self.assigned.values().any(|taken| taken == color))
            .unwrap_or_else(|| self.colors[rng.random_range(0..self.colors.len())]);
        self.assigned.insert(player, color);
        color
    }

    #[inline]
    pub fn color_of(&self, player: u32) -> Option<Color> {
        self.assigned.get(&player).copied()
    }

    /// Give the player's color back to the pool.
    pub fn release(&mut self, player: u32) -> Option<Color> {
        self.assigned.remove(&player)
    }
}
