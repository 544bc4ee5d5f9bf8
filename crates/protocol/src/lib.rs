//! Shared protocol crate for the microbial growth server.
//!
//! This crate contains:
//! - Shared types (Color, Phase, DotKind)
//! - JSON message definitions for both directions
//! - Lenient snapshot decoding for rendering clients

mod error;
pub mod packets;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use error::ProtocolError;
pub use packets::{
    CellView, ClientMessage, DotView, HistorySample, MoveIntent, ServerMessage, Snapshot,
};

/// RGB color used for cells. Serialized as a `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` (or `rrggbb`) hex string.
    pub fn from_hex(input: &str) -> Option<Self> {
        let hex = input.strip_prefix('#').unwrap_or(input);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::from_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}'", raw)))
    }
}

/// Growth phase of the whole population, derived from its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lag,
    Exponential,
    Stationary,
    Death,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Lag, Phase::Exponential, Phase::Stationary, Phase::Death];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lag => "lag",
            Phase::Exponential => "exponential",
            Phase::Stationary => "stationary",
            Phase::Death => "death",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a consumable dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotKind {
    /// Triggers fission when collected by an adapted cell.
    #[default]
    Growth,
    /// Counts toward promotion to the adapted tier.
    Adaptation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex() {
        let color = Color::new(0, 255, 153);
        assert_eq!(color.to_string(), "#00ff99");
        assert_eq!(Color::from_hex("#00ff99"), Some(color));
        assert_eq!(Color::from_hex("00FF99"), Some(color));
        assert_eq!(Color::from_hex("#0f9"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_color_serde() {
        let json = serde_json::to_string(&Color::new(153, 0, 255)).unwrap();
        assert_eq!(json, "\"#9900ff\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::new(153, 0, 255));
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
    }

    #[test]
    fn test_phase_names() {
        for phase in Phase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.as_str()));
        }
    }
}
