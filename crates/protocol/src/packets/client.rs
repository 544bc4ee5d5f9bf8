//! Client -> Server message parsing.

use crate::ProtocolError;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Steer the player's cell.
    Move(MoveIntent),
    /// Ask the server to restart the simulation.
    Restart,
}

/// Movement vector sent by a client. Not trusted to be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveIntent {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl MoveIntent {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The raw vector.
    #[inline]
    pub fn vector(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as a text frame (used by test clients and tools).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
