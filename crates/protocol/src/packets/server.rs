//! Server -> Client messages and snapshot views.

use crate::{Color, DotKind, Phase, ProtocolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once after connecting: the id the client's cells are owned by.
    #[serde(rename_all = "camelCase")]
    Welcome { player_id: u32 },
    /// Full snapshot sent once to a new connection.
    GameState(Snapshot),
    /// Snapshot broadcast after every tick.
    GameUpdate(Snapshot),
    /// Number of connected players, broadcast on every join/leave.
    PlayerCount(usize),
    /// Human readable notice (e.g. a rejected restart).
    Notice(String),
}

impl ServerMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Strict decode, for tools and tests.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        if text.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }
        Ok(serde_json::from_str(text)?)
    }
}

/// State of the whole simulation as seen by clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    pub cells: Vec<CellView>,
    pub dots: Vec<DotView>,
    pub phase: Phase,
    pub population_history: Vec<HistorySample>,
}

/// A cell as sent on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellView {
    #[serde(deserialize_with = "or_default")]
    pub id: u32,
    #[serde(deserialize_with = "or_default")]
    pub player_id: u32,
    #[serde(deserialize_with = "or_default")]
    pub x: f32,
    #[serde(deserialize_with = "or_default")]
    pub y: f32,
    #[serde(deserialize_with = "or_default")]
    pub size: f32,
    #[serde(deserialize_with = "or_default")]
    pub speed: f32,
    #[serde(deserialize_with = "or_default")]
    pub color: Color,
    #[serde(deserialize_with = "or_default")]
    pub adaptation_dots: u32,
    #[serde(deserialize_with = "or_default")]
    pub is_adapted: bool,
    #[serde(deserialize_with = "or_default")]
    pub is_original: bool,
}

/// A dot as sent on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DotView {
    #[serde(deserialize_with = "or_default")]
    pub id: u32,
    #[serde(deserialize_with = "or_default")]
    pub x: f32,
    #[serde(deserialize_with = "or_default")]
    pub y: f32,
    #[serde(deserialize_with = "or_default")]
    pub radius: f32,
    #[serde(rename = "type", deserialize_with = "or_default")]
    pub kind: DotKind,
}

/// One point of the population growth curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySample {
    /// Unix time in milliseconds.
    #[serde(deserialize_with = "or_default")]
    pub time: u64,
    #[serde(deserialize_with = "or_default")]
    pub population: usize,
    #[serde(deserialize_with = "or_default")]
    pub phase: Phase,
}

impl Snapshot {
    pub fn population(&self) -> usize {
        self.cells.len()
    }

    /// Decode a snapshot the way a renderer should: never fail.
    ///
    /// Accepts either a bare snapshot object or a `gameState`/`gameUpdate`
    /// envelope. Missing or malformed fields fall back to empty/zero values;
    /// list entries are dropped only when they are not objects.
    pub fn decode_lenient(text: &str) -> Self {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => return Self::default(),
        };
        let body = match (value.get("event"), value.get("data")) {
            (Some(_), Some(data)) => data,
            _ => &value,
        };
        Self::from_value_lenient(body)
    }

    /// Field-by-field lenient conversion from an already parsed value.
    pub fn from_value_lenient(value: &Value) -> Self {
        Self {
            cells: lenient_list(value.get("cells")),
            dots: lenient_list(value.get("dots")),
            phase: value
                .get("phase")
                .and_then(|phase| Phase::deserialize(phase).ok())
                .unwrap_or_default(),
            population_history: lenient_list(value.get("populationHistory")),
        }
    }
}

fn lenient_list<T: DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| T::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Field decoder that turns a malformed value into the field's default.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}
