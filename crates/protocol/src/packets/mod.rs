//! Message definitions for the game protocol.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`, mirroring the event names the
//! browser client already listens for.

mod client;
mod server;

pub use client::*;
pub use server::*;
