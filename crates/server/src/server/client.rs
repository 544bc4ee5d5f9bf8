//! Client session state.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client session. The client ID doubles as the player ID.
#[derive(Debug)]
pub struct Client {
    /// Unique client ID.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Last activity timestamp.
    pub last_activity: Instant,
    /// Messages received from this client.
    pub messages: u64,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_activity: now,
            messages: 0,
        }
    }

    /// Record an incoming message.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.messages += 1;
    }

    /// How long the session has been open.
    #[inline]
    pub fn session_length(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
