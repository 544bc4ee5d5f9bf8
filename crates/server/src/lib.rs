//! Microbial growth simulation server library.

pub mod config;
pub mod entity;
pub mod history;
pub mod lifecycle;
pub mod phase;
pub mod physics;
pub mod server;
pub mod simulation;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{AppState, Frame, GameState, HealthReport, run};
pub use simulation::{EngineError, Simulation, TickReport};
pub use world::{Arena, SimulationState};
