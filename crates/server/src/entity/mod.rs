//! Simulation entities.
//!
//! Cells are the organisms owned by players; dots are the resources they
//! collect. Both are plain data: placement lives in `world`, behaviour in
//! `physics` and `lifecycle`.

mod cell;
mod dot;
mod palette;

pub use cell::{Cell, Tier};
pub use dot::Dot;
pub use palette::{ColorPalette, PALETTE};
