//! Game entities.
//!
//! Players are chains of cells; snacks are bare cells owned by the world.

mod cell;
mod player;

pub use cell::Cell;
pub use player::Player;
