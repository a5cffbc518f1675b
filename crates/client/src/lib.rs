//! Viewer-side networm client.
//!
//! Connects to a server, performs the join handshake, sends the two
//! intents (direction and speed) and keeps the latest snapshot around as the
//! read-only input for a renderer. Rendering itself lives elsewhere.

// Module structure - each module handles a specific concern
mod camera; // Viewport framing
mod game; // Latest snapshot and own player
mod network; // TCP connection, packet handling

pub use camera::frame;
pub use game::GameView;
pub use network::{Connection, PacketReader, PacketWriter};
