//! Shared protocol crate for networm.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - Length-prefixed framing over any async byte stream
//! - Packet definitions for both directions
//! - The world snapshot value handed to viewers

mod binary;
mod error;
mod frame;
pub mod packets;
pub mod snapshot;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ProtocolError;
pub use frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN};
pub use snapshot::{CellSnapshot, PlayerSnapshot, Rect, WorldSnapshot};

/// Identifier of a player, its index in the world's player list.
pub type PlayerId = u32;

/// RGB color of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
