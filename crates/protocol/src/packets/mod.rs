//! Packet definitions for the networm protocol.
//!
//! This module contains both client->server and server->client packet types.
//! Each direction is a closed enum; decoding dispatches on the opcode byte.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Opcodes for client -> server packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    /// Join the game with a name and color.
    Join = 0x00,
    /// Set movement direction.
    MovePlayer = 0x10,
    /// Set movement speed.
    BoostPlayer = 0x11,
    /// Free-form text.
    StringMessage = 0x63,
}

/// Opcodes for server -> client packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOpcode {
    /// Handshake reply carrying the assigned player id.
    JoinResponse = 0x01,
    /// Full world snapshot.
    StateSnapshot = 0x10,
    /// Free-form text.
    StringMessage = 0x63,
}
