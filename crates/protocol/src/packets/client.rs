//! Client -> Server packets.

use super::ClientOpcode;
use crate::{BinaryReader, BinaryWriter, Color, ProtocolError};

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    /// Join (0x00) with display name and color.
    Join { name: String, color: Color },
    /// Movement direction (0x10). Magnitude is ignored.
    MovePlayer { dx: f64, dy: f64 },
    /// Requested speed (0x11).
    BoostPlayer { speed: f64 },
    /// Free-form text (0x63).
    StringMessage { text: String },
}

impl ClientPacket {
    /// Parse a client packet from a frame payload.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = reader.get_u8()?;

        let packet = match opcode {
            0x00 => {
                let name = reader.get_string_utf8()?;
                let color = Color::new(reader.get_u8()?, reader.get_u8()?, reader.get_u8()?);
                ClientPacket::Join { name, color }
            }
            0x10 => ClientPacket::MovePlayer {
                dx: reader.get_f64()?,
                dy: reader.get_f64()?,
            },
            0x11 => ClientPacket::BoostPlayer {
                speed: reader.get_f64()?,
            },
            0x63 => ClientPacket::StringMessage {
                text: reader.get_string_utf8()?,
            },
            _ => return Err(ProtocolError::InvalidOpcode(opcode)),
        };

        reader.finish()?;
        Ok(packet)
    }

    /// The opcode this packet is sent with.
    pub fn opcode(&self) -> ClientOpcode {
        match self {
            ClientPacket::Join { .. } => ClientOpcode::Join,
            ClientPacket::MovePlayer { .. } => ClientOpcode::MovePlayer,
            ClientPacket::BoostPlayer { .. } => ClientOpcode::BoostPlayer,
            ClientPacket::StringMessage { .. } => ClientOpcode::StringMessage,
        }
    }

    /// Build the frame payload for this packet.
    pub fn build(&self) -> BinaryWriter {
        let mut w = BinaryWriter::with_capacity(32);
        w.put_u8(self.opcode() as u8);
        match self {
            ClientPacket::Join { name, color } => {
                w.put_string_utf8(name);
                w.put_u8(color.r);
                w.put_u8(color.g);
                w.put_u8(color.b);
            }
            ClientPacket::MovePlayer { dx, dy } => {
                w.put_f64(*dx);
                w.put_f64(*dy);
            }
            ClientPacket::BoostPlayer { speed } => w.put_f64(*speed),
            ClientPacket::StringMessage { text } => w.put_string_utf8(text),
        }
        w
    }
}
