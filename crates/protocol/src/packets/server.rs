//! Server -> Client packets.

use super::ServerOpcode;
use crate::{BinaryReader, BinaryWriter, PlayerId, ProtocolError, WorldSnapshot};

/// Parsed server packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    /// Join accepted (0x01).
    JoinResponse { name: String, player_id: PlayerId },
    /// World snapshot (0x10).
    StateSnapshot(WorldSnapshot),
    /// Free-form text (0x63).
    StringMessage { text: String },
}

impl ServerPacket {
    /// Parse a server packet from a frame payload.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = reader.get_u8()?;

        let packet = match opcode {
            0x01 => ServerPacket::JoinResponse {
                name: reader.get_string_utf8()?,
                player_id: reader.get_u32()?,
            },
            0x10 => ServerPacket::StateSnapshot(WorldSnapshot::decode(&mut reader)?),
            0x63 => ServerPacket::StringMessage {
                text: reader.get_string_utf8()?,
            },
            _ => return Err(ProtocolError::InvalidOpcode(opcode)),
        };

        reader.finish()?;
        Ok(packet)
    }
}

/// Build a JoinResponse packet (0x01).
pub fn build_join_response(name: &str, player_id: PlayerId) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(6 + name.len());
    w.put_u8(ServerOpcode::JoinResponse as u8);
    w.put_string_utf8(name);
    w.put_u32(player_id);
    w
}

/// Build a StateSnapshot packet (0x10).
pub fn build_state_snapshot(snapshot: &WorldSnapshot) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(1 + snapshot.encoded_len_hint());
    w.put_u8(ServerOpcode::StateSnapshot as u8);
    snapshot.encode(&mut w);
    w
}

/// Build a StringMessage packet (0x63).
pub fn build_string_message(text: &str) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(2 + text.len());
    w.put_u8(ServerOpcode::StringMessage as u8);
    w.put_string_utf8(text);
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_response() {
        let w = build_join_response("worm", 4);
        assert_eq!(
            ServerPacket::parse(w.as_slice()).unwrap(),
            ServerPacket::JoinResponse {
                name: "worm".into(),
                player_id: 4
            }
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = WorldSnapshot {
            max_x: 10.0,
            max_y: 20.0,
            ..Default::default()
        };
        let w = build_state_snapshot(&snap);
        assert_eq!(w.as_slice()[0], 0x10);
        assert_eq!(ServerPacket::parse(w.as_slice()).unwrap(), ServerPacket::StateSnapshot(snap));
    }

    #[test]
    fn test_unknown_opcode() {
        assert!(matches!(
            ServerPacket::parse(&[0x77]),
            Err(ProtocolError::InvalidOpcode(0x77))
        ));
    }
}
