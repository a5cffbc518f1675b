//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while framing or parsing messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid packet opcode: {0:#04x}")]
    InvalidOpcode(u8),

    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),

    #[error("Frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
