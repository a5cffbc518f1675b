//! Immutable world snapshots.
//!
//! A [`WorldSnapshot`] is a plain owned value: it shares nothing with the
//! live world it was copied from, so it can be encoded, sent and rendered
//! without holding any lock.

use crate::{BinaryReader, BinaryWriter, Color, PlayerId, ProtocolError};

/// Smallest encoded size of a cell (x, y, r).
const CELL_LEN: usize = 24;
/// Smallest encoded size of a player (id, empty name, color, cell count).
const PLAYER_MIN_LEN: usize = 4 + 1 + 3 + 4;

/// A copied cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSnapshot {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// A copied player with its cell chain, head first.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub cells: Vec<CellSnapshot>,
}

impl PlayerSnapshot {
    /// The head cell, if any.
    pub fn head(&self) -> Option<&CellSnapshot> {
        self.cells.first()
    }
}

/// Axis-aligned rectangle used for viewport framing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Minimal rectangle enclosing every circle, or `None` for no circles.
    pub fn enclosing(cells: impl IntoIterator<Item = (f64, f64, f64)>) -> Option<Self> {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for (x, y, r) in cells {
            let (min_x, min_y, max_x, max_y) = bounds.get_or_insert((x - r, y - r, x + r, y + r));
            *min_x = min_x.min(x - r);
            *min_y = min_y.min(y - r);
            *max_x = max_x.max(x + r);
            *max_y = max_y.max(y + r);
        }
        bounds.map(|(min_x, min_y, max_x, max_y)| Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// Complete copy of the world at the end of a tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    /// Number of ticks simulated before this copy was taken.
    pub tick: u64,
    pub max_x: f64,
    pub max_y: f64,
    pub min_radius: f64,
    /// Active players only, in identifier order.
    pub players: Vec<PlayerSnapshot>,
    pub snacks: Vec<CellSnapshot>,
}

impl WorldSnapshot {
    /// Find a player by identifier.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The full world rectangle.
    pub fn world_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.max_x, self.max_y)
    }

    /// Bounding box of a player's cells, or the whole world when the player
    /// is unknown or has no cells.
    pub fn bounding_box_of(&self, id: PlayerId) -> Rect {
        self.player(id)
            .and_then(|p| Rect::enclosing(p.cells.iter().map(|c| (c.x, c.y, c.r))))
            .unwrap_or_else(|| self.world_rect())
    }

    /// Encode the snapshot body (without opcode).
    pub fn encode(&self, w: &mut BinaryWriter) {
        w.put_u64(self.tick);
        w.put_f64(self.max_x);
        w.put_f64(self.max_y);
        w.put_f64(self.min_radius);

        w.put_u32(self.players.len() as u32);
        for player in &self.players {
            w.put_u32(player.id);
            w.put_string_utf8(&player.name);
            w.put_u8(player.color.r);
            w.put_u8(player.color.g);
            w.put_u8(player.color.b);
            w.put_u32(player.cells.len() as u32);
            for cell in &player.cells {
                encode_cell(w, cell);
            }
        }

        w.put_u32(self.snacks.len() as u32);
        for snack in &self.snacks {
            encode_cell(w, snack);
        }
    }

    /// Decode a snapshot body (without opcode).
    pub fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        let tick = r.get_u64()?;
        let max_x = r.get_f64()?;
        let max_y = r.get_f64()?;
        let min_radius = r.get_f64()?;

        let player_count = r.get_count(PLAYER_MIN_LEN)?;
        let mut players = Vec::with_capacity(player_count);
        for _ in 0..player_count {
            let id = r.get_u32()?;
            let name = r.get_string_utf8()?;
            let color = Color::new(r.get_u8()?, r.get_u8()?, r.get_u8()?);
            let cell_count = r.get_count(CELL_LEN)?;
            let mut cells = Vec::with_capacity(cell_count);
            for _ in 0..cell_count {
                cells.push(decode_cell(r)?);
            }
            players.push(PlayerSnapshot { id, name, color, cells });
        }

        let snack_count = r.get_count(CELL_LEN)?;
        let mut snacks = Vec::with_capacity(snack_count);
        for _ in 0..snack_count {
            snacks.push(decode_cell(r)?);
        }

        Ok(Self {
            tick,
            max_x,
            max_y,
            min_radius,
            players,
            snacks,
        })
    }

    /// Rough encoded size, used to pre-size the write buffer.
    pub fn encoded_len_hint(&self) -> usize {
        let cells: usize = self.players.iter().map(|p| p.cells.len()).sum();
        32 + self.players.len() * (PLAYER_MIN_LEN + 16) + (cells + self.snacks.len()) * CELL_LEN + 8
    }
}

fn encode_cell(w: &mut BinaryWriter, cell: &CellSnapshot) {
    w.put_f64(cell.x);
    w.put_f64(cell.y);
    w.put_f64(cell.r);
}

fn decode_cell(r: &mut BinaryReader) -> Result<CellSnapshot, ProtocolError> {
    Ok(CellSnapshot {
        x: r.get_f64()?,
        y: r.get_f64()?,
        r: r.get_f64()?,
    })
}
