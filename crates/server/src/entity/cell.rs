//! Base cell type.

use glam::DVec2;
use protocol::CellSnapshot;

/// A circle in the world: one link of a player's chain, or a snack.
///
/// A radius of exactly 0 marks the cell as consumed; it is purged on the
/// next pass over its collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Center in world coordinates.
    pub position: DVec2,
    /// Radius, never negative.
    pub radius: f64,
}

impl Cell {
    /// Create a new cell. Negative radii are clamped to 0.
    #[inline]
    pub fn new(position: DVec2, radius: f64) -> Self {
        Self {
            position,
            radius: radius.max(0.0),
        }
    }

    /// Whether the cell has been consumed and awaits purging.
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.radius == 0.0
    }

    /// Mark the cell consumed.
    #[inline]
    pub fn remove(&mut self) {
        self.radius = 0.0;
    }

    #[inline]
    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            x: self.position.x,
            y: self.position.y,
            r: self.radius,
        }
    }
}
