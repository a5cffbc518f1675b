//! Player entity: a chain of cells steered by one session.

use super::cell::Cell;
use glam::DVec2;
use protocol::{Color, PlayerId, PlayerSnapshot};
use std::collections::VecDeque;
use std::fmt;

/// A participant's worm.
#[derive(Debug, Clone)]
pub struct Player {
    /// Index in the world's player list.
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    /// Chain of cells, head at the front.
    pub(crate) cells: VecDeque<Cell>,
    /// Steering direction. Only its angle matters; zero means "not moving".
    pub direction: DVec2,
    /// Units per second.
    pub speed: f64,
    /// Growth credit: >= 1 adds a cell on the next shift, <= -1 drops one.
    pub grow_amount: f64,
    /// Distance travelled since the last chain shift.
    pub distance: f64,
    /// False once the owning session has closed.
    pub connected: bool,
}

impl Player {
    /// Create a player with a single seed cell.
    pub fn new(id: PlayerId, name: String, color: Color, seed: Cell, speed: f64, grow_amount: f64) -> Self {
        let mut cells = VecDeque::with_capacity(8);
        cells.push_back(seed);
        Self {
            id,
            name,
            color,
            cells,
            direction: DVec2::ZERO,
            speed,
            grow_amount,
            distance: 0.0,
            connected: true,
        }
    }

    /// The head cell.
    #[inline]
    pub fn head(&self) -> Option<&Cell> {
        self.cells.front()
    }

    /// All cells, head first.
    #[inline]
    pub fn cells(&self) -> &VecDeque<Cell> {
        &self.cells
    }

    /// Whether the player takes part in the simulation.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.connected && !self.cells.is_empty()
    }

    pub fn set_direction(&mut self, dx: f64, dy: f64) {
        self.direction = DVec2::new(dx, dy);
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Replace the whole chain with one cell.
    pub fn respawn(&mut self, seed: Cell) {
        self.cells.clear();
        self.cells.push_back(seed);
    }

    /// Detach from the simulation after the session closed.
    pub fn retire(&mut self) {
        self.connected = false;
        self.cells.clear();
        self.direction = DVec2::ZERO;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            cells: self.cells.iter().map(Cell::snapshot).collect(),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} cells:", self.id, self.name)?;
        for c in &self.cells {
            write!(f, " ({:.2},{:.2},{:.2})", c.position.x, c.position.y, c.radius)?;
        }
        Ok(())
    }
}
