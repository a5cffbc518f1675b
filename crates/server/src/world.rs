//! World state management.
//!
//! Owns every player and snack. Mutators keep the cross-entity invariants
//! (ids never reused, snacks purged only between passes); the caller provides
//! mutual exclusion by holding the world behind one lock.

use crate::config::Config;
use crate::entity::{Cell, Player};
use glam::DVec2;
use protocol::{Color, PlayerId, Rect, WorldSnapshot};
use rand::Rng;
use std::fmt;

/// World border bounds: `[0, max_x] x [0, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBorder {
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldBorder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            max_x: width.max(0.0),
            max_y: height.max(0.0),
        }
    }

    /// Get a uniformly random position within the border.
    #[inline]
    pub fn random_position(&self) -> DVec2 {
        let mut rng = rand::rng();
        DVec2::new(rng.random::<f64>() * self.max_x, rng.random::<f64>() * self.max_y)
    }

    /// Clamp a position onto the border.
    #[inline]
    pub fn clamp(&self, position: DVec2) -> DVec2 {
        DVec2::new(position.x.clamp(0.0, self.max_x), position.y.clamp(0.0, self.max_y))
    }

    #[inline]
    pub fn contains(&self, position: DVec2) -> bool {
        (0.0..=self.max_x).contains(&position.x) && (0.0..=self.max_y).contains(&position.y)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.max_x * self.max_y
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.max_x, self.max_y)
    }
}

/// The game world containing all players and snacks.
#[derive(Debug)]
pub struct World {
    pub border: WorldBorder,
    /// Radius of every freshly (re)spawned player cell.
    pub min_radius: f64,
    /// Cap on cells per player; 0 means unlimited.
    pub max_cells: usize,
    /// Speed below which movement is free; new players start at it.
    pub min_speed: f64,
    initial_grow: f64,
    snack_radius: (f64, f64),

    /// Players by id. Entries are never removed.
    pub(crate) players: Vec<Player>,
    /// Free-floating snacks.
    pub(crate) snacks: Vec<Cell>,

    /// Ticks simulated so far.
    pub tick: u64,
}

impl World {
    /// Create an empty world from configuration.
    pub fn new(config: &Config) -> Self {
        let (lo, hi) = (config.snack.min_radius, config.snack.max_radius);
        Self {
            border: WorldBorder::new(config.world.width, config.world.height),
            min_radius: config.world.min_radius,
            max_cells: config.world.max_cells,
            min_speed: config.player.min_speed,
            initial_grow: config.player.initial_grow,
            snack_radius: (lo.min(hi), lo.max(hi)),
            players: Vec::with_capacity(16),
            snacks: Vec::with_capacity(1024),
            tick: 0,
        }
    }

    /// Get a random position within the border.
    #[inline]
    pub fn random_position(&self) -> DVec2 {
        self.border.random_position()
    }

    /// Add a player with one minimum-radius cell at a random position.
    /// Returns the next sequential identifier.
    pub fn add_player(&mut self, name: impl Into<String>, color: Color) -> PlayerId {
        let id = self.players.len() as PlayerId;
        let seed = Cell::new(self.random_position(), self.min_radius);
        self.players.push(Player::new(
            id,
            name.into(),
            color,
            seed,
            self.min_speed,
            self.initial_grow,
        ));
        id
    }

    /// Get a player by id.
    #[inline]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// Get a mutable player by id.
    #[inline]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    /// All players ever joined, including retired ones.
    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[inline]
    pub fn snacks(&self) -> &[Cell] {
        &self.snacks
    }

    /// Set a player's direction. Unknown ids are ignored.
    pub fn set_direction(&mut self, id: PlayerId, dx: f64, dy: f64) {
        if let Some(player) = self.player_mut(id) {
            player.set_direction(dx, dy);
        }
    }

    /// Set a player's speed. Unknown ids are ignored; range checks belong to
    /// the caller.
    pub fn set_speed(&mut self, id: PlayerId, speed: f64) {
        if let Some(player) = self.player_mut(id) {
            player.set_speed(speed);
        }
    }

    /// Replace a player's chain with one minimum-radius cell at a random
    /// position.
    pub fn respawn(&mut self, id: PlayerId) {
        let seed = Cell::new(self.random_position(), self.min_radius);
        if let Some(player) = self.player_mut(id) {
            player.respawn(seed);
        }
    }

    /// Take a player out of the simulation. Its id stays reserved.
    pub fn retire_player(&mut self, id: PlayerId) {
        if let Some(player) = self.player_mut(id) {
            player.retire();
        }
    }

    /// Insert one snack at a random position with a random radius.
    pub fn add_random_snack(&mut self) {
        let (lo, hi) = self.snack_radius;
        let radius = if hi > lo {
            rand::rng().random_range(lo..hi)
        } else {
            lo
        };
        let position = self.random_position();
        self.add_snack(Cell::new(position, radius));
    }

    /// Insert a snack. Zero-radius snacks are never stored.
    pub fn add_snack(&mut self, snack: Cell) {
        if !snack.is_removed() {
            self.snacks.push(snack);
        }
    }

    /// Number of snacks the world tries to keep alive at `density`.
    #[inline]
    pub fn snack_target(&self, density: f64) -> usize {
        (self.border.area() * density).max(0.0) as usize
    }

    /// Drop every consumed snack. Runs between collision passes, never
    /// during one.
    pub fn purge_snacks(&mut self) -> usize {
        let before = self.snacks.len();
        self.snacks.retain(|s| !s.is_removed());
        before - self.snacks.len()
    }

    /// Minimal rectangle around a player's cells, or the whole world when
    /// the player is unknown or has no cells.
    pub fn bounding_box_of(&self, id: PlayerId) -> Rect {
        self.player(id)
            .and_then(|p| {
                Rect::enclosing(
                    p.cells()
                        .iter()
                        .map(|c| (c.position.x, c.position.y, c.radius)),
                )
            })
            .unwrap_or_else(|| self.border.rect())
    }

    /// Copy the world into an independent value. Retired players are left
    /// out.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            max_x: self.border.max_x,
            max_y: self.border.max_y,
            min_radius: self.min_radius,
            players: self
                .players
                .iter()
                .filter(|p| p.is_active())
                .map(Player::snapshot)
                .collect(),
            snacks: self.snacks.iter().map(Cell::snapshot).collect(),
        }
    }

    /// Count of players still taking part.
    pub fn active_players(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "world {}x{} tick {} snacks {}", self.border.max_x, self.border.max_y, self.tick, self.snacks.len())?;
        for player in self.players.iter().filter(|p| p.is_active()) {
            writeln!(f, "  {}", player)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(&Config::default())
    }

    #[test]
    fn test_sequential_ids() {
        let mut world = world();
        assert_eq!(world.add_player("a", Color::default()), 0);
        assert_eq!(world.add_player("b", Color::default()), 1);
        world.retire_player(0);
        assert_eq!(world.add_player("c", Color::default()), 2);
    }

    #[test]
    fn test_new_player_seed() {
        let mut world = world();
        let id = world.add_player("a", Color::new(1, 2, 3));
        let player = world.player(id).unwrap();
        assert_eq!(player.cells().len(), 1);
        let head = player.head().unwrap();
        assert_eq!(head.radius, world.min_radius);
        assert!(world.border.contains(head.position));
        assert_eq!(player.speed, world.min_speed);
        assert_eq!(player.grow_amount, 2.0);
    }

    #[test]
    fn test_unknown_player_ignored() {
        let mut world = world();
        world.set_direction(7, 1.0, 0.0);
        world.set_speed(7, 15.0);
        world.respawn(7);
        world.retire_player(7);
        assert!(world.players().is_empty());
    }

    #[test]
    fn test_random_snack_radius() {
        let mut world = world();
        for _ in 0..200 {
            world.add_random_snack();
        }
        assert_eq!(world.snacks().len(), 200);
        for snack in world.snacks() {
            assert!(snack.radius >= 0.1 && snack.radius < 1.0);
            assert!(world.border.contains(snack.position));
        }
    }

    #[test]
    fn test_purge_snacks() {
        let mut world = world();
        world.add_snack(Cell::new(DVec2::new(1.0, 1.0), 0.5));
        world.add_snack(Cell::new(DVec2::new(2.0, 2.0), 0.5));
        world.snacks[0].remove();
        assert_eq!(world.purge_snacks(), 1);
        assert_eq!(world.snacks().len(), 1);
        assert_eq!(world.snacks()[0].position, DVec2::new(2.0, 2.0));
    }

    #[test]
    fn test_bounding_box() {
        let mut world = world();
        let id = world.add_player("a", Color::default());
        {
            let player = world.player_mut(id).unwrap();
            player.respawn(Cell::new(DVec2::new(10.0, 20.0), 1.0));
            player.cells.push_back(Cell::new(DVec2::new(14.0, 20.0), 1.0));
        }
        assert_eq!(world.bounding_box_of(id), Rect::new(9.0, 19.0, 6.0, 2.0));
        world.retire_player(id);
        assert_eq!(world.bounding_box_of(id), Rect::new(0.0, 0.0, 500.0, 500.0));
        assert_eq!(world.bounding_box_of(99), Rect::new(0.0, 0.0, 500.0, 500.0));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut world = world();
        let id = world.add_player("a", Color::default());
        world.add_snack(Cell::new(DVec2::new(3.0, 3.0), 0.5));
        let snap = world.snapshot();

        world.respawn(id);
        world.snacks[0].remove();
        world.purge_snacks();

        assert_eq!(snap.players.len(), 1);
        assert_eq!(snap.snacks.len(), 1);
        assert_eq!(snap.snacks[0].r, 0.5);
    }

    #[test]
    fn test_snapshot_skips_retired() {
        let mut world = world();
        world.add_player("a", Color::default());
        let b = world.add_player("b", Color::default());
        world.retire_player(0);
        let snap = world.snapshot();
        assert_eq!(snap.players.len(), 1);
        assert_eq!(snap.players[0].id, b);
    }
}
