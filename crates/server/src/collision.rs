//! Collision detection and resolution.
//!
//! Brute force, head-only:
//! - Snack pass: every head against the snacks, at most one snack per head
//!   per tick. Eaten snacks are zeroed during the pass and purged once after it.
//! - Player pass: every head against every cell of every other player.
//!   The toucher is defeated and respawns; its first hit ends its checks.

use crate::entity::Cell;
use crate::world::World;
use glam::DVec2;
use protocol::PlayerId;

/// Result of checking collision between two cells.
#[derive(Debug)]
pub struct CollisionResult {
    /// Combined radius of both cells
    pub r: f64,
    /// Squared distance between centers
    pub squared: f64,
}

impl CollisionResult {
    /// Check if cells are actually overlapping.
    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.squared < self.r * self.r
    }
}

/// Check collision between two circles.
#[inline]
pub fn check_cell_collision(cell_pos: DVec2, cell_radius: f64, check_pos: DVec2, check_radius: f64) -> CollisionResult {
    CollisionResult {
        r: cell_radius + check_radius,
        squared: cell_pos.distance_squared(check_pos),
    }
}

/// Whether two live cells overlap. Consumed cells never collide.
#[inline]
pub fn cells_overlap(a: &Cell, b: &Cell) -> bool {
    if a.is_removed() || b.is_removed() {
        return false;
    }
    check_cell_collision(a.position, a.radius, b.position, b.radius).is_colliding()
}

/// What one collision round changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollisionReport {
    /// Snacks eaten (and purged) this round.
    pub snacks_eaten: usize,
    /// Players defeated this round, in resolution order.
    pub respawned: Vec<PlayerId>,
}

/// Run both passes: snacks first, then player against player.
pub fn resolve(world: &mut World) -> CollisionReport {
    let snacks_eaten = resolve_snacks(world);
    let respawned = resolve_players(world);
    CollisionReport {
        snacks_eaten,
        respawned,
    }
}

/// Each head eats the first snack it overlaps, gaining the snack's radius
/// as growth credit. Returns the number of snacks eaten.
pub fn resolve_snacks(world: &mut World) -> usize {
    let World { players, snacks, .. } = &mut *world;
    let mut eaten = 0;

    for player in players.iter_mut().filter(|p| p.is_active()) {
        let Some(head) = player.head().copied() else {
            continue;
        };
        for snack in snacks.iter_mut() {
            if cells_overlap(&head, snack) {
                player.grow_amount += snack.radius;
                snack.remove();
                eaten += 1;
                break;
            }
        }
    }

    world.purge_snacks();
    eaten
}

/// A head touching any cell of another player defeats the head's owner,
/// regardless of size. Returns the defeated players.
pub fn resolve_players(world: &mut World) -> Vec<PlayerId> {
    let mut defeated = Vec::new();

    for i in 0..world.players.len() {
        if !world.players[i].is_active() {
            continue;
        }
        let Some(head) = world.players[i].head().copied() else {
            continue;
        };

        let hit = world
            .players
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && other.is_active())
            .any(|(_, other)| other.cells().iter().any(|c| cells_overlap(&head, c)));

        if hit {
            let id = world.players[i].id;
            world.respawn(id);
            defeated.push(id);
        }
    }

    defeated
}
