//! Movement and growth.
//!
//! A worm moves by shifting its chain: once it has travelled further than
//! its head radius, a cell is placed one head-radius ahead of the old head.
//! Depending on the growth credit that cell is new (grow), or recycled from
//! the tail (constant length, or shrink when an extra tail cell is dropped).

use crate::entity::{Cell, Player};
use crate::world::{World, WorldBorder};

/// Rules shared by every player's update.
#[derive(Debug, Clone, Copy)]
pub struct MovementRules {
    /// Speed that costs no growth credit.
    pub min_speed: f64,
    /// Cap on chain length; 0 means unlimited.
    pub max_cells: usize,
}

impl MovementRules {
    pub fn from_world(world: &World) -> Self {
        Self {
            min_speed: world.min_speed,
            max_cells: world.max_cells,
        }
    }
}

/// Advance every active player by `delta` seconds.
pub fn move_all(world: &mut World, delta: f64) {
    let rules = MovementRules::from_world(world);
    let border = world.border;
    for player in world.players.iter_mut().filter(|p| p.is_active()) {
        advance(player, delta, &border, &rules);
    }
}

/// Advance one player by `delta` seconds.
///
/// Returns true if the chain shifted.
pub fn advance(player: &mut Player, delta: f64, border: &WorldBorder, rules: &MovementRules) -> bool {
    let Some(head) = player.head().copied() else {
        return false;
    };

    player.distance += player.speed * delta;

    // Boosting burns growth credit in proportion to the excess speed.
    if player.speed > rules.min_speed && rules.min_speed > 0.0 {
        player.grow_amount -= (player.speed / rules.min_speed - 1.0) * delta;
    }

    if player.distance <= head.radius {
        return false;
    }
    player.distance -= head.radius;

    let Some(unit) = player.direction.try_normalize() else {
        return false;
    };
    let target = border.clamp(head.position + unit * head.radius);
    let new_head = Cell::new(target, head.radius);

    let at_cap = rules.max_cells > 0 && player.cells.len() >= rules.max_cells;
    if player.grow_amount >= 1.0 && !at_cap {
        player.cells.push_front(new_head);
        player.grow_amount -= 1.0;
    } else {
        if player.grow_amount <= -1.0 {
            if player.cells.len() > 1 {
                player.cells.pop_back();
            }
            player.grow_amount += 1.0;
        }
        // Recycle the tail as the new head.
        player.cells.pop_back();
        player.cells.push_front(new_head);
    }
    true
}
