// Viewer-side game state: own player id and the latest world snapshot
use crate::camera;
use protocol::packets::ServerPacket;
use protocol::{PlayerId, PlayerSnapshot, Rect, WorldSnapshot};
use tracing::{debug, info};

/// Everything a renderer needs, rebuilt from server packets.
#[derive(Debug, Default)]
pub struct GameView {
    player_id: Option<PlayerId>,
    name: Option<String>,
    snapshot: Option<WorldSnapshot>,
}

impl GameView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one server packet into the view. Returns true when the visible
    /// world changed. Snapshots older than the current one are discarded.
    pub fn apply(&mut self, packet: ServerPacket) -> bool {
        match packet {
            ServerPacket::JoinResponse { name, player_id } => {
                self.player_id = Some(player_id);
                self.name = Some(name);
                false
            }
            ServerPacket::StateSnapshot(snapshot) => {
                if let Some(current) = &self.snapshot {
                    if snapshot.tick < current.tick {
                        debug!("Discarding stale snapshot {} (have {})", snapshot.tick, current.tick);
                        return false;
                    }
                }
                self.snapshot = Some(snapshot);
                true
            }
            ServerPacket::StringMessage { text } => {
                info!("Server: {}", text);
                false
            }
        }
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Latest snapshot received, if any.
    pub fn snapshot(&self) -> Option<&WorldSnapshot> {
        self.snapshot.as_ref()
    }

    /// Own player as of the latest snapshot.
    pub fn my_player(&self) -> Option<&PlayerSnapshot> {
        let id = self.player_id?;
        self.snapshot.as_ref()?.player(id)
    }

    /// Bounding box of the own cells, the whole world when not joined.
    /// `None` before the first snapshot.
    pub fn bounding_box(&self) -> Option<Rect> {
        let snapshot = self.snapshot.as_ref()?;
        Some(match self.player_id {
            Some(id) => snapshot.bounding_box_of(id),
            None => snapshot.world_rect(),
        })
    }

    /// Area a renderer should show: the own cells with some margin, or the
    /// whole world while the player is not in the snapshot.
    pub fn viewport(&self, min_width: f64, min_height: f64) -> Option<Rect> {
        let snapshot = self.snapshot.as_ref()?;
        match self.my_player() {
            Some(player) if !player.cells.is_empty() => Some(camera::frame(
                snapshot.bounding_box_of(player.id),
                min_width,
                min_height,
            )),
            _ => Some(snapshot.world_rect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{CellSnapshot, Color};

    fn snapshot(tick: u64, cells: &[(f64, f64)]) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            max_x: 500.0,
            max_y: 500.0,
            min_radius: 1.0,
            players: vec![PlayerSnapshot {
                id: 3,
                name: "me".into(),
                color: Color::new(9, 9, 9),
                cells: cells.iter().map(|&(x, y)| CellSnapshot { x, y, r: 1.0 }).collect(),
            }],
            snacks: vec![],
        }
    }

    #[test]
    fn empty_view_has_nothing() {
        let view = GameView::new();
        assert!(view.player_id().is_none());
        assert!(view.bounding_box().is_none());
        assert!(view.viewport(50.0, 50.0).is_none());
    }

    #[test]
    fn spectator_sees_whole_world() {
        let mut view = GameView::new();
        assert!(view.apply(ServerPacket::StateSnapshot(snapshot(1, &[(10.0, 10.0)]))));
        assert_eq!(view.bounding_box(), Some(Rect::new(0.0, 0.0, 500.0, 500.0)));
        assert_eq!(view.viewport(50.0, 50.0), Some(Rect::new(0.0, 0.0, 500.0, 500.0)));
    }

    #[test]
    fn joined_view_follows_own_cells() {
        let mut view = GameView::new();
        view.apply(ServerPacket::JoinResponse {
            name: "me".into(),
            player_id: 3,
        });
        view.apply(ServerPacket::StateSnapshot(snapshot(1, &[(10.0, 10.0), (12.0, 10.0)])));

        assert_eq!(view.my_player().unwrap().name, "me");
        assert_eq!(view.bounding_box(), Some(Rect::new(9.0, 9.0, 4.0, 2.0)));
        let viewport = view.viewport(50.0, 50.0).unwrap();
        assert!((viewport.width - 50.0).abs() < 1e-9);
        assert!((viewport.x - -14.0).abs() < 1e-9);
    }

    #[test]
    fn stale_snapshots_are_dropped() {
        let mut view = GameView::new();
        assert!(view.apply(ServerPacket::StateSnapshot(snapshot(5, &[(1.0, 1.0)]))));
        assert!(!view.apply(ServerPacket::StateSnapshot(snapshot(4, &[(2.0, 2.0)]))));
        assert_eq!(view.snapshot().unwrap().tick, 5);
        assert!(view.apply(ServerPacket::StateSnapshot(snapshot(5, &[(3.0, 3.0)]))));
    }
}
