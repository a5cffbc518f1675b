//! Snapshot broadcaster.
//!
//! Copies the world under a short read lock, encodes the copy once, and fans
//! the frame out on a broadcast channel. Each session drains its own receiver,
//! so a slow peer only lags itself.

use crate::world::World;
use bytes::Bytes;
use protocol::packets::build_state_snapshot;
use protocol::WorldSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, trace, Instrument, Span};

/// Take an isolated copy of the world.
pub async fn capture(world: &RwLock<World>) -> WorldSnapshot {
    world.read().await.snapshot()
}

/// Encode a snapshot as a ready-to-send StateSnapshot payload.
pub fn encode_snapshot(snapshot: &WorldSnapshot) -> Bytes {
    build_state_snapshot(snapshot).finish()
}

pub struct Broadcaster {
    world: Arc<RwLock<World>>,
    tx: broadcast::Sender<Bytes>,
    interval: Duration,
    span: Span,
}

impl Broadcaster {
    pub fn new(world: Arc<RwLock<World>>, tx: broadcast::Sender<Bytes>, interval: Duration, span: Span) -> Self {
        Self {
            world,
            tx,
            interval,
            span,
        }
    }

    /// Capture, encode and publish one snapshot. Returns how many sessions
    /// were subscribed.
    pub async fn broadcast_once(&self) -> usize {
        let snapshot = capture(&self.world).await;
        let frame = encode_snapshot(&snapshot);
        trace!(tick = snapshot.tick, bytes = frame.len(), "snapshot");
        // No subscribers is not an error; nobody is watching yet.
        self.tx.send(frame).unwrap_or(0)
    }

    /// Publish snapshots until shutdown is signalled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let span = self.span.clone();
        async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while !*shutdown.borrow() {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.broadcast_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Broadcaster stopped");
        }
        .instrument(span)
        .await
    }
}
