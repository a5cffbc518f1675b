//! Networm bot - headless client that wanders around the world.
//!
//! Connects to `NETWORM_ADDR` (default `127.0.0.1:1340`), joins with a random
//! color and steers toward the nearest snack it can see, with a random turn
//! now and then.

use client::{Connection, GameView};
use futures_util::StreamExt;
use protocol::{Color, WorldSnapshot};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:1340";
const STEER_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("NETWORM_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let (name, color) = {
        let mut rng = rand::rng();
        let name = format!("bot-{:04}", rng.random_range(0..10_000));
        (name, Color::new(rng.random(), rng.random(), rng.random()))
    };

    let mut conn = Connection::connect(addr.as_str()).await?;
    let player_id = conn.join(&name, color).await?;
    info!("{} joined {} as player {}", name, addr, player_id);

    let mut view = GameView::new();
    view.apply(protocol::packets::ServerPacket::JoinResponse {
        name: name.clone(),
        player_id,
    });

    let (reader, mut writer) = conn.split();
    let packets = reader.into_stream();
    tokio::pin!(packets);
    let mut steer = tokio::time::interval(STEER_INTERVAL);

    loop {
        tokio::select! {
            packet = packets.next() => match packet {
                Some(packet) => {
                    view.apply(packet?);
                }
                None => {
                    info!("Server closed the connection");
                    return Ok(());
                }
            },
            _ = steer.tick() => {
                let Some(snapshot) = view.snapshot() else {
                    continue;
                };
                let (dx, dy, boost) = choose_heading(snapshot, &view);
                writer.set_direction(dx, dy).await?;
                writer.set_speed(boost).await?;
                if let Some(me) = view.my_player() {
                    debug!(tick = snapshot.tick, cells = me.cells.len(), "steering");
                }
            }
        }
    }
}

/// Head for the nearest snack, or pick a random direction if none is visible.
fn choose_heading(snapshot: &WorldSnapshot, view: &GameView) -> (f64, f64, f64) {
    let mut rng = rand::rng();
    let min_speed = 10.0;
    let boost = if rng.random_bool(0.1) { min_speed * 1.5 } else { min_speed };

    let head = view.my_player().and_then(|p| p.head().copied());
    let nearest = head.and_then(|head| {
        snapshot
            .snacks
            .iter()
            .map(|s| (s.x - head.x, s.y - head.y))
            .min_by(|a, b| (a.0 * a.0 + a.1 * a.1).total_cmp(&(b.0 * b.0 + b.1 * b.1)))
    });

    match nearest {
        Some((dx, dy)) if !rng.random_bool(0.05) => (dx, dy, boost),
        _ => {
            let angle = rng.random_range(0.0..std::f64::consts::TAU);
            (angle.cos(), angle.sin(), boost)
        }
    }
}
