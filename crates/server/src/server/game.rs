//! Simulation loop.

use crate::collision::{self, CollisionReport};
use crate::config::SnackConfig;
use crate::movement;
use crate::world::World;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn, Instrument, Span};

/// Lifecycle of the simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// What one tick did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub collisions: CollisionReport,
    pub snacks_spawned: usize,
}

/// Run one tick on a locked world: move, collide, replenish.
pub fn step(world: &mut World, delta: f64, snack: &SnackConfig) -> TickReport {
    movement::move_all(world, delta);
    let collisions = collision::resolve(world);
    let snacks_spawned = replenish_snacks(world, snack);
    world.tick += 1;
    TickReport {
        collisions,
        snacks_spawned,
    }
}

/// Top the snack pool up toward its density target, at most
/// `spawn_per_tick` at a time.
pub fn replenish_snacks(world: &mut World, snack: &SnackConfig) -> usize {
    let target = world.snack_target(snack.density);
    let missing = target.saturating_sub(world.snacks().len());
    let count = missing.min(snack.spawn_per_tick);
    for _ in 0..count {
        world.add_random_snack();
    }
    count
}

/// Owns the tick schedule for the shared world.
pub struct GameLoop {
    world: Arc<RwLock<World>>,
    snack: SnackConfig,
    tick_interval: Duration,
    state: LoopState,
    span: Span,
}

impl GameLoop {
    pub fn new(world: Arc<RwLock<World>>, snack: SnackConfig, tick_interval: Duration, span: Span) -> Self {
        Self {
            world,
            snack,
            tick_interval,
            state: LoopState::Running,
            span,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Seed the initial snacks, then tick until shutdown is signalled.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) -> Self {
        let span = self.span.clone();
        async move {
            self.seed().await;
            self.tick_until(shutdown).await;
            self
        }
        .instrument(span)
        .await
    }

    async fn seed(&self) {
        let mut world = self.world.write().await;
        for _ in 0..self.snack.initial_amount {
            world.add_random_snack();
        }
        info!(
            "World initialized: {}x{}, {} snacks",
            world.border.max_x,
            world.border.max_y,
            world.snacks().len()
        );
    }

    async fn tick_until(&mut self, mut shutdown: watch::Receiver<bool>) {
        let start = Instant::now() + self.tick_interval;
        let mut ticker = interval_at(start, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = Instant::now();
        if *shutdown.borrow() {
            self.state = LoopState::Stopped;
        }

        while self.state == LoopState::Running {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.state = LoopState::Stopped;
                    }
                    continue;
                }
            }

            let now = Instant::now();
            let delta = now.duration_since(last).as_secs_f64();
            last = now;

            let report = {
                let mut world = self.world.write().await;
                let report = step(&mut world, delta, &self.snack);
                trace!(tick = world.tick, delta, "tick");
                report
            };

            let tick_ms = now.elapsed().as_secs_f64() * 1000.0;
            let budget = self.tick_interval.as_secs_f64() * 1000.0 * 0.9;
            if tick_ms > budget {
                warn!("Slow tick: {:.3}ms (budget: {:.1}ms)", tick_ms, budget);
            }

            for id in &report.collisions.respawned {
                info!("Player {} collided and respawned", id);
            }
            if report.collisions.snacks_eaten > 0 {
                debug!("{} snacks eaten", report.collisions.snacks_eaten);
            }
        }

        info!("Simulation loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entity::Cell;
    use glam::DVec2;
    use protocol::Color;

    #[test]
    fn test_replenish_respects_target() {
        let mut config = Config::default();
        config.world.width = 10.0;
        config.world.height = 10.0;
        config.snack.density = 0.05;
        config.snack.spawn_per_tick = 3;
        let mut world = World::new(&config);

        assert_eq!(replenish_snacks(&mut world, &config.snack), 3);
        assert_eq!(replenish_snacks(&mut world, &config.snack), 2);
        assert_eq!(replenish_snacks(&mut world, &config.snack), 0);
        assert_eq!(world.snacks().len(), 5);
    }

    #[test]
    fn test_step_eats_snack_and_counts_tick() {
        let config = Config::default();
        let mut world = World::new(&config);
        let id = world.add_player("a", Color::default());
        world.player_mut(id).unwrap().respawn(Cell::new(DVec2::new(40.0, 40.0), 1.0));
        world.add_snack(Cell::new(DVec2::new(40.0, 40.0), 0.5));

        let report = step(&mut world, 0.0, &config.snack);

        assert_eq!(report.collisions.snacks_eaten, 1);
        assert_eq!(world.tick, 1);
        assert!((world.player(id).unwrap().grow_amount - 2.5).abs() < 1e-12);
        assert!(world.snacks().iter().all(|s| s.position != DVec2::new(40.0, 40.0)));
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let config = Config::default();
        let world = Arc::new(RwLock::new(World::new(&config)));
        let (tx, rx) = watch::channel(false);
        let game = GameLoop::new(world.clone(), config.snack.clone(), Duration::from_millis(2), Span::none());
        assert_eq!(game.state(), LoopState::Running);

        let handle = tokio::spawn(game.run(rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send_replace(true);
        let game = handle.await.unwrap();

        assert_eq!(game.state(), LoopState::Stopped);
        let world = world.read().await;
        assert!(world.tick > 0);
        assert!(world.snacks().len() >= config.snack.initial_amount);
    }
}
