//! Game server implementation.
//!
//! Three kinds of task share one world:
//! - the simulation loop, which takes the write lock once per tick,
//! - the broadcaster, which copies the world under the read lock,
//! - one session per connection, which applies intents under the write lock.

use crate::config::Config;
use crate::world::World;
use anyhow::Context;
use bytes::Bytes;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

pub mod broadcaster;
pub mod game;
pub mod session;

pub use broadcaster::{capture, encode_snapshot, Broadcaster};
pub use game::{step, GameLoop, LoopState, TickReport};
pub use session::{run_session, Session, SessionContext, SessionState};

/// Cloneable trigger that stops a running server.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// A bound server, ready to run.
pub struct Server {
    config: Arc<Config>,
    listener: TcpListener,
    world: Arc<RwLock<World>>,
    snapshots: broadcast::Sender<Bytes>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Bind the listener. Fails if the address is unavailable.
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        let world = Arc::new(RwLock::new(World::new(&config)));
        let (snapshots, _) = broadcast::channel(config.server.outbound_queue.max(1));
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            listener,
            world,
            snapshots,
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The shared world, for inspection.
    pub fn world(&self) -> Arc<RwLock<World>> {
        Arc::clone(&self.world)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Run the simulation, broadcaster and accept loop until shutdown.
    pub async fn run(self) -> anyhow::Result<()> {
        let Server {
            config,
            listener,
            world,
            snapshots,
            shutdown,
        } = self;

        let game = GameLoop::new(
            Arc::clone(&world),
            config.snack.clone(),
            config.server.tick_interval(),
            info_span!("sim"),
        );
        let game_task = tokio::spawn(game.run(shutdown.subscribe()));

        let broadcaster = Broadcaster::new(
            Arc::clone(&world),
            snapshots.clone(),
            config.server.broadcast_interval(),
            info_span!("broadcast"),
        );
        let broadcast_task = tokio::spawn(broadcaster.run(shutdown.subscribe()));

        let ctx = SessionContext {
            world: Arc::clone(&world),
            snapshots,
            outbound_queue: config.server.outbound_queue,
            send_timeout: config.server.send_timeout(),
            max_frame_len: config.server.max_frame_len,
            shutdown: shutdown.subscribe(),
        };

        info!("Listening on {}", listener.local_addr()?);

        let mut stop = shutdown.subscribe();
        let mut sessions = JoinSet::new();
        let mut next_session: u64 = 0;

        while !*stop.borrow() {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            continue;
                        }
                    };
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let id = next_session;
                    next_session += 1;
                    info!("New connection from {} (session {})", addr, id);

                    let session = Session::new(id, addr, config.player.clone());
                    let span = info_span!("session", id, peer = %addr);
                    let ctx = ctx.clone();
                    sessions.spawn(
                        async move {
                            if let Err(e) = run_session(stream, session, ctx).await {
                                if is_routine_close(&e) {
                                    debug!("Connection from {} closed: {:#}", addr, e);
                                } else {
                                    info!("Connection error from {}: {:#}", addr, e);
                                }
                            }
                        }
                        .instrument(span),
                    );
                }
                Some(_) = sessions.join_next() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Shutting down");
        drop(listener);
        game_task.await.context("simulation loop panicked")?;
        broadcast_task.await.context("broadcaster panicked")?;
        while sessions.join_next().await.is_some() {}
        info!("Server stopped");
        Ok(())
    }
}

/// Bind and run a server until it is shut down.
pub async fn run(config: Config) -> anyhow::Result<()> {
    Server::bind(config).await?.run().await
}

/// Peer resets, half-written frames and send timeouts end a session without
/// anything being wrong with the server.
fn is_routine_close(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if cause.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        cause.downcast_ref::<std::io::Error>().is_some_and(|e| {
            matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use protocol::ProtocolError;
    use std::io;

    #[test]
    fn test_peer_reset_is_routine() {
        let err = anyhow::Error::from(ProtocolError::Io(io::Error::from(ErrorKind::ConnectionReset))).context("read frame");
        assert!(is_routine_close(&err));

        let err = anyhow::Error::from(io::Error::from(ErrorKind::BrokenPipe));
        assert!(is_routine_close(&err));
    }

    #[tokio::test]
    async fn test_send_timeout_is_routine() {
        let elapsed = tokio::time::timeout(Duration::from_millis(1), std::future::pending::<()>())
            .await
            .context("send timed out")
            .unwrap_err();
        assert!(is_routine_close(&elapsed));
    }

    #[test]
    fn test_protocol_faults_are_not_routine() {
        let err = anyhow::Error::from(ProtocolError::FrameTooLarge { len: 10, max: 5 }).context("read frame");
        assert!(!is_routine_close(&err));

        let err = anyhow::Error::from(io::Error::from(ErrorKind::PermissionDenied));
        assert!(!is_routine_close(&err));
    }
}
