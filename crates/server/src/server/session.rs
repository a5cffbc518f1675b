//! Per-connection session.
//!
//! The read side decodes intents and applies them to the world under its
//! write lock. Everything sent to the peer (handshake replies and broadcast
//! snapshots) goes through one writer task, so frames never interleave.

use crate::config::PlayerConfig;
use crate::world::World;
use anyhow::Context;
use bytes::Bytes;
use protocol::packets::{build_join_response, ClientPacket};
use protocol::{read_frame, write_frame, Color, PlayerId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::{debug, info, trace, warn, Instrument, Span};

const UNNAMED: &str = "An unnamed worm";

/// Protocol state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no player yet. Intents are ignored.
    Unjoined,
    /// Handshake done; intents steer this player.
    Joined(PlayerId),
    /// Terminal.
    Closed,
}

/// A connected participant.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub addr: SocketAddr,
    state: SessionState,
    name: String,
    rules: PlayerConfig,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr, rules: PlayerConfig) -> Self {
        Self {
            id,
            addr,
            state: SessionState::Unjoined,
            name: String::new(),
            rules,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Apply one packet to the world. Returns the frame to send back, if any.
    pub fn handle_packet(&mut self, world: &mut World, packet: ClientPacket) -> Option<Bytes> {
        match packet {
            ClientPacket::Join { name, color } => self.handle_join(world, name, color),
            ClientPacket::MovePlayer { dx, dy } => {
                match self.state {
                    SessionState::Joined(id) => world.set_direction(id, dx, dy),
                    _ => trace!("Ignoring move from unjoined session"),
                }
                None
            }
            ClientPacket::BoostPlayer { speed } => {
                match self.state {
                    SessionState::Joined(id) if self.rules.accepts_speed(speed) => world.set_speed(id, speed),
                    SessionState::Joined(_) => trace!("Discarding out-of-range speed {}", speed),
                    _ => trace!("Ignoring boost from unjoined session"),
                }
                None
            }
            ClientPacket::StringMessage { text } => {
                debug!("Session {} says {:?}", self.id, text);
                None
            }
        }
    }

    fn handle_join(&mut self, world: &mut World, name: String, color: Color) -> Option<Bytes> {
        match self.state {
            SessionState::Joined(id) => {
                warn!("Session {} sent a second join; keeping player {}", self.id, id);
                Some(build_join_response(&self.name, id).finish())
            }
            SessionState::Closed => {
                debug!("Ignoring join on closed session {}", self.id);
                None
            }
            SessionState::Unjoined => {
                let name = sanitize_name(&name, self.rules.max_name_length);
                let id = world.add_player(name.clone(), color);
                info!("Session {} joined as '{}' (player {})", self.id, name, id);
                debug!("{}", world);
                self.name = name;
                self.state = SessionState::Joined(id);
                Some(build_join_response(&self.name, id).finish())
            }
        }
    }

    /// Enter the terminal state, retiring the player if there was one.
    pub fn close(&mut self, world: &mut World) {
        if let SessionState::Joined(id) = self.state {
            world.retire_player(id);
            info!("Player {} ('{}') left", id, self.name);
        }
        self.state = SessionState::Closed;
    }
}

/// Truncate to `max_len` characters; blank names get a placeholder.
fn sanitize_name(name: &str, max_len: usize) -> String {
    let name: String = name.trim().chars().take(max_len).collect();
    if name.is_empty() {
        UNNAMED.to_string()
    } else {
        name
    }
}

/// Shared handles a session task needs.
#[derive(Clone)]
pub struct SessionContext {
    pub world: Arc<RwLock<World>>,
    pub snapshots: broadcast::Sender<Bytes>,
    pub outbound_queue: usize,
    pub send_timeout: Duration,
    pub max_frame_len: usize,
    pub shutdown: watch::Receiver<bool>,
}

/// Drive one connection until the peer leaves or a transport error occurs.
pub async fn run_session(stream: TcpStream, mut session: Session, ctx: SessionContext) -> anyhow::Result<()> {
    let (mut reader, writer) = stream.into_split();
    let (reply_tx, reply_rx) = mpsc::channel::<Bytes>(ctx.outbound_queue.max(1));
    let snapshot_rx = ctx.snapshots.subscribe();
    let mut shutdown = ctx.shutdown.clone();

    let mut writer_task = tokio::spawn(
        write_loop(writer, reply_rx, snapshot_rx, ctx.send_timeout).instrument(Span::current()),
    );

    let result = loop {
        tokio::select! {
            written = &mut writer_task => {
                break match written {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(e.into()),
                };
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Closing session {} for shutdown", session.id);
                    break Ok(());
                }
            }
            frame = read_frame(&mut reader, ctx.max_frame_len) => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        info!("Session {} ({}) disconnected", session.id, session.addr);
                        break Ok(());
                    }
                    Err(e) => break Err(e).context("read frame"),
                };

                let packet = match ClientPacket::parse(&data) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Dropping packet from {}: {}", session.addr, e);
                        continue;
                    }
                };

                let reply = {
                    let mut world = ctx.world.write().await;
                    session.handle_packet(&mut world, packet)
                };
                if let Some(reply) = reply {
                    if reply_tx.send(reply).await.is_err() {
                        break Ok(());
                    }
                }
            }
        }
    };

    {
        let mut world = ctx.world.write().await;
        session.close(&mut world);
    }
    drop(reply_tx);
    writer_task.abort();

    result
}

/// The only writer of a session's socket.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut replies: mpsc::Receiver<Bytes>,
    mut snapshots: broadcast::Receiver<Bytes>,
    send_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let frame = tokio::select! {
            biased;
            reply = replies.recv() => match reply {
                Some(frame) => frame,
                None => return Ok(()),
            },
            snapshot = snapshots.recv() => match snapshot {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Slow peer, skipped {} snapshots", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        };

        tokio::time::timeout(send_timeout, write_frame(&mut writer, &frame))
            .await
            .context("send timed out")??;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use protocol::packets::ServerPacket;

    fn setup() -> (World, Session) {
        let config = Config::default();
        let world = World::new(&config);
        let session = Session::new(1, "127.0.0.1:9".parse().unwrap(), config.player);
        (world, session)
    }

    fn join(world: &mut World, session: &mut Session, name: &str) -> ServerPacket {
        let reply = session
            .handle_packet(
                world,
                ClientPacket::Join {
                    name: name.into(),
                    color: Color::new(200, 10, 10),
                },
            )
            .unwrap();
        ServerPacket::parse(&reply).unwrap()
    }

    #[test]
    fn test_join_assigns_id() {
        let (mut world, mut session) = setup();
        let reply = join(&mut world, &mut session, "worm");
        assert_eq!(
            reply,
            ServerPacket::JoinResponse {
                name: "worm".into(),
                player_id: 0
            }
        );
        assert_eq!(session.state(), SessionState::Joined(0));
        assert_eq!(world.player(0).unwrap().color, Color::new(200, 10, 10));
    }

    #[test]
    fn test_second_join_keeps_player() {
        let (mut world, mut session) = setup();
        join(&mut world, &mut session, "worm");
        let reply = join(&mut world, &mut session, "other");
        assert_eq!(
            reply,
            ServerPacket::JoinResponse {
                name: "worm".into(),
                player_id: 0
            }
        );
        assert_eq!(world.players().len(), 1);
    }

    #[test]
    fn test_intents_ignored_before_join() {
        let (mut world, mut session) = setup();
        let other = world.add_player("other", Color::default());
        assert!(session.handle_packet(&mut world, ClientPacket::MovePlayer { dx: 1.0, dy: 1.0 }).is_none());
        assert!(session.handle_packet(&mut world, ClientPacket::BoostPlayer { speed: 15.0 }).is_none());
        let p = world.player(other).unwrap();
        assert_eq!(p.direction, glam::DVec2::ZERO);
        assert_eq!(p.speed, 10.0);
    }

    #[test]
    fn test_move_sets_direction() {
        let (mut world, mut session) = setup();
        join(&mut world, &mut session, "worm");
        session.handle_packet(&mut world, ClientPacket::MovePlayer { dx: 3.0, dy: -4.0 });
        assert_eq!(world.player(0).unwrap().direction, glam::DVec2::new(3.0, -4.0));
    }

    #[test]
    fn test_boost_range_checked() {
        let (mut world, mut session) = setup();
        join(&mut world, &mut session, "worm");

        for speed in [9.9, 20.5, -10.0, f64::NAN, f64::INFINITY, 0.0] {
            session.handle_packet(&mut world, ClientPacket::BoostPlayer { speed });
            assert_eq!(world.player(0).unwrap().speed, 10.0);
        }

        session.handle_packet(&mut world, ClientPacket::BoostPlayer { speed: 20.0 });
        assert_eq!(world.player(0).unwrap().speed, 20.0);
        session.handle_packet(&mut world, ClientPacket::BoostPlayer { speed: 10.0 });
        assert_eq!(world.player(0).unwrap().speed, 10.0);
    }

    #[test]
    fn test_string_message_has_no_effect() {
        let (mut world, mut session) = setup();
        assert!(
            session
                .handle_packet(&mut world, ClientPacket::StringMessage { text: "hi".into() })
                .is_none()
        );
        assert_eq!(session.state(), SessionState::Unjoined);
    }

    #[test]
    fn test_close_retires_player() {
        let (mut world, mut session) = setup();
        join(&mut world, &mut session, "worm");
        session.close(&mut world);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!world.player(0).unwrap().is_active());
        assert_eq!(world.add_player("next", Color::default()), 1);
    }

    #[test]
    fn test_join_after_close_is_ignored() {
        let (mut world, mut session) = setup();
        session.close(&mut world);
        let reply = session.handle_packet(
            &mut world,
            ClientPacket::Join {
                name: "ghost".into(),
                color: Color::default(),
            },
        );
        assert!(reply.is_none());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(world.players().is_empty());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  ", 10), UNNAMED);
        assert_eq!(sanitize_name("abcdef", 3), "abc");
        assert_eq!(sanitize_name("wörm", 10), "wörm");
    }
}
