// TCP connection and binary protocol handling
use anyhow::{bail, Context};
use futures_util::stream::{self, Stream};
use protocol::packets::{ClientPacket, ServerPacket};
use protocol::{read_frame, write_frame, Color, PlayerId, DEFAULT_MAX_FRAME_LEN};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace, warn};

/// A connection to a networm server.
pub struct Connection {
    reader: PacketReader,
    writer: PacketWriter,
}

impl Connection {
    pub async fn connect(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("failed to connect")?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}", stream.peer_addr()?);
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: PacketReader {
                inner: read,
                max_frame_len: DEFAULT_MAX_FRAME_LEN,
            },
            writer: PacketWriter { inner: write },
        })
    }

    /// Send a join request and wait for the server's answer. Packets that
    /// arrive before the JoinResponse are dropped.
    pub async fn join(&mut self, name: &str, color: Color) -> anyhow::Result<PlayerId> {
        self.writer
            .send(&ClientPacket::Join {
                name: name.to_string(),
                color,
            })
            .await?;

        loop {
            match self.reader.recv().await? {
                Some(ServerPacket::JoinResponse { name, player_id }) => {
                    debug!("Joined as '{}' (player {})", name, player_id);
                    return Ok(player_id);
                }
                Some(other) => trace!("Skipping {:?} while waiting for join", other),
                None => bail!("server closed the connection before answering the join"),
            }
        }
    }

    pub async fn send(&mut self, packet: &ClientPacket) -> anyhow::Result<()> {
        self.writer.send(packet).await
    }

    /// Send an arbitrary payload as one frame.
    pub async fn send_raw(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        self.writer.send_raw(payload).await
    }

    pub async fn recv(&mut self) -> anyhow::Result<Option<ServerPacket>> {
        self.reader.recv().await
    }

    pub async fn set_direction(&mut self, dx: f64, dy: f64) -> anyhow::Result<()> {
        self.writer.set_direction(dx, dy).await
    }

    pub async fn set_speed(&mut self, speed: f64) -> anyhow::Result<()> {
        self.writer.set_speed(speed).await
    }

    /// Split into halves that can be driven from different tasks.
    pub fn split(self) -> (PacketReader, PacketWriter) {
        (self.reader, self.writer)
    }
}

/// Receiving half of a connection.
pub struct PacketReader {
    inner: OwnedReadHalf,
    max_frame_len: usize,
}

impl PacketReader {
    /// Next decodable packet, or `None` once the server closed the stream.
    /// Payloads that fail to decode are logged and skipped.
    pub async fn recv(&mut self) -> anyhow::Result<Option<ServerPacket>> {
        loop {
            let Some(frame) = read_frame(&mut self.inner, self.max_frame_len).await? else {
                return Ok(None);
            };
            match ServerPacket::parse(&frame) {
                Ok(packet) => return Ok(Some(packet)),
                Err(e) => warn!("Dropping server packet: {}", e),
            }
        }
    }

    /// Turn the reader into a stream of packets ending when the server
    /// closes the connection.
    pub fn into_stream(self) -> impl Stream<Item = anyhow::Result<ServerPacket>> {
        stream::try_unfold(self, |mut reader| async move {
            Ok(reader.recv().await?.map(|packet| (packet, reader)))
        })
    }
}

/// Sending half of a connection.
pub struct PacketWriter {
    inner: OwnedWriteHalf,
}

impl PacketWriter {
    pub async fn send(&mut self, packet: &ClientPacket) -> anyhow::Result<()> {
        trace!("Sending {:?}", packet.opcode());
        self.send_raw(packet.build().as_slice()).await
    }

    pub async fn send_raw(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        write_frame(&mut self.inner, payload).await?;
        Ok(())
    }

    /// Steer toward `(dx, dy)`; only the direction matters.
    pub async fn set_direction(&mut self, dx: f64, dy: f64) -> anyhow::Result<()> {
        self.send(&ClientPacket::MovePlayer { dx, dy }).await
    }

    pub async fn set_speed(&mut self, speed: f64) -> anyhow::Result<()> {
        self.send(&ClientPacket::BoostPlayer { speed }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use protocol::packets::{build_join_response, build_string_message};
    use tokio::net::TcpListener;

    async fn pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (conn, accepted) = tokio::join!(Connection::connect(addr), listener.accept());
        (conn.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn join_waits_for_response() {
        let (mut conn, mut server) = pair().await;

        let fake = tokio::spawn(async move {
            let frame = read_frame(&mut server, 1024).await.unwrap().unwrap();
            let packet = ClientPacket::parse(&frame).unwrap();
            assert_eq!(
                packet,
                ClientPacket::Join {
                    name: "worm".into(),
                    color: Color::new(1, 2, 3)
                }
            );
            write_frame(&mut server, build_string_message("welcome").as_slice()).await.unwrap();
            write_frame(&mut server, build_join_response("worm", 7).as_slice()).await.unwrap();
            server
        });

        assert_eq!(conn.join("worm", Color::new(1, 2, 3)).await.unwrap(), 7);
        fake.await.unwrap();
    }

    #[tokio::test]
    async fn join_fails_when_server_hangs_up() {
        let (mut conn, server) = pair().await;
        drop(server);
        assert!(conn.join("worm", Color::default()).await.is_err());
    }

    #[tokio::test]
    async fn intents_are_framed() {
        let (mut conn, mut server) = pair().await;
        conn.set_direction(1.0, -2.0).await.unwrap();
        conn.set_speed(15.0).await.unwrap();

        let first = read_frame(&mut server, 1024).await.unwrap().unwrap();
        assert_eq!(ClientPacket::parse(&first).unwrap(), ClientPacket::MovePlayer { dx: 1.0, dy: -2.0 });
        let second = read_frame(&mut server, 1024).await.unwrap().unwrap();
        assert_eq!(ClientPacket::parse(&second).unwrap(), ClientPacket::BoostPlayer { speed: 15.0 });
    }

    #[tokio::test]
    async fn reader_skips_garbage_and_ends_on_close() {
        let (conn, mut server) = pair().await;
        let (reader, _writer) = conn.split();

        write_frame(&mut server, &[0xEE, 1, 2]).await.unwrap();
        write_frame(&mut server, build_string_message("hi").as_slice()).await.unwrap();
        drop(server);

        let packets: Vec<_> = reader.into_stream().collect().await;
        assert_eq!(packets.len(), 1);
        assert_eq!(
            packets[0].as_ref().unwrap(),
            &ServerPacket::StringMessage { text: "hi".into() }
        );
    }
}
