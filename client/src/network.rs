//! Client side of the replication protocol: connect, walk the
//! lock-step board handshake, then exchange newline-framed traffic
//! with the match session.

use log::{debug, info};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::state::{BoardView, StateUpdate};
use shared::codec::{self, CodecError};
use shared::intent::Intent;
use shared::MAX_MESSAGE_SIZE;

/// Mirror of the server's poll window for coalescing fragmented
/// messages during the lock-step phase.
const COALESCE_WINDOW: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("server closed the connection")]
    ServerClosed,
    #[error("unexpected message from server: {0:?}")]
    Protocol(String),
}

/// A connection that has completed the board handshake but is still
/// waiting in the lobby.
pub struct ViewerClient {
    stream: TcpStream,
}

/// Connects to a server and performs the client half of the lock-step
/// handshake: receive the width/height payload and each of the six
/// game-data payloads, acknowledging every one by name. Returns the
/// lobby connection and the initial board replica.
pub async fn connect(addr: &str) -> Result<(ViewerClient, BoardView), ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    info!("connected to {}", addr);

    let initial = read_message(&mut stream).await?;
    let (width, height) = codec::parse_initial(&initial)?;
    debug!("board is {}x{}", width, height);
    stream.write_all(codec::ACK_INITIAL.as_bytes()).await?;

    let mut payloads = Vec::with_capacity(6);
    for ack in [
        codec::ACK_TERRAIN,
        codec::ACK_CREATURE,
        codec::ACK_COLOR,
        codec::ACK_DAMAGE,
        codec::ACK_OFFSET,
        codec::ACK_BUILDING,
    ] {
        let payload = read_message(&mut stream).await?;
        stream.write_all(ack.as_bytes()).await?;
        payloads.push(payload);
    }

    let view = BoardView::from_payloads(
        width,
        height,
        &payloads[0],
        &payloads[1],
        &payloads[2],
        &payloads[3],
        &payloads[4],
        &payloads[5],
    )?;
    info!("board handshake complete");
    Ok((ViewerClient { stream }, view))
}

impl ViewerClient {
    /// Blocks until the server announces the match, confirms readiness,
    /// and promotes the connection into a running session.
    pub async fn wait_for_start(mut self) -> Result<GameSession, ClientError> {
        let message = read_message(&mut self.stream).await?;
        if message != codec::GAME_START {
            return Err(ClientError::Protocol(message));
        }
        self.stream
            .write_all(codec::READY_MESSAGE.as_bytes())
            .await?;
        info!("match started");

        let (read_half, write_half) = self.stream.into_split();
        Ok(GameSession {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
        })
    }
}

/// A running match: newline-framed state frames in, intents out.
pub struct GameSession {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl GameSession {
    /// Waits for the next state frame. Returns None when the server
    /// closes the connection; unparseable frames are an error but do
    /// not consume the session.
    pub async fn next_frame(&mut self) -> Result<Option<StateUpdate>, ClientError> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.is_empty() {
                continue;
            }
            let [terrain, creatures, colors, damage, offsets, buildings] =
                codec::split_state_frame(&line)?;
            return Ok(Some(StateUpdate {
                terrain: terrain.to_string(),
                creatures: creatures.to_string(),
                colors: colors.to_string(),
                damage: damage.to_string(),
                offsets: offsets.to_string(),
                buildings: buildings.to_string(),
            }));
        }
    }

    /// Sends one intent to the server.
    pub async fn send_intent(&mut self, intent: &Intent) -> Result<(), ClientError> {
        let line = format!("{}\n", intent.encode());
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// Reads one raw message during the lock-step phase, coalescing
/// fragments the same way the server side does. A zero-length read
/// means the server hung up.
async fn read_message(stream: &mut TcpStream) -> Result<String, ClientError> {
    let mut buffer = vec![0u8; MAX_MESSAGE_SIZE];
    let count = stream.read(&mut buffer).await?;
    if count == 0 {
        return Err(ClientError::ServerClosed);
    }
    let mut message = String::from_utf8_lossy(&buffer[..count]).into_owned();
    loop {
        match timeout(COALESCE_WINDOW, stream.read(&mut buffer)).await {
            Err(_) => break,
            Ok(Ok(0)) => break,
            Ok(Ok(more)) => message.push_str(&String::from_utf8_lossy(&buffer[..more])),
            Ok(Err(err)) => return Err(err.into()),
        }
    }
    Ok(message)
}
