//! Server-side connection management for the replication protocol.
//!
//! This module owns the listening socket and the table of live client
//! connections, including:
//! - Connection lifecycle (accept, explicit close, peer disconnect)
//! - Raw string send/receive with the protocol's fixed message ceiling
//! - The broadcast and barrier primitives the lock-step phases rely on
//! - The six-payload board handshake that brings a new viewer up
//!
//! Connections are addressed by a stable id that is never reused, so a
//! stale id can never alias a newer peer. The table is bounded by the
//! configured capacity; hitting the bound is reported before any
//! accept is attempted and leaves existing connections untouched.

use log::{info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

use shared::board::Board;
use shared::codec;
use shared::MAX_MESSAGE_SIZE;

/// How long a fragmented message may trickle in before the received
/// part is treated as complete.
const COALESCE_WINDOW: Duration = Duration::from_millis(20);

/// How long the lock-step handshake waits for each acknowledgment
/// before giving up on the client.
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("server socket is not bound")]
    NotBound,
    #[error("cannot hold more than {max} connections")]
    AtCapacity { max: usize },
    #[error("client {0} is not active")]
    InactiveClient(u32),
    #[error("refusing to send an empty message")]
    EmptyMessage,
    #[error("short write to client {id}: sent {sent} of {len} bytes")]
    ShortWrite { id: u32, sent: usize, len: usize },
    #[error("client {0} closed the connection")]
    Closed(u32),
    #[error("timed out waiting for client {0}")]
    Timeout(u32),
    #[error("handshake with client {id} failed: expected {expected:?}, got {got:?}")]
    BadAck {
        id: u32,
        expected: &'static str,
        got: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct Connection {
    addr: SocketAddr,
    stream: TcpStream,
}

/// Bounded table of live client connections over one listening socket.
pub struct ConnectionManager {
    listener: Option<TcpListener>,
    connections: BTreeMap<u32, Connection>,
    next_id: u32,
    max_connections: usize,
    receive_timeout: Option<Duration>,
}

impl ConnectionManager {
    /// Creates an unbound manager. Every socket operation before a
    /// successful [`Self::bind`] fails with [`ConnectionError::NotBound`].
    pub fn new(max_connections: usize) -> Self {
        Self {
            listener: None,
            connections: BTreeMap::new(),
            next_id: 1,
            max_connections,
            receive_timeout: None,
        }
    }

    /// Binds the listening socket.
    pub async fn bind(&mut self, addr: &str) -> Result<(), ConnectionError> {
        let listener = TcpListener::bind(addr).await?;
        info!("listening on {}", listener.local_addr()?);
        self.listener = Some(listener);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ConnectionError> {
        let listener = self.listener.as_ref().ok_or(ConnectionError::NotBound)?;
        Ok(listener.local_addr()?)
    }

    /// Sets the receive timeout applied to every blocking read; None
    /// waits forever.
    pub fn set_timeout(&mut self, limit: Option<Duration>) {
        self.receive_timeout = limit;
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Ids of every live connection, ascending.
    pub fn client_ids(&self) -> Vec<u32> {
        self.connections.keys().copied().collect()
    }

    pub fn peer_addr(&self, id: u32) -> Result<SocketAddr, ConnectionError> {
        self.connections
            .get(&id)
            .map(|conn| conn.addr)
            .ok_or(ConnectionError::InactiveClient(id))
    }

    /// Blocks until one peer connects and returns its new id. Fails
    /// with a capacity error, before accepting anything, when the table
    /// is full; existing connections are never disturbed.
    pub async fn add_client(&mut self) -> Result<u32, ConnectionError> {
        let listener = self.listener.as_ref().ok_or(ConnectionError::NotBound)?;
        if self.connections.len() >= self.max_connections {
            return Err(ConnectionError::AtCapacity {
                max: self.max_connections,
            });
        }

        let (stream, addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        let id = self.next_id;
        self.next_id += 1;
        self.connections.insert(id, Connection { addr, stream });
        info!("client {} connected from {}", id, addr);
        Ok(id)
    }

    /// Closes one connection and frees its table entry.
    pub fn close_connection(&mut self, id: u32) -> Result<(), ConnectionError> {
        match self.connections.remove(&id) {
            Some(conn) => {
                info!("client {} ({}) disconnected", id, conn.addr);
                Ok(())
            }
            None => Err(ConnectionError::InactiveClient(id)),
        }
    }

    /// Removes a connection from the table and hands its stream to the
    /// caller, for promotion into a per-client session task.
    pub fn into_stream(&mut self, id: u32) -> Result<(TcpStream, SocketAddr), ConnectionError> {
        let conn = self
            .connections
            .remove(&id)
            .ok_or(ConnectionError::InactiveClient(id))?;
        Ok((conn.stream, conn.addr))
    }

    /// Writes one raw message to a client. A short write is an error
    /// under `strict` and only logged otherwise; either way the caller
    /// must keep messages within [`MAX_MESSAGE_SIZE`] or frame its own
    /// chunks.
    pub async fn send(
        &mut self,
        id: u32,
        message: &str,
        strict: bool,
    ) -> Result<(), ConnectionError> {
        if self.listener.is_none() {
            return Err(ConnectionError::NotBound);
        }
        if message.is_empty() {
            return Err(ConnectionError::EmptyMessage);
        }
        let conn = self
            .connections
            .get_mut(&id)
            .ok_or(ConnectionError::InactiveClient(id))?;

        let bytes = message.as_bytes();
        let sent = conn.stream.write(bytes).await?;
        if sent < bytes.len() {
            if strict {
                return Err(ConnectionError::ShortWrite {
                    id,
                    sent,
                    len: bytes.len(),
                });
            }
            warn!(
                "short write to client {}: sent {} of {} bytes",
                id,
                sent,
                bytes.len()
            );
        }
        Ok(())
    }

    /// Sends the same message to every live connection in id order.
    /// Under non-strict mode one recipient's failure is logged and the
    /// rest still get their copy.
    pub async fn broadcast(&mut self, message: &str, strict: bool) -> Result<(), ConnectionError> {
        if self.listener.is_none() {
            return Err(ConnectionError::NotBound);
        }
        if message.is_empty() {
            return Err(ConnectionError::EmptyMessage);
        }
        for id in self.client_ids() {
            match self.send(id, message, strict).await {
                Ok(()) => {}
                Err(err) if !strict => {
                    warn!("broadcast to client {} failed: {}", id, err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Blocking read of one message from a client.
    ///
    /// After the first read a short non-blocking poll appends any
    /// continuation bytes that are already in flight, coalescing a
    /// fragmented send into one logical message. The poll window is
    /// the only framing the protocol has, so a slow continuation is
    /// indistinguishable from the next message. A zero-length read
    /// reports the connection as closed through the returned flag.
    pub async fn receive(&mut self, id: u32) -> Result<(String, bool), ConnectionError> {
        if self.listener.is_none() {
            return Err(ConnectionError::NotBound);
        }
        let receive_timeout = self.receive_timeout;
        let conn = self
            .connections
            .get_mut(&id)
            .ok_or(ConnectionError::InactiveClient(id))?;

        let mut buffer = vec![0u8; MAX_MESSAGE_SIZE];
        let count = match receive_timeout {
            Some(limit) => timeout(limit, conn.stream.read(&mut buffer))
                .await
                .map_err(|_| ConnectionError::Timeout(id))??,
            None => conn.stream.read(&mut buffer).await?,
        };

        let mut closed = count == 0;
        let mut message = String::from_utf8_lossy(&buffer[..count]).into_owned();
        if count > 0 {
            loop {
                match timeout(COALESCE_WINDOW, conn.stream.read(&mut buffer)).await {
                    Err(_) => break,
                    Ok(Ok(0)) => {
                        closed = true;
                        break;
                    }
                    Ok(Ok(more)) => {
                        message.push_str(&String::from_utf8_lossy(&buffer[..more]));
                    }
                    Ok(Err(err)) => return Err(err.into()),
                }
            }
        }
        Ok((message, closed))
    }

    /// Synchronization barrier: true only when every live connection's
    /// next message matches `expected` exactly. A connection found
    /// closed or failing mid-check is dropped and fails the barrier;
    /// the remaining connections are still polled.
    pub async fn all_received(&mut self, expected: &str) -> bool {
        let mut all_matched = true;
        for id in self.client_ids() {
            match self.receive(id).await {
                Ok((message, closed)) => {
                    if closed {
                        warn!("client {} closed during barrier", id);
                        let _ = self.close_connection(id);
                        all_matched = false;
                    } else if message != expected {
                        warn!(
                            "client {} sent {:?} instead of barrier message {:?}",
                            id, message, expected
                        );
                        all_matched = false;
                    }
                }
                Err(err) => {
                    warn!("client {} failed during barrier: {}", id, err);
                    let _ = self.close_connection(id);
                    all_matched = false;
                }
            }
        }
        all_matched
    }

    /// Runs the lock-step board handshake with one freshly accepted
    /// client: the width/height payload and then the six game-data
    /// payloads, each acknowledged by name before the next is sent.
    /// Every acknowledgment read is bounded by a timeout; a missing,
    /// wrong, or late acknowledgment closes the connection and frees
    /// its slot.
    pub async fn handshake(&mut self, id: u32, board: &Board) -> Result<(), ConnectionError> {
        match self.run_handshake(id, board).await {
            Ok(()) => {
                info!("client {} completed the board handshake", id);
                Ok(())
            }
            Err(err) => {
                if self.connections.contains_key(&id) {
                    let _ = self.close_connection(id);
                }
                Err(err)
            }
        }
    }

    async fn run_handshake(&mut self, id: u32, board: &Board) -> Result<(), ConnectionError> {
        let steps = [
            (codec::initial_payload(board), codec::ACK_INITIAL),
            (codec::terrain_payload(board), codec::ACK_TERRAIN),
            (codec::creature_payload(board), codec::ACK_CREATURE),
            (codec::color_payload(board), codec::ACK_COLOR),
            (codec::damage_payload(board), codec::ACK_DAMAGE),
            (codec::offset_payload(board), codec::ACK_OFFSET),
            (codec::building_payload(board), codec::ACK_BUILDING),
        ];
        for (payload, ack) in steps {
            self.send(id, &payload, true).await?;
            self.expect_ack(id, ack).await?;
        }
        Ok(())
    }

    async fn expect_ack(&mut self, id: u32, expected: &'static str) -> Result<(), ConnectionError> {
        let (message, closed) = match timeout(ACK_TIMEOUT, self.receive(id)).await {
            Err(_) => return Err(ConnectionError::Timeout(id)),
            Ok(result) => result?,
        };
        if closed {
            return Err(ConnectionError::Closed(id));
        }
        if message != expected {
            return Err(ConnectionError::BadAck {
                id,
                expected,
                got: message,
            });
        }
        Ok(())
    }
}
