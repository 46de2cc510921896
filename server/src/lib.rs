//! # Grid War Server Library
//!
//! Authoritative host for the networked tactical grid game. The server
//! owns the only mutable copy of the board, applies the intents clients
//! send back, and replicates the resulting state to every connected
//! viewer.
//!
//! ## Architecture
//!
//! The simulation is single-threaded and cooperative: one tick loop
//! drains the inbound intent queue, mutates the board, and broadcasts
//! a serialized frame. Networking is split into two phases:
//!
//! - **Lobby (lock-step)**: the [`connection::ConnectionManager`]
//!   accepts clients into a bounded slot table and walks each one
//!   through the six-payload board handshake, finishing with a
//!   ready barrier across all of them.
//! - **Steady state (queues)**: each handshaken stream is promoted to
//!   a reader task (newline-framed intents in) and a writer task
//!   (state frames out), so one slow or silent peer can never stall
//!   delivery to the others. Connection tasks communicate with the
//!   tick loop only through channels; they never touch the board.
//!
//! ## Module Organization
//!
//! - [`connection`]: the socket layer - accept/send/receive/broadcast,
//!   the `all_received` barrier, and the lock-step handshake.
//! - [`game`]: match state - the board, one player view per seat, and
//!   intent application.
//! - [`scenario`]: starting-board description, loaded from JSON or
//!   generated.

pub mod connection;
pub mod game;
pub mod scenario;
