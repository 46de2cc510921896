//! # Grid War Viewer Client Library
//!
//! Client-side plumbing for the tactical grid game: connecting to a
//! server, walking the six-payload board handshake, keeping a local
//! replica of the replicated board state, and sending intents back.
//!
//! Rendering is deliberately absent - this crate ends at the
//! [`state::BoardView`] replica, which a display layer can consume
//! read-only. The bundled binary is a headless observer that logs the
//! match instead of drawing it.

pub mod network;
pub mod state;
