//! Simulation core shared by the server and the viewer client: the
//! board/tile/creature data model, per-seat selection and pathfinding,
//! and the text codec used by the replication protocol.

pub mod board;
pub mod codec;
pub mod creature;
pub mod intent;
pub mod player;
pub mod tile;

pub use board::{Board, BoardError, CombatReport};
pub use creature::{Creature, Direction, Race};
pub use intent::Intent;
pub use player::{Player, PlayerError, Selection, TileAction, TileStyle, Visibility};
pub use tile::{Building, Terrain, Tile, TileColor};

/// Hard ceiling on a single socket message; also the receive buffer
/// size, 2^16 - 1.
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// Default number of simultaneous client connections a server accepts.
pub const MAX_CONNECTIONS: usize = 5;

/// Fraction of a tile a creature's step animation advances per second.
pub const MOVE_ANIMATION_SPEED: f32 = 4.0;
