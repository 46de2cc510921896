//! Authoritative match state: one board plus one player view per
//! connected seat. All board mutation funnels through here, driven by
//! parsed client intents and the tick loop; connection tasks never
//! touch the board directly.

use log::{debug, info, warn};
use std::collections::BTreeMap;

use shared::board::Board;
use shared::codec;
use shared::creature::{Creature, Direction};
use shared::intent::Intent;
use shared::player::{Player, Selection};
use shared::tile::Building;

/// Hit points a building gets per tier when founded.
const BUILDING_HEALTH_PER_TIER: u32 = 200;

pub struct HostGame {
    board: Board,
    players: BTreeMap<u32, Player>,
    tick: u64,
}

impl HostGame {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            players: BTreeMap::new(),
            tick: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seats(&self) -> Vec<u32> {
        self.players.keys().copied().collect()
    }

    /// Registers a seat for a newly connected client.
    pub fn add_seat(&mut self, seat: u32) {
        self.players.insert(seat, Player::new(&self.board, seat));
        info!("seat {} joined, {} seats active", seat, self.players.len());
    }

    /// Drops a disconnected seat. Its creatures stay on the board.
    pub fn remove_seat(&mut self, seat: u32) {
        if self.players.remove(&seat).is_some() {
            info!("seat {} left, {} seats active", seat, self.players.len());
        }
    }

    /// Applies one parsed intent for a seat. Intents that fail board or
    /// overlay validation are dropped with a warning; the board is
    /// never left half-mutated.
    pub fn apply_intent(&mut self, seat: u32, intent: Intent) {
        let Some(player) = self.players.get_mut(&seat) else {
            warn!("intent from unknown seat {}", seat);
            return;
        };
        debug!("seat {} intent: {:?}", seat, intent);

        match intent {
            Intent::SelectTile { x, y } => {
                if !player.select_tile(&self.board, x, y) {
                    warn!("seat {} selected out-of-range tile ({}, {})", seat, x, y);
                }
            }
            Intent::TileAction { x, y } => {
                if let Err(err) = player.handle_click(&mut self.board, x as i32, y as i32) {
                    warn!("seat {} click on ({}, {}) dropped: {}", seat, x, y, err);
                }
            }
            Intent::Hover { x, y } => {
                player.update_hover(x, y);
            }
            Intent::MakeCreature { .. } => {
                if let Some(recruit) = intent.creature_for_seat(seat) {
                    Self::spawn_creature(&mut self.board, seat, recruit);
                }
            }
            Intent::MakeBuilding { cost, tier } => {
                Self::found_building(&mut self.board, player, seat, cost, tier);
            }
            Intent::EndTurn => {
                self.refresh_seat(seat);
            }
        }
    }

    /// Places a commissioned creature on the first vacant tile next to
    /// one of the seat's buildings.
    fn spawn_creature(board: &mut Board, seat: u32, recruit: Creature) {
        let owned_building = board.positions().find(|&(x, y)| {
            board
                .get(x, y)
                .ok()
                .and_then(|tile| tile.building())
                .map(|b| b.controller() == seat)
                .unwrap_or(false)
        });
        let Some((bx, by)) = owned_building else {
            warn!("seat {} has no building to recruit from", seat);
            return;
        };

        let spawn_spot = [
            Direction::North,
            Direction::West,
            Direction::South,
            Direction::East,
        ]
        .into_iter()
        .filter_map(|direction| direction.step(bx, by))
        .find(|&(x, y)| {
            board
                .get(x, y)
                .map(|tile| tile.passable_by(&recruit))
                .unwrap_or(false)
        });

        match spawn_spot {
            Some((x, y)) => {
                info!("seat {} recruited a creature at ({}, {})", seat, x, y);
                let _ = board.set_creature(x, y, recruit);
            }
            None => warn!(
                "seat {} cannot recruit: no vacant tile around ({}, {})",
                seat, bx, by
            ),
        }
    }

    /// Founds a building on the seat's currently selected tile, when
    /// that tile is vacant.
    fn found_building(board: &mut Board, player: &mut Player, seat: u32, cost: u32, tier: u32) {
        let Selection::Tile(x, y) = player.selection() else {
            warn!("seat {} tried to build with no tile selected", seat);
            return;
        };
        let vacant = board
            .get(x, y)
            .map(|tile| tile.terrain().walkable() && !tile.occupied() && tile.building().is_none())
            .unwrap_or(false);
        if !vacant {
            warn!("seat {} cannot build on ({}, {})", seat, x, y);
            return;
        }
        let health = BUILDING_HEALTH_PER_TIER * tier.max(1);
        let _ = board.set_building(x, y, Building::new(health, cost, tier, seat));
        info!(
            "seat {} founded a tier {} building at ({}, {})",
            seat, tier, x, y
        );
    }

    /// End-of-turn bookkeeping for one seat: energy back to full and a
    /// fresh fog-of-war pass.
    fn refresh_seat(&mut self, seat: u32) {
        self.board.refresh_energy(seat);
        if let Some(player) = self.players.get_mut(&seat) {
            player.update_vision(&self.board);
        }
    }

    /// Advances one simulation tick: every seat's creatures progress
    /// their movement and animation.
    pub fn update(&mut self, dt: f32) {
        self.tick += 1;
        for player in self.players.values_mut() {
            player.update_creatures(&mut self.board, dt);
        }
    }

    /// Serializes the board into the frame broadcast to every viewer.
    pub fn state_frame(&self) -> String {
        codec::state_frame(&self.board)
    }

    /// Clears the per-tile damage markers once they have been
    /// replicated.
    pub fn clear_damage_markers(&mut self) {
        self.board.clear_all_damage();
    }
}
