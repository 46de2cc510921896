//! Authoritative game board: a jagged 2-D grid of tiles plus the
//! position index used for fast creature iteration.
//!
//! Every mutating operation validates its coordinates first and keeps
//! tile occupancy and the position index in agreement; expected
//! gameplay rejections (blocked move, out-of-range melee attack) are
//! reported as plain negative results, never as errors.

use log::debug;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

use crate::creature::{Creature, Direction};
use crate::tile::{Building, Terrain, Tile, TileColor};

/// Errors raised by board operations before any state is changed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("coordinate ({x}, {y}) is outside the board")]
    OutOfRange { x: u32, y: u32 },
    #[error("no creature at ({x}, {y})")]
    EmptyTile { x: u32, y: u32 },
    #[error("no building at ({x}, {y})")]
    NoBuilding { x: u32, y: u32 },
    #[error("board must contain at least one non-empty column")]
    NoTiles,
    #[error("tile at index ({x}, {y}) reports coordinates ({tx}, {ty})")]
    MisplacedTile { x: u32, y: u32, tx: u32, ty: u32 },
}

/// Outcome of one combat exchange.
///
/// `occurred == false` means the exchange was legally requested but
/// gated off (melee attacker not adjacent); both damage fields are then
/// zero. `defend_damage` is non-zero only when a surviving melee
/// defender struck back at a melee attacker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatReport {
    pub occurred: bool,
    pub attack_damage: u32,
    pub defend_damage: u32,
}

/// The expansion order used by every breadth-first search over the
/// grid. The order is part of the contract: among equal-length paths
/// the first one discovered in this order wins.
pub(crate) const SEARCH_ORDER: [Direction; 4] = [
    Direction::North,
    Direction::West,
    Direction::South,
    Direction::East,
];

#[derive(Debug)]
pub struct Board {
    tiles: Vec<Vec<Tile>>,
    /// Positions of every occupied tile, kept in lockstep with the
    /// tile slots. Ordered so that iteration over creatures is
    /// deterministic.
    creature_positions: BTreeSet<(u32, u32)>,
}

impl Board {
    /// Builds a board from prepared columns. Columns may differ in
    /// height (a jagged board is a supported shape) but none may be
    /// empty, and every tile must sit at the index matching its own
    /// coordinates.
    pub fn new(tiles: Vec<Vec<Tile>>) -> Result<Self, BoardError> {
        if tiles.is_empty() || tiles.iter().any(|column| column.is_empty()) {
            return Err(BoardError::NoTiles);
        }
        let mut creature_positions = BTreeSet::new();
        for (x, column) in tiles.iter().enumerate() {
            for (y, tile) in column.iter().enumerate() {
                let (x, y) = (x as u32, y as u32);
                if tile.x() != x || tile.y() != y {
                    return Err(BoardError::MisplacedTile {
                        x,
                        y,
                        tx: tile.x(),
                        ty: tile.y(),
                    });
                }
                if tile.occupied() {
                    creature_positions.insert((x, y));
                }
            }
        }
        Ok(Self {
            tiles,
            creature_positions,
        })
    }

    /// Convenience constructor for a rectangular all-open board.
    pub fn open(width: u32, height: u32) -> Result<Self, BoardError> {
        let tiles = (0..width)
            .map(|x| (0..height).map(|y| Tile::new(Terrain::Open, x, y)).collect())
            .collect();
        Self::new(tiles)
    }

    pub fn width(&self) -> u32 {
        self.tiles.len() as u32
    }

    /// Height of one column; columns of a jagged board may differ.
    pub fn height(&self, x: u32) -> Result<u32, BoardError> {
        self.tiles
            .get(x as usize)
            .map(|column| column.len() as u32)
            .ok_or(BoardError::OutOfRange { x, y: 0 })
    }

    fn check(&self, x: u32, y: u32) -> Result<(), BoardError> {
        match self.tiles.get(x as usize) {
            Some(column) if (y as usize) < column.len() => Ok(()),
            _ => Err(BoardError::OutOfRange { x, y }),
        }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        self.check(x, y).is_ok()
    }

    fn tile(&self, x: u32, y: u32) -> &Tile {
        &self.tiles[x as usize][y as usize]
    }

    pub(crate) fn tile_mut(&mut self, x: u32, y: u32) -> Result<&mut Tile, BoardError> {
        self.check(x, y)?;
        Ok(&mut self.tiles[x as usize][y as usize])
    }

    pub fn get(&self, x: u32, y: u32) -> Result<&Tile, BoardError> {
        self.check(x, y)?;
        Ok(self.tile(x, y))
    }

    /// Every valid (x, y) on the board, column by column.
    pub fn positions(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.tiles.iter().enumerate().flat_map(|(x, column)| {
            (0..column.len()).map(move |y| (x as u32, y as u32))
        })
    }

    /// Positions of every occupied tile, in deterministic order.
    pub fn creature_positions(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.creature_positions.iter().copied()
    }

    /// Number of creatures on the board.
    pub fn creature_count(&self) -> usize {
        self.creature_positions.len()
    }

    /// Moves the creature at (x, y) one step. Returns false, without
    /// erroring, when the destination is off the board or occupied;
    /// the tile slot and the position index move together.
    pub fn move_creature(&mut self, x: u32, y: u32, direction: Direction) -> Result<bool, BoardError> {
        self.check(x, y)?;
        if !self.tile(x, y).occupied() {
            return Err(BoardError::EmptyTile { x, y });
        }

        let Some((nx, ny)) = direction.step(x, y) else {
            return Ok(false);
        };
        if !self.contains(nx, ny) || self.tile(nx, ny).occupied() {
            return Ok(false);
        }

        let Some(mut creature) = self.tiles[x as usize][y as usize].take_creature() else {
            return Err(BoardError::EmptyTile { x, y });
        };
        creature.decrement_energy(1);
        self.tiles[nx as usize][ny as usize].set_creature(creature);
        self.creature_positions.remove(&(x, y));
        self.creature_positions.insert((nx, ny));
        Ok(true)
    }

    /// Teleports a creature to an arbitrary tile, used for spawn and
    /// construction placement. No-op returning false when source and
    /// destination coincide or the destination is occupied.
    pub fn move_creature_to(
        &mut self,
        x: u32,
        y: u32,
        dest_x: u32,
        dest_y: u32,
    ) -> Result<bool, BoardError> {
        self.check(x, y)?;
        self.check(dest_x, dest_y)?;
        if !self.tile(x, y).occupied() {
            return Err(BoardError::EmptyTile { x, y });
        }
        if (x, y) == (dest_x, dest_y) || self.tile(dest_x, dest_y).occupied() {
            return Ok(false);
        }

        let Some(creature) = self.tiles[x as usize][y as usize].take_creature() else {
            return Err(BoardError::EmptyTile { x, y });
        };
        self.tiles[dest_x as usize][dest_y as usize].set_creature(creature);
        self.creature_positions.remove(&(x, y));
        self.creature_positions.insert((dest_x, dest_y));
        Ok(true)
    }

    /// Resolves one combat exchange between two creatures.
    ///
    /// A melee attacker further than one tile from the defender is a
    /// normal "no combat" outcome. On a real exchange the attacker
    /// spends its whole energy pool, the defender takes the attacker's
    /// attack value, and a surviving melee defender strikes a melee
    /// attacker back. Creatures reduced to 0 health are off the board
    /// before this returns.
    pub fn attack(
        &mut self,
        attacker_x: u32,
        attacker_y: u32,
        defender_x: u32,
        defender_y: u32,
    ) -> Result<CombatReport, BoardError> {
        self.check(attacker_x, attacker_y)?;
        self.check(defender_x, defender_y)?;

        let (attacker_melee, attack_damage) = {
            let attacker = self
                .tile(attacker_x, attacker_y)
                .creature()
                .ok_or(BoardError::EmptyTile {
                    x: attacker_x,
                    y: attacker_y,
                })?;
            (attacker.melee(), attacker.attack())
        };
        let (defender_melee, defender_attack) = {
            let defender = self
                .tile(defender_x, defender_y)
                .creature()
                .ok_or(BoardError::EmptyTile {
                    x: defender_x,
                    y: defender_y,
                })?;
            (defender.melee(), defender.attack())
        };

        if attacker_melee
            && self.tile_distance(attacker_x, attacker_y, defender_x, defender_y)? > 1
        {
            return Ok(CombatReport::default());
        }

        let defender_died = match self.tile_mut(defender_x, defender_y)?.creature_mut() {
            Some(defender) => defender.take_damage(attack_damage),
            None => {
                return Err(BoardError::EmptyTile {
                    x: defender_x,
                    y: defender_y,
                })
            }
        };
        if let Some(attacker) = self.tile_mut(attacker_x, attacker_y)?.creature_mut() {
            attacker.use_all_energy();
        }

        let mut defend_damage = 0;
        let mut attacker_died = false;
        if !defender_died && defender_melee && attacker_melee {
            defend_damage = defender_attack;
            attacker_died = match self.tile_mut(attacker_x, attacker_y)?.creature_mut() {
                Some(attacker) => attacker.take_damage(defender_attack),
                None => false,
            };
        }

        if defender_died {
            self.remove_creature(defender_x, defender_y);
            debug!(
                "creature at ({}, {}) destroyed by attack from ({}, {})",
                defender_x, defender_y, attacker_x, attacker_y
            );
        }
        if attacker_died {
            self.remove_creature(attacker_x, attacker_y);
            debug!(
                "creature at ({}, {}) destroyed by counterattack",
                attacker_x, attacker_y
            );
        }

        Ok(CombatReport {
            occurred: true,
            attack_damage,
            defend_damage,
        })
    }

    /// Resolves an attack against a building. Buildings never strike
    /// back; the melee adjacency gate and the full energy spend match
    /// creature combat.
    pub fn attack_building(
        &mut self,
        attacker_x: u32,
        attacker_y: u32,
        building_x: u32,
        building_y: u32,
    ) -> Result<CombatReport, BoardError> {
        self.check(attacker_x, attacker_y)?;
        self.check(building_x, building_y)?;

        let (attacker_melee, attack_damage) = {
            let attacker = self
                .tile(attacker_x, attacker_y)
                .creature()
                .ok_or(BoardError::EmptyTile {
                    x: attacker_x,
                    y: attacker_y,
                })?;
            (attacker.melee(), attacker.attack())
        };
        if self.tile(building_x, building_y).building().is_none() {
            return Err(BoardError::NoBuilding {
                x: building_x,
                y: building_y,
            });
        }

        if attacker_melee
            && self.tile_distance(attacker_x, attacker_y, building_x, building_y)? > 1
        {
            return Ok(CombatReport::default());
        }

        let destroyed = match self.tile_mut(building_x, building_y)?.building_mut() {
            Some(building) => building.take_damage(attack_damage),
            None => {
                return Err(BoardError::NoBuilding {
                    x: building_x,
                    y: building_y,
                })
            }
        };
        if let Some(attacker) = self.tile_mut(attacker_x, attacker_y)?.creature_mut() {
            attacker.use_all_energy();
        }
        if destroyed {
            let _ = self.tile_mut(building_x, building_y)?.take_building();
            debug!("building at ({}, {}) destroyed", building_x, building_y);
        }

        Ok(CombatReport {
            occurred: true,
            attack_damage,
            defend_damage: 0,
        })
    }

    /// Manhattan distance between two validated tiles.
    pub fn tile_distance(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<u32, BoardError> {
        self.check(x1, y1)?;
        self.check(x2, y2)?;
        Ok(x1.abs_diff(x2) + y1.abs_diff(y2))
    }

    /// Places a creature on a validated tile, releasing and returning
    /// any previous occupant.
    pub fn set_creature(
        &mut self,
        x: u32,
        y: u32,
        creature: Creature,
    ) -> Result<Option<Creature>, BoardError> {
        let previous = self.tile_mut(x, y)?.set_creature(creature);
        self.creature_positions.insert((x, y));
        Ok(previous)
    }

    /// Removes and returns the creature at a validated tile, if any.
    pub fn take_creature(&mut self, x: u32, y: u32) -> Result<Option<Creature>, BoardError> {
        self.check(x, y)?;
        Ok(self.remove_creature(x, y))
    }

    fn remove_creature(&mut self, x: u32, y: u32) -> Option<Creature> {
        self.creature_positions.remove(&(x, y));
        self.tiles[x as usize][y as usize].take_creature()
    }

    pub fn set_building(
        &mut self,
        x: u32,
        y: u32,
        building: Building,
    ) -> Result<Option<Building>, BoardError> {
        Ok(self.tile_mut(x, y)?.set_building(building))
    }

    pub fn take_building(&mut self, x: u32, y: u32) -> Result<Option<Building>, BoardError> {
        Ok(self.tile_mut(x, y)?.take_building())
    }

    /// Sets the display tint of one tile.
    pub fn set_color(&mut self, x: u32, y: u32, color: TileColor) -> Result<(), BoardError> {
        self.tile_mut(x, y)?.set_color(color);
        Ok(())
    }

    /// Records a damage value for display over one tile.
    pub fn set_damage(&mut self, x: u32, y: u32, damage: u32) -> Result<(), BoardError> {
        self.tile_mut(x, y)?.set_damage(damage);
        Ok(())
    }

    /// Clears every tile's displayed damage, called once the values
    /// have been replicated.
    pub fn clear_all_damage(&mut self) {
        for column in &mut self.tiles {
            for tile in column {
                tile.clear_damage();
            }
        }
    }

    /// Start-of-turn reset: refills the energy pool of every creature
    /// controlled by the given seat.
    pub fn refresh_energy(&mut self, controller: u32) {
        let positions: Vec<(u32, u32)> = self.creature_positions.iter().copied().collect();
        for (x, y) in positions {
            if let Some(creature) = self.tiles[x as usize][y as usize].creature_mut() {
                if creature.controller() == controller {
                    creature.refresh_energy();
                }
            }
        }
    }

    /// Turns the creature at (x, y) to face a direction given as a wire
    /// code. No-op returning false when the code is not a direction or
    /// the tile holds no creature.
    pub fn set_direction(&mut self, x: u32, y: u32, code: u8) -> Result<bool, BoardError> {
        self.check(x, y)?;
        let Some(direction) = Direction::from_code(code) else {
            return Ok(false);
        };
        match self.tiles[x as usize][y as usize].creature_mut() {
            Some(creature) => {
                creature.set_direction(direction);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tiles the creature at (x, y) could reach this turn: breadth-
    /// first search over currently passable tiles, at most one step per
    /// point of remaining energy. The starting tile is not included.
    pub fn reachable_tiles(&self, x: u32, y: u32) -> Result<Vec<(u32, u32)>, BoardError> {
        self.check(x, y)?;
        let creature = self
            .tile(x, y)
            .creature()
            .ok_or(BoardError::EmptyTile { x, y })?;
        let energy = creature.energy();

        let mut reached = Vec::new();
        let mut visited = BTreeSet::from([(x, y)]);
        let mut frontier = VecDeque::from([(x, y, 0u32)]);
        while let Some((cx, cy, steps)) = frontier.pop_front() {
            if steps >= energy {
                continue;
            }
            for direction in SEARCH_ORDER {
                let Some((nx, ny)) = direction.step(cx, cy) else {
                    continue;
                };
                if !self.contains(nx, ny)
                    || !self.tile(nx, ny).passable_by(creature)
                    || !visited.insert((nx, ny))
                {
                    continue;
                }
                reached.push((nx, ny));
                frontier.push_back((nx, ny, steps + 1));
            }
        }
        Ok(reached)
    }

    /// Tiles within the attack range of the creature at (x, y):
    /// every valid tile whose Manhattan distance is in [1, range].
    pub fn attackable_tiles(&self, x: u32, y: u32) -> Result<Vec<(u32, u32)>, BoardError> {
        self.check(x, y)?;
        let range = self
            .tile(x, y)
            .creature()
            .ok_or(BoardError::EmptyTile { x, y })?
            .range() as i64;

        let mut in_range = Vec::new();
        for dx in -range..=range {
            let remaining = range - dx.abs();
            for dy in -remaining..=remaining {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (tx, ty) = (x as i64 + dx, y as i64 + dy);
                if tx < 0 || ty < 0 {
                    continue;
                }
                let (tx, ty) = (tx as u32, ty as u32);
                if self.contains(tx, ty) {
                    in_range.push((tx, ty));
                }
            }
        }
        Ok(in_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::Race;

    fn melee_unit(controller: u32) -> Creature {
        Creature::new(Race::Human, 100, 4, 30, 1, 2, 1, Direction::North, controller)
    }

    fn ranged_unit(controller: u32) -> Creature {
        Creature::new(Race::Elf, 60, 3, 20, 3, 4, 2, Direction::North, controller)
    }

    fn occupied_tile_count(board: &Board) -> usize {
        board
            .positions()
            .filter(|&(x, y)| board.get(x, y).unwrap().occupied())
            .count()
    }

    #[test]
    fn rejects_empty_and_misplaced_boards() {
        assert_eq!(Board::new(Vec::new()).unwrap_err(), BoardError::NoTiles);
        assert_eq!(
            Board::new(vec![Vec::new()]).unwrap_err(),
            BoardError::NoTiles
        );
        let misplaced = vec![vec![Tile::new(Terrain::Open, 5, 5)]];
        assert!(matches!(
            Board::new(misplaced).unwrap_err(),
            BoardError::MisplacedTile { .. }
        ));
    }

    #[test]
    fn jagged_columns_are_supported() {
        let tiles = vec![
            (0..4).map(|y| Tile::new(Terrain::Open, 0, y)).collect(),
            (0..2).map(|y| Tile::new(Terrain::Open, 1, y)).collect(),
            (0..6).map(|y| Tile::new(Terrain::Open, 2, y)).collect(),
        ];
        let board = Board::new(tiles).unwrap();
        assert_eq!(board.width(), 3);
        assert_eq!(board.height(0).unwrap(), 4);
        assert_eq!(board.height(1).unwrap(), 2);
        assert_eq!(board.height(2).unwrap(), 6);
        assert!(board.get(2, 5).is_ok());
        assert_eq!(
            board.get(1, 3).unwrap_err(),
            BoardError::OutOfRange { x: 1, y: 3 }
        );
    }

    #[test]
    fn move_updates_tile_and_index_together() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(1, 1, melee_unit(0)).unwrap();

        assert!(board.move_creature(1, 1, Direction::North).unwrap());
        assert!(!board.get(1, 1).unwrap().occupied());
        assert!(board.get(1, 0).unwrap().occupied());
        assert_eq!(
            board.creature_positions().collect::<Vec<_>>(),
            vec![(1, 0)]
        );
        assert_eq!(board.creature_count(), occupied_tile_count(&board));
    }

    #[test]
    fn move_spends_one_energy_per_step() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board.move_creature(0, 0, Direction::South).unwrap();
        assert_eq!(board.get(0, 1).unwrap().creature().unwrap().energy(), 3);
    }

    #[test]
    fn blocked_moves_return_false_not_error() {
        let mut board = Board::open(2, 2).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board.set_creature(1, 0, melee_unit(1)).unwrap();

        // Off the board.
        assert!(!board.move_creature(0, 0, Direction::North).unwrap());
        assert!(!board.move_creature(0, 0, Direction::West).unwrap());
        // Occupied destination.
        assert!(!board.move_creature(0, 0, Direction::East).unwrap());
        // Nothing moved or vanished.
        assert_eq!(board.creature_count(), 2);
        assert_eq!(board.creature_count(), occupied_tile_count(&board));
    }

    #[test]
    fn move_validates_source_before_mutating() {
        let mut board = Board::open(2, 2).unwrap();
        assert_eq!(
            board.move_creature(5, 0, Direction::North).unwrap_err(),
            BoardError::OutOfRange { x: 5, y: 0 }
        );
        assert_eq!(
            board.move_creature(0, 0, Direction::North).unwrap_err(),
            BoardError::EmptyTile { x: 0, y: 0 }
        );
    }

    #[test]
    fn teleport_rejects_same_tile_and_occupied_destination() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board.set_creature(3, 3, melee_unit(1)).unwrap();

        assert!(!board.move_creature_to(0, 0, 0, 0).unwrap());
        assert!(!board.move_creature_to(0, 0, 3, 3).unwrap());
        assert!(board.move_creature_to(0, 0, 2, 1).unwrap());
        assert!(board.get(2, 1).unwrap().occupied());
        assert_eq!(board.creature_count(), occupied_tile_count(&board));
    }

    #[test]
    fn melee_exchange_with_counterattack() {
        let mut board = Board::open(4, 4).unwrap();
        // Attacker: attack 30. Defender: 100 max health, attack 10.
        board.set_creature(1, 1, melee_unit(0)).unwrap();
        board
            .set_creature(
                1,
                2,
                Creature::new(Race::Orc, 100, 4, 10, 1, 2, 1, Direction::North, 1),
            )
            .unwrap();

        let report = board.attack(1, 1, 1, 2).unwrap();
        assert_eq!(
            report,
            CombatReport {
                occurred: true,
                attack_damage: 30,
                defend_damage: 10,
            }
        );
        assert_eq!(board.get(1, 2).unwrap().creature().unwrap().health(), 70);
        assert_eq!(board.get(1, 1).unwrap().creature().unwrap().health(), 90);
        // The attack drained the attacker's pool.
        assert_eq!(board.get(1, 1).unwrap().creature().unwrap().energy(), 0);
    }

    #[test]
    fn melee_attack_out_of_reach_is_a_normal_negative() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board.set_creature(3, 3, melee_unit(1)).unwrap();

        let report = board.attack(0, 0, 3, 3).unwrap();
        assert!(!report.occurred);
        assert_eq!(report.attack_damage, 0);
        assert_eq!(report.defend_damage, 0);
        // Nobody was hurt and no energy was spent.
        assert_eq!(board.get(0, 0).unwrap().creature().unwrap().energy(), 4);
        assert_eq!(board.get(3, 3).unwrap().creature().unwrap().health(), 100);
    }

    #[test]
    fn ranged_attacker_is_never_counterattacked() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, ranged_unit(0)).unwrap();
        board.set_creature(0, 1, melee_unit(1)).unwrap();

        let report = board.attack(0, 0, 0, 1).unwrap();
        assert!(report.occurred);
        assert_eq!(report.defend_damage, 0);
        assert_eq!(board.get(0, 0).unwrap().creature().unwrap().health(), 60);
    }

    #[test]
    fn ranged_defender_never_strikes_back() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board.set_creature(0, 1, ranged_unit(1)).unwrap();

        let report = board.attack(0, 0, 0, 1).unwrap();
        assert!(report.occurred);
        assert_eq!(report.defend_damage, 0);
        assert_eq!(board.get(0, 0).unwrap().creature().unwrap().health(), 100);
    }

    #[test]
    fn dead_defender_is_gone_before_attack_returns() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board
            .set_creature(
                0,
                1,
                Creature::new(Race::Orc, 25, 4, 50, 1, 2, 1, Direction::North, 1),
            )
            .unwrap();

        let report = board.attack(0, 0, 0, 1).unwrap();
        assert!(report.occurred);
        assert_eq!(report.attack_damage, 30);
        // Killed outright, so no counterattack despite its huge attack.
        assert_eq!(report.defend_damage, 0);
        assert!(!board.get(0, 1).unwrap().occupied());
        assert_eq!(board.creature_count(), 1);
        assert_eq!(board.creature_count(), occupied_tile_count(&board));
    }

    #[test]
    fn counterattack_can_kill_the_attacker() {
        let mut board = Board::open(4, 4).unwrap();
        board
            .set_creature(
                0,
                0,
                Creature::new(Race::Human, 10, 4, 5, 1, 2, 1, Direction::North, 0),
            )
            .unwrap();
        board
            .set_creature(
                0,
                1,
                Creature::new(Race::Orc, 100, 4, 40, 1, 2, 1, Direction::North, 1),
            )
            .unwrap();

        let report = board.attack(0, 0, 0, 1).unwrap();
        assert_eq!(report.defend_damage, 40);
        assert!(!board.get(0, 0).unwrap().occupied());
        assert_eq!(board.creature_count(), 1);
    }

    #[test]
    fn attack_on_empty_tile_is_a_logic_error() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        assert_eq!(
            board.attack(0, 0, 0, 1).unwrap_err(),
            BoardError::EmptyTile { x: 0, y: 1 }
        );
        assert_eq!(
            board.attack(1, 1, 0, 0).unwrap_err(),
            BoardError::EmptyTile { x: 1, y: 1 }
        );
    }

    #[test]
    fn attack_validates_coordinates_before_touching_state() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        assert!(matches!(
            board.attack(0, 0, 9, 9).unwrap_err(),
            BoardError::OutOfRange { .. }
        ));
        assert_eq!(board.get(0, 0).unwrap().creature().unwrap().energy(), 4);
    }

    #[test]
    fn building_attack_never_draws_a_counter() {
        let mut board = Board::open(4, 4).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        board
            .set_building(0, 1, Building::new(50, 10, 1, 1))
            .unwrap();

        let first = board.attack_building(0, 0, 0, 1).unwrap();
        assert_eq!(first.attack_damage, 30);
        assert_eq!(first.defend_damage, 0);
        assert_eq!(board.get(0, 1).unwrap().building().unwrap().health(), 20);

        // Second swing destroys it.
        let second = board.attack_building(0, 0, 0, 1).unwrap();
        assert!(second.occurred);
        assert!(board.get(0, 1).unwrap().building().is_none());
    }

    #[test]
    fn tile_distance_matches_manhattan_and_is_symmetric() {
        let board = Board::open(8, 8).unwrap();
        assert_eq!(board.tile_distance(0, 0, 3, 4).unwrap(), 7);
        assert_eq!(
            board.tile_distance(0, 0, 3, 4).unwrap(),
            board.tile_distance(3, 4, 0, 0).unwrap()
        );
        assert_eq!(board.tile_distance(5, 5, 5, 5).unwrap(), 0);
        assert!(matches!(
            board.tile_distance(0, 0, 8, 0).unwrap_err(),
            BoardError::OutOfRange { .. }
        ));
    }

    #[test]
    fn set_creature_releases_the_previous_occupant() {
        let mut board = Board::open(2, 2).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        let released = board.set_creature(0, 0, ranged_unit(1)).unwrap();
        assert_eq!(released.unwrap().race(), Race::Human);
        assert_eq!(board.creature_count(), 1);
    }

    #[test]
    fn take_creature_clears_tile_and_index() {
        let mut board = Board::open(2, 2).unwrap();
        board.set_creature(1, 1, melee_unit(0)).unwrap();
        assert!(board.take_creature(1, 1).unwrap().is_some());
        assert!(board.take_creature(1, 1).unwrap().is_none());
        assert_eq!(board.creature_count(), 0);
        assert_eq!(board.creature_count(), occupied_tile_count(&board));
    }

    #[test]
    fn set_direction_is_a_checked_no_op() {
        let mut board = Board::open(2, 2).unwrap();
        assert!(!board.set_direction(0, 0, 2).unwrap());
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        assert!(!board.set_direction(0, 0, 7).unwrap());
        assert!(board.set_direction(0, 0, 2).unwrap());
        assert_eq!(
            board.get(0, 0).unwrap().creature().unwrap().direction(),
            Direction::South
        );
        assert!(matches!(
            board.set_direction(9, 0, 0).unwrap_err(),
            BoardError::OutOfRange { .. }
        ));
    }

    #[test]
    fn reachable_tiles_respect_energy_and_obstacles() {
        let mut board = Board::open(5, 5).unwrap();
        board
            .set_creature(
                2,
                2,
                Creature::new(Race::Human, 100, 2, 30, 1, 2, 1, Direction::North, 0),
            )
            .unwrap();
        // A blocking creature on the northern neighbor.
        board.set_creature(2, 1, melee_unit(1)).unwrap();

        let reachable = board.reachable_tiles(2, 2).unwrap();
        // Two energy: every open tile within two steps, minus the
        // blocked northern neighbor and anything only reachable
        // through it.
        assert!(!reachable.contains(&(2, 1)));
        assert!(!reachable.contains(&(2, 2)));
        assert!(reachable.contains(&(1, 2)));
        assert!(reachable.contains(&(3, 2)));
        assert!(reachable.contains(&(2, 3)));
        assert!(reachable.contains(&(0, 2)));
        assert!(reachable.contains(&(2, 4)));
        // (2, 0) sits behind the blocker: distance 2 through it, 4 around.
        assert!(!reachable.contains(&(2, 0)));
    }

    #[test]
    fn reachable_tiles_empty_when_out_of_energy() {
        let mut board = Board::open(3, 3).unwrap();
        let mut unit = melee_unit(0);
        unit.use_all_energy();
        board.set_creature(1, 1, unit).unwrap();
        assert!(board.reachable_tiles(1, 1).unwrap().is_empty());
    }

    #[test]
    fn attackable_tiles_form_a_clipped_diamond() {
        let mut board = Board::open(5, 5).unwrap();
        board.set_creature(0, 0, melee_unit(0)).unwrap();
        let melee_reach = board.attackable_tiles(0, 0).unwrap();
        assert_eq!(melee_reach, vec![(0, 1), (1, 0)]);

        board.set_creature(2, 2, ranged_unit(0)).unwrap();
        // Manhattan diamond of radius 3 holds 24 tiles; 4 fall off
        // this 5x5 board.
        let ranged_reach = board.attackable_tiles(2, 2).unwrap();
        assert_eq!(ranged_reach.len(), 20);
        assert!(ranged_reach.contains(&(2, 0)));
        assert!(ranged_reach.contains(&(4, 3)));
        assert!(!ranged_reach.contains(&(2, 2)));
    }
}
