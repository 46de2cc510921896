//! Scenario files: a JSON description of the starting board (terrain
//! rows, creatures, buildings) loaded at server start, plus a random
//! skirmish map for when no file is given.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use shared::board::{Board, BoardError};
use shared::creature::{Creature, Direction, Race};
use shared::tile::{Building, Terrain, Tile};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse scenario file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("terrain row {row} has {found} columns, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown terrain code {code} at ({x}, {y})")]
    UnknownTerrain { code: u8, x: u32, y: u32 },
    #[error("spawn at ({x}, {y}) is off the board or blocked")]
    BadSpawn { x: u32, y: u32 },
}

/// One creature placed at match start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureSpawn {
    pub x: u32,
    pub y: u32,
    pub race: u8,
    pub max_health: u32,
    pub max_energy: u32,
    pub attack: u32,
    pub range: u32,
    pub vision: u32,
    pub cost: u32,
    pub seat: u32,
}

/// One building placed at match start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSpawn {
    pub x: u32,
    pub y: u32,
    pub max_health: u32,
    pub cost: u32,
    pub tier: u32,
    pub seat: u32,
}

/// The full starting setup for a match. Terrain is given row by row
/// (row 0 is the northern edge) so files read the way the board looks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub terrain: Vec<Vec<u8>>,
    #[serde(default)]
    pub creatures: Vec<CreatureSpawn>,
    #[serde(default)]
    pub buildings: Vec<BuildingSpawn>,
}

impl Scenario {
    /// Loads a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// A generated skirmish map: scattered mountains and lakes, one
    /// base per seat in opposite corners with a starting escort.
    pub fn skirmish(width: u32, height: u32, seats: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut terrain = vec![vec![Terrain::Open.code(); width as usize]; height as usize];
        for row in terrain.iter_mut() {
            for cell in row.iter_mut() {
                *cell = match rng.gen_range(0..10) {
                    0 => Terrain::Mountain.code(),
                    1 => Terrain::Water.code(),
                    2 => Terrain::Farmland.code(),
                    _ => Terrain::Open.code(),
                };
            }
        }

        // Base corners, kept clear of generated obstacles.
        let corners = [
            (1u32, 1u32),
            (width.saturating_sub(2), height.saturating_sub(2)),
            (width.saturating_sub(2), 1),
            (1, height.saturating_sub(2)),
        ];
        let mut creatures = Vec::new();
        let mut buildings = Vec::new();
        for seat_index in 0..seats.min(corners.len() as u32) {
            let (bx, by) = corners[seat_index as usize];
            let seat = seat_index + 1;
            for dy in 0..2u32 {
                for dx in 0..2u32 {
                    let (cx, cy) = (bx + dx, by + dy);
                    if cx < width && cy < height {
                        terrain[cy as usize][cx as usize] = Terrain::Open.code();
                    }
                }
            }
            buildings.push(BuildingSpawn {
                x: bx,
                y: by,
                max_health: 400,
                cost: 40,
                tier: 1,
                seat,
            });
            creatures.push(CreatureSpawn {
                x: bx + 1,
                y: by,
                race: Race::Human.code(),
                max_health: 100,
                max_energy: 4,
                attack: 30,
                range: 1,
                vision: 2,
                cost: 1,
                seat,
            });
            creatures.push(CreatureSpawn {
                x: bx,
                y: by + 1,
                race: Race::Elf.code(),
                max_health: 60,
                max_energy: 3,
                attack: 20,
                range: 3,
                vision: 4,
                cost: 2,
                seat,
            });
        }

        Self {
            width,
            height,
            terrain,
            creatures,
            buildings,
        }
    }

    /// Builds the starting board this scenario describes.
    pub fn build_board(&self) -> Result<Board, ScenarioError> {
        let mut columns = Vec::with_capacity(self.width as usize);
        for x in 0..self.width {
            let mut column = Vec::with_capacity(self.height as usize);
            for y in 0..self.height {
                let code = match self.terrain.get(y as usize) {
                    Some(row) => {
                        if row.len() != self.width as usize {
                            return Err(ScenarioError::RowWidth {
                                row: y as usize,
                                found: row.len(),
                                expected: self.width as usize,
                            });
                        }
                        row[x as usize]
                    }
                    // Missing rows default to open ground.
                    None => Terrain::Open.code(),
                };
                let terrain = Terrain::from_code(code)
                    .ok_or(ScenarioError::UnknownTerrain { code, x, y })?;
                column.push(Tile::new(terrain, x, y));
            }
            columns.push(column);
        }
        let mut board = Board::new(columns)?;

        for spawn in &self.buildings {
            let valid = board
                .get(spawn.x, spawn.y)
                .map(|tile| tile.terrain().walkable() && tile.building().is_none())
                .unwrap_or(false);
            if !valid {
                return Err(ScenarioError::BadSpawn {
                    x: spawn.x,
                    y: spawn.y,
                });
            }
            board.set_building(
                spawn.x,
                spawn.y,
                Building::new(spawn.max_health, spawn.cost, spawn.tier, spawn.seat),
            )?;
        }

        for spawn in &self.creatures {
            let race = Race::from_code(spawn.race).unwrap_or(Race::Human);
            let creature = Creature::new(
                race,
                spawn.max_health,
                spawn.max_energy,
                spawn.attack,
                spawn.range,
                spawn.vision,
                spawn.cost,
                Direction::North,
                spawn.seat,
            );
            let valid = board
                .get(spawn.x, spawn.y)
                .map(|tile| tile.passable_by(&creature))
                .unwrap_or(false);
            if !valid {
                return Err(ScenarioError::BadSpawn {
                    x: spawn.x,
                    y: spawn.y,
                });
            }
            board.set_creature(spawn.x, spawn.y, creature)?;
        }

        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skirmish_builds_a_playable_board() {
        let scenario = Scenario::skirmish(12, 12, 2, 42);
        let board = scenario.build_board().unwrap();
        assert_eq!(board.width(), 12);
        assert_eq!(board.height(0).unwrap(), 12);
        // Two seats, two units each.
        assert_eq!(board.creature_count(), 4);
        assert!(board.get(1, 1).unwrap().building().is_some());
        assert!(board.get(10, 10).unwrap().building().is_some());
    }

    #[test]
    fn skirmish_is_deterministic_for_a_seed() {
        let a = Scenario::skirmish(10, 10, 2, 7);
        let b = Scenario::skirmish(10, 10, 2, 7);
        assert_eq!(a.terrain, b.terrain);
    }

    #[test]
    fn json_roundtrip() {
        let scenario = Scenario::skirmish(8, 8, 2, 3);
        let text = serde_json::to_string(&scenario).unwrap();
        let parsed: Scenario = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.width, 8);
        assert_eq!(parsed.creatures.len(), scenario.creatures.len());
    }

    #[test]
    fn bad_terrain_codes_are_rejected() {
        let scenario = Scenario {
            width: 2,
            height: 1,
            terrain: vec![vec![0, 9]],
            creatures: Vec::new(),
            buildings: Vec::new(),
        };
        assert!(matches!(
            scenario.build_board().unwrap_err(),
            ScenarioError::UnknownTerrain { code: 9, .. }
        ));
    }

    #[test]
    fn ragged_terrain_rows_are_rejected() {
        let scenario = Scenario {
            width: 3,
            height: 2,
            terrain: vec![vec![0, 0, 0], vec![0, 0]],
            creatures: Vec::new(),
            buildings: Vec::new(),
        };
        assert!(matches!(
            scenario.build_board().unwrap_err(),
            ScenarioError::RowWidth { row: 1, .. }
        ));
    }

    #[test]
    fn blocked_spawns_are_rejected() {
        let scenario = Scenario {
            width: 2,
            height: 2,
            terrain: vec![vec![1, 0], vec![0, 0]],
            creatures: vec![CreatureSpawn {
                x: 0,
                y: 0,
                race: 0,
                max_health: 10,
                max_energy: 2,
                attack: 5,
                range: 1,
                vision: 2,
                cost: 1,
                seat: 1,
            }],
            buildings: Vec::new(),
        };
        assert!(matches!(
            scenario.build_board().unwrap_err(),
            ScenarioError::BadSpawn { x: 0, y: 0 }
        ));
    }
}
