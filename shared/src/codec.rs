//! Text codec for the replication protocol: every payload is a
//! comma-joined numeric list, one payload per game-data category, sent
//! as raw strings over the stream socket. The handshake acknowledgment
//! literals live here too so both ends agree on the lock-step sequence.

use thiserror::Error;

use crate::board::Board;
use crate::creature::{Direction, Race};
use crate::tile::{Terrain, TileColor};

/// Acknowledgment sent by a client after the initial width/height
/// payload.
pub const ACK_INITIAL: &str = "initialDataReceived";
pub const ACK_TERRAIN: &str = "terrainDataReceived";
pub const ACK_CREATURE: &str = "creatureDataReceived";
pub const ACK_COLOR: &str = "colorDataReceived";
pub const ACK_DAMAGE: &str = "damageDataReceived";
pub const ACK_OFFSET: &str = "offsetDataReceived";
pub const ACK_BUILDING: &str = "buildingDataReceived";

/// Broadcast once every handshake has finished, announcing the match.
pub const GAME_START: &str = "gameStart";
/// Expected from every client in reply to [`GAME_START`].
pub const READY_MESSAGE: &str = "readyForGame";

/// Prefix of a steady-state frame; the six payloads follow, separated
/// by [`FRAME_DELIMITER`].
pub const STATE_PREFIX: &str = "state";
pub const FRAME_DELIMITER: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload field is not a number: {0:?}")]
    BadNumber(String),
    #[error("payload truncated: expected {expected} fields, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("unknown {what} code {code}")]
    UnknownCode { what: &'static str, code: u32 },
    #[error("malformed frame: {0}")]
    BadFrame(String),
}

/// One creature as it appears on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatureRecord {
    pub x: u32,
    pub y: u32,
    pub race: Race,
    pub max_health: u32,
    pub health: u32,
    pub max_energy: u32,
    pub energy: u32,
    pub attack: u32,
    pub range: u32,
    pub vision: u32,
    pub controller: u32,
    pub direction: Direction,
}

const CREATURE_FIELDS: usize = 12;

/// One building as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingRecord {
    pub x: u32,
    pub y: u32,
    pub max_health: u32,
    pub health: u32,
    pub controller: u32,
}

const BUILDING_FIELDS: usize = 5;

/// `"<width>,<height>"`, the very first handshake payload. The wire
/// protocol describes a rectangular board; the height sent is that of
/// the first column.
pub fn initial_payload(board: &Board) -> String {
    format!("{},{}", board.width(), board.height(0).unwrap_or(0))
}

/// Terrain codes for every tile, column-major.
pub fn terrain_payload(board: &Board) -> String {
    join(board.positions().map(|(x, y)| {
        board
            .get(x, y)
            .map(|tile| tile.terrain().code() as u32)
            .unwrap_or(0)
    }))
}

/// Count-prefixed creature records.
pub fn creature_payload(board: &Board) -> String {
    let mut fields: Vec<String> = vec![board.creature_count().to_string()];
    for (x, y) in board.creature_positions() {
        let Ok(tile) = board.get(x, y) else { continue };
        let Some(c) = tile.creature() else { continue };
        fields.extend([
            x.to_string(),
            y.to_string(),
            (c.race().code() as u32).to_string(),
            c.max_health().to_string(),
            c.health().to_string(),
            c.max_energy().to_string(),
            c.energy().to_string(),
            c.attack().to_string(),
            c.range().to_string(),
            c.vision().to_string(),
            c.controller().to_string(),
            (c.direction().code() as u32).to_string(),
        ]);
    }
    fields.join(",")
}

/// Display tint codes for every tile, column-major.
pub fn color_payload(board: &Board) -> String {
    join(board.positions().map(|(x, y)| {
        board
            .get(x, y)
            .map(|tile| tile.color().code() as u32)
            .unwrap_or(0)
    }))
}

/// Last-combat damage values for every tile, column-major.
pub fn damage_payload(board: &Board) -> String {
    join(
        board
            .positions()
            .map(|(x, y)| board.get(x, y).map(|tile| tile.damage()).unwrap_or(0)),
    )
}

/// Step-animation offsets for every tile, column-major, zero where no
/// creature is mid-step.
pub fn offset_payload(board: &Board) -> String {
    board
        .positions()
        .map(|(x, y)| {
            let offset = board
                .get(x, y)
                .ok()
                .and_then(|tile| tile.creature())
                .map(|c| c.offset())
                .unwrap_or(0.0);
            format!("{:.3}", offset)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Count-prefixed building records.
pub fn building_payload(board: &Board) -> String {
    let mut records = Vec::new();
    for (x, y) in board.positions() {
        let Ok(tile) = board.get(x, y) else { continue };
        if let Some(b) = tile.building() {
            records.push((x, y, b.max_health(), b.health(), b.controller()));
        }
    }
    let mut fields: Vec<String> = vec![records.len().to_string()];
    for (x, y, max_health, health, controller) in records {
        fields.extend([
            x.to_string(),
            y.to_string(),
            max_health.to_string(),
            health.to_string(),
            controller.to_string(),
        ]);
    }
    fields.join(",")
}

/// One steady-state frame carrying all six payloads.
pub fn state_frame(board: &Board) -> String {
    [
        STATE_PREFIX.to_string(),
        terrain_payload(board),
        creature_payload(board),
        color_payload(board),
        damage_payload(board),
        offset_payload(board),
        building_payload(board),
    ]
    .join(&FRAME_DELIMITER.to_string())
}

/// Splits a steady-state frame back into its six payloads.
pub fn split_state_frame(frame: &str) -> Result<[&str; 6], CodecError> {
    let mut parts = frame.split(FRAME_DELIMITER);
    if parts.next() != Some(STATE_PREFIX) {
        return Err(CodecError::BadFrame(frame.chars().take(32).collect()));
    }
    let collected: Vec<&str> = parts.collect();
    collected
        .try_into()
        .map_err(|_| CodecError::BadFrame(frame.chars().take(32).collect()))
}

pub fn parse_initial(payload: &str) -> Result<(u32, u32), CodecError> {
    let fields = numbers(payload)?;
    if fields.len() < 2 {
        return Err(CodecError::Truncated {
            expected: 2,
            found: fields.len(),
        });
    }
    Ok((fields[0], fields[1]))
}

pub fn parse_terrain(payload: &str, width: u32, height: u32) -> Result<Vec<Vec<Terrain>>, CodecError> {
    let codes = grid(payload, width, height)?;
    codes
        .into_iter()
        .map(|column| {
            column
                .into_iter()
                .map(|code| {
                    Terrain::from_code(code as u8).ok_or(CodecError::UnknownCode {
                        what: "terrain",
                        code,
                    })
                })
                .collect()
        })
        .collect()
}

pub fn parse_colors(payload: &str, width: u32, height: u32) -> Result<Vec<Vec<TileColor>>, CodecError> {
    let codes = grid(payload, width, height)?;
    codes
        .into_iter()
        .map(|column| {
            column
                .into_iter()
                .map(|code| {
                    TileColor::from_code(code as u8).ok_or(CodecError::UnknownCode {
                        what: "color",
                        code,
                    })
                })
                .collect()
        })
        .collect()
}

pub fn parse_damage(payload: &str, width: u32, height: u32) -> Result<Vec<Vec<u32>>, CodecError> {
    grid(payload, width, height)
}

pub fn parse_offsets(payload: &str, width: u32, height: u32) -> Result<Vec<Vec<f32>>, CodecError> {
    let fields: Vec<&str> = payload.split(',').collect();
    let expected = (width * height) as usize;
    if fields.len() != expected {
        return Err(CodecError::Truncated {
            expected,
            found: fields.len(),
        });
    }
    let mut columns = Vec::with_capacity(width as usize);
    let mut iter = fields.into_iter();
    for _ in 0..width {
        let mut column = Vec::with_capacity(height as usize);
        for _ in 0..height {
            let field = iter.next().unwrap_or("");
            column.push(
                field
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| CodecError::BadNumber(field.to_string()))?,
            );
        }
        columns.push(column);
    }
    Ok(columns)
}

pub fn parse_creatures(payload: &str) -> Result<Vec<CreatureRecord>, CodecError> {
    let fields = numbers(payload)?;
    let count = *fields.first().ok_or(CodecError::Truncated {
        expected: 1,
        found: 0,
    })? as usize;
    let expected = 1 + count * CREATURE_FIELDS;
    if fields.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            found: fields.len(),
        });
    }

    let mut records = Vec::with_capacity(count);
    for chunk in fields[1..expected].chunks_exact(CREATURE_FIELDS) {
        records.push(CreatureRecord {
            x: chunk[0],
            y: chunk[1],
            race: Race::from_code(chunk[2] as u8).ok_or(CodecError::UnknownCode {
                what: "race",
                code: chunk[2],
            })?,
            max_health: chunk[3],
            health: chunk[4],
            max_energy: chunk[5],
            energy: chunk[6],
            attack: chunk[7],
            range: chunk[8],
            vision: chunk[9],
            controller: chunk[10],
            direction: Direction::from_code(chunk[11] as u8).ok_or(CodecError::UnknownCode {
                what: "direction",
                code: chunk[11],
            })?,
        });
    }
    Ok(records)
}

pub fn parse_buildings(payload: &str) -> Result<Vec<BuildingRecord>, CodecError> {
    let fields = numbers(payload)?;
    let count = *fields.first().ok_or(CodecError::Truncated {
        expected: 1,
        found: 0,
    })? as usize;
    let expected = 1 + count * BUILDING_FIELDS;
    if fields.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            found: fields.len(),
        });
    }

    let mut records = Vec::with_capacity(count);
    for chunk in fields[1..expected].chunks_exact(BUILDING_FIELDS) {
        records.push(BuildingRecord {
            x: chunk[0],
            y: chunk[1],
            max_health: chunk[2],
            health: chunk[3],
            controller: chunk[4],
        });
    }
    Ok(records)
}

fn join(values: impl Iterator<Item = u32>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn numbers(payload: &str) -> Result<Vec<u32>, CodecError> {
    payload
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<u32>()
                .map_err(|_| CodecError::BadNumber(field.to_string()))
        })
        .collect()
}

fn grid(payload: &str, width: u32, height: u32) -> Result<Vec<Vec<u32>>, CodecError> {
    let fields = numbers(payload)?;
    let expected = (width * height) as usize;
    if fields.len() != expected {
        return Err(CodecError::Truncated {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields
        .chunks_exact(height as usize)
        .map(|chunk| chunk.to_vec())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::Creature;
    use crate::tile::Building;

    fn sample_board() -> Board {
        let mut board = Board::open(3, 2).unwrap();
        board
            .set_creature(
                1,
                0,
                Creature::new(Race::Orc, 80, 3, 25, 2, 2, 2, Direction::East, 1),
            )
            .unwrap();
        board
            .set_building(2, 1, Building::new(150, 20, 1, 0))
            .unwrap();
        board.set_color(0, 1, TileColor::Red).unwrap();
        board.set_damage(1, 0, 17).unwrap();
        board
    }

    #[test]
    fn initial_payload_carries_dimensions() {
        let board = sample_board();
        assert_eq!(initial_payload(&board), "3,2");
        assert_eq!(parse_initial("3,2").unwrap(), (3, 2));
    }

    #[test]
    fn terrain_roundtrip() {
        let board = sample_board();
        let payload = terrain_payload(&board);
        assert_eq!(payload, "0,0,0,0,0,0");
        let parsed = parse_terrain(&payload, 3, 2).unwrap();
        assert_eq!(parsed[0][0], Terrain::Open);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2].len(), 2);
    }

    #[test]
    fn creature_roundtrip() {
        let board = sample_board();
        let payload = creature_payload(&board);
        let records = parse_creatures(&payload).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!((record.x, record.y), (1, 0));
        assert_eq!(record.race, Race::Orc);
        assert_eq!(record.health, 80);
        assert_eq!(record.energy, 3);
        assert_eq!(record.controller, 1);
        assert_eq!(record.direction, Direction::East);
    }

    #[test]
    fn color_and_damage_roundtrip() {
        let board = sample_board();
        let colors = parse_colors(&color_payload(&board), 3, 2).unwrap();
        assert_eq!(colors[0][1], TileColor::Red);
        assert_eq!(colors[1][0], TileColor::White);

        let damage = parse_damage(&damage_payload(&board), 3, 2).unwrap();
        assert_eq!(damage[1][0], 17);
        assert_eq!(damage[0][0], 0);
    }

    #[test]
    fn offsets_serialize_with_fixed_precision() {
        let board = sample_board();
        let payload = offset_payload(&board);
        assert_eq!(payload, "0.000,0.000,0.000,0.000,0.000,0.000");
        let parsed = parse_offsets(&payload, 3, 2).unwrap();
        assert_eq!(parsed[1][0], 0.0);
    }

    #[test]
    fn building_roundtrip() {
        let board = sample_board();
        let records = parse_buildings(&building_payload(&board)).unwrap();
        assert_eq!(
            records,
            vec![BuildingRecord {
                x: 2,
                y: 1,
                max_health: 150,
                health: 150,
                controller: 0,
            }]
        );
    }

    #[test]
    fn empty_rosters_are_just_a_zero_count() {
        let board = Board::open(2, 2).unwrap();
        assert_eq!(creature_payload(&board), "0");
        assert_eq!(building_payload(&board), "0");
        assert!(parse_creatures("0").unwrap().is_empty());
        assert!(parse_buildings("0").unwrap().is_empty());
    }

    #[test]
    fn state_frame_roundtrips_through_split() {
        let board = sample_board();
        let frame = state_frame(&board);
        let [terrain, creatures, colors, damage, offsets, buildings] =
            split_state_frame(&frame).unwrap();
        assert_eq!(terrain, terrain_payload(&board));
        assert_eq!(creatures, creature_payload(&board));
        assert_eq!(colors, color_payload(&board));
        assert_eq!(damage, damage_payload(&board));
        assert_eq!(offsets, offset_payload(&board));
        assert_eq!(buildings, building_payload(&board));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert_eq!(
            parse_initial("width,2").unwrap_err(),
            CodecError::BadNumber("width".to_string())
        );
        assert!(matches!(
            parse_terrain("0,0,0", 2, 2).unwrap_err(),
            CodecError::Truncated { .. }
        ));
        assert!(matches!(
            parse_creatures("1,0,0").unwrap_err(),
            CodecError::Truncated { .. }
        ));
        assert!(matches!(
            parse_terrain("0,9,0,0", 2, 2).unwrap_err(),
            CodecError::UnknownCode { what: "terrain", .. }
        ));
        assert!(matches!(
            split_state_frame("nonsense|1,2").unwrap_err(),
            CodecError::BadFrame(_)
        ));
    }
}
