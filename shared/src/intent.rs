//! Client-to-server commands, carried as delimited strings. Malformed
//! intents parse to an error and are dropped by the server without
//! touching the board.

use crate::codec::CodecError;
use crate::creature::{Creature, Direction, Race};

/// A discrete command a viewer sends back into the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Select a tile; the sentinel pairs are passed through verbatim.
    SelectTile { x: i32, y: i32 },
    /// Click on a tile, resolving whatever its overlay offers.
    TileAction { x: u32, y: u32 },
    /// Move the hover highlight.
    Hover { x: i32, y: i32 },
    /// Commission a creature from the seat's building.
    MakeCreature {
        race: Race,
        max_health: u32,
        max_energy: u32,
        attack: u32,
        ranged: bool,
        range: u32,
        cost: u32,
        direction: Direction,
    },
    /// Found a building on the currently selected tile.
    MakeBuilding { cost: u32, tier: u32 },
    /// Finish the seat's turn, refreshing its creatures' energy.
    EndTurn,
}

impl Intent {
    /// Encodes the intent as its wire string.
    pub fn encode(&self) -> String {
        match self {
            Intent::SelectTile { x, y } => format!("select_tile,{},{}", x, y),
            Intent::TileAction { x, y } => format!("tile_action,{},{}", x, y),
            Intent::Hover { x, y } => format!("hover,{},{}", x, y),
            Intent::MakeCreature {
                race,
                max_health,
                max_energy,
                attack,
                ranged,
                range,
                cost,
                direction,
            } => format!(
                "make_creature,{},{},{},{},{},{},{},{}",
                race.code(),
                max_health,
                max_energy,
                attack,
                u8::from(*ranged),
                range,
                cost,
                direction.code()
            ),
            Intent::MakeBuilding { cost, tier } => format!("make_building,{},{}", cost, tier),
            Intent::EndTurn => "end_turn".to_string(),
        }
    }

    /// Parses a wire string back into an intent.
    pub fn parse(message: &str) -> Result<Intent, CodecError> {
        let fields: Vec<&str> = message.trim().split(',').collect();
        let tag = *fields.first().unwrap_or(&"");
        match tag {
            "select_tile" => {
                let (x, y) = signed_pair(&fields)?;
                Ok(Intent::SelectTile { x, y })
            }
            "tile_action" => {
                let fields = unsigned_fields(&fields[1..], 2)?;
                Ok(Intent::TileAction {
                    x: fields[0],
                    y: fields[1],
                })
            }
            "hover" => {
                let (x, y) = signed_pair(&fields)?;
                Ok(Intent::Hover { x, y })
            }
            "make_creature" => {
                let args = unsigned_fields(&fields[1..], 8)?;
                let race = Race::from_code(args[0] as u8).ok_or(CodecError::UnknownCode {
                    what: "race",
                    code: args[0],
                })?;
                let direction =
                    Direction::from_code(args[7] as u8).ok_or(CodecError::UnknownCode {
                        what: "direction",
                        code: args[7],
                    })?;
                Ok(Intent::MakeCreature {
                    race,
                    max_health: args[1],
                    max_energy: args[2],
                    attack: args[3],
                    ranged: args[4] != 0,
                    range: args[5],
                    cost: args[6],
                    direction,
                })
            }
            "make_building" => {
                let args = unsigned_fields(&fields[1..], 2)?;
                Ok(Intent::MakeBuilding {
                    cost: args[0],
                    tier: args[1],
                })
            }
            "end_turn" => Ok(Intent::EndTurn),
            _ => Err(CodecError::BadFrame(message.chars().take(32).collect())),
        }
    }

    /// Builds the creature a `make_creature` intent describes, owned by
    /// the given seat. A melee request with a long range is clamped to
    /// reach 1 so the range stat and the melee flag cannot disagree.
    pub fn creature_for_seat(&self, seat: u32) -> Option<Creature> {
        let Intent::MakeCreature {
            race,
            max_health,
            max_energy,
            attack,
            ranged,
            range,
            cost,
            direction,
        } = self
        else {
            return None;
        };
        let range = if *ranged { (*range).max(2) } else { (*range).min(1) };
        Some(Creature::new(
            *race,
            *max_health,
            *max_energy,
            *attack,
            range,
            2,
            *cost,
            *direction,
            seat,
        ))
    }
}

fn signed_pair(fields: &[&str]) -> Result<(i32, i32), CodecError> {
    if fields.len() < 3 {
        return Err(CodecError::Truncated {
            expected: 3,
            found: fields.len(),
        });
    }
    let parse = |field: &str| {
        field
            .trim()
            .parse::<i32>()
            .map_err(|_| CodecError::BadNumber(field.to_string()))
    };
    Ok((parse(fields[1])?, parse(fields[2])?))
}

fn unsigned_fields(fields: &[&str], expected: usize) -> Result<Vec<u32>, CodecError> {
    if fields.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            found: fields.len(),
        });
    }
    fields[..expected]
        .iter()
        .map(|field| {
            field
                .trim()
                .parse::<u32>()
                .map_err(|_| CodecError::BadNumber(field.to_string()))
        })
        .collect()
}
