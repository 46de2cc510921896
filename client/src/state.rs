//! Local replica of the replicated board state, rebuilt from the wire
//! payloads. Read-only from the display layer's point of view; the
//! authoritative copy lives on the server.

use shared::codec::{self, BuildingRecord, CodecError, CreatureRecord};
use shared::tile::{Terrain, TileColor};

/// The six payload strings of one steady-state frame.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub terrain: String,
    pub creatures: String,
    pub colors: String,
    pub damage: String,
    pub offsets: String,
    pub buildings: String,
}

/// A viewer's copy of the board, parsed from the wire payloads.
#[derive(Debug, Clone)]
pub struct BoardView {
    width: u32,
    height: u32,
    terrain: Vec<Vec<Terrain>>,
    creatures: Vec<CreatureRecord>,
    colors: Vec<Vec<TileColor>>,
    damage: Vec<Vec<u32>>,
    offsets: Vec<Vec<f32>>,
    buildings: Vec<BuildingRecord>,
}

impl BoardView {
    /// Builds the initial replica from the handshake payloads.
    #[allow(clippy::too_many_arguments)]
    pub fn from_payloads(
        width: u32,
        height: u32,
        terrain: &str,
        creatures: &str,
        colors: &str,
        damage: &str,
        offsets: &str,
        buildings: &str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            width,
            height,
            terrain: codec::parse_terrain(terrain, width, height)?,
            creatures: codec::parse_creatures(creatures)?,
            colors: codec::parse_colors(colors, width, height)?,
            damage: codec::parse_damage(damage, width, height)?,
            offsets: codec::parse_offsets(offsets, width, height)?,
            buildings: codec::parse_buildings(buildings)?,
        })
    }

    /// Replaces the replica's contents with one steady-state frame.
    /// On a parse error the previous state is kept intact.
    pub fn apply_update(&mut self, update: &StateUpdate) -> Result<(), CodecError> {
        let next = Self::from_payloads(
            self.width,
            self.height,
            &update.terrain,
            &update.creatures,
            &update.colors,
            &update.damage,
            &update.offsets,
            &update.buildings,
        )?;
        *self = next;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    pub fn terrain_at(&self, x: u32, y: u32) -> Option<Terrain> {
        self.in_bounds(x, y)
            .then(|| self.terrain[x as usize][y as usize])
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<TileColor> {
        self.in_bounds(x, y)
            .then(|| self.colors[x as usize][y as usize])
    }

    pub fn damage_at(&self, x: u32, y: u32) -> Option<u32> {
        self.in_bounds(x, y)
            .then(|| self.damage[x as usize][y as usize])
    }

    pub fn offset_at(&self, x: u32, y: u32) -> Option<f32> {
        self.in_bounds(x, y)
            .then(|| self.offsets[x as usize][y as usize])
    }

    pub fn creatures(&self) -> &[CreatureRecord] {
        &self.creatures
    }

    pub fn creature_at(&self, x: u32, y: u32) -> Option<&CreatureRecord> {
        self.creatures.iter().find(|c| c.x == x && c.y == y)
    }

    pub fn buildings(&self) -> &[BuildingRecord] {
        &self.buildings
    }

    pub fn building_at(&self, x: u32, y: u32) -> Option<&BuildingRecord> {
        self.buildings.iter().find(|b| b.x == x && b.y == y)
    }

    /// Sum of the damage markers currently displayed, handy for
    /// spotting combat in an observer loop.
    pub fn total_displayed_damage(&self) -> u32 {
        self.damage.iter().flatten().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::board::Board;
    use shared::creature::{Creature, Direction, Race};
    use shared::tile::Building;

    fn replicated_view() -> BoardView {
        let mut board = Board::open(4, 3).unwrap();
        board
            .set_creature(
                2,
                1,
                Creature::new(Race::Elf, 60, 3, 20, 3, 4, 2, Direction::West, 2),
            )
            .unwrap();
        board
            .set_building(0, 2, Building::new(300, 40, 1, 1))
            .unwrap();
        board.set_damage(2, 1, 12).unwrap();

        BoardView::from_payloads(
            4,
            3,
            &codec::terrain_payload(&board),
            &codec::creature_payload(&board),
            &codec::color_payload(&board),
            &codec::damage_payload(&board),
            &codec::offset_payload(&board),
            &codec::building_payload(&board),
        )
        .unwrap()
    }

    #[test]
    fn replica_mirrors_the_server_board() {
        let view = replicated_view();
        assert_eq!(view.width(), 4);
        assert_eq!(view.height(), 3);
        assert_eq!(view.terrain_at(0, 0), Some(Terrain::Open));

        let creature = view.creature_at(2, 1).unwrap();
        assert_eq!(creature.race, Race::Elf);
        assert_eq!(creature.controller, 2);
        assert_eq!(creature.direction, Direction::West);
        assert!(view.creature_at(0, 0).is_none());

        let building = view.building_at(0, 2).unwrap();
        assert_eq!(building.health, 300);
        assert_eq!(view.damage_at(2, 1), Some(12));
        assert_eq!(view.total_displayed_damage(), 12);
        assert_eq!(view.offset_at(2, 1), Some(0.0));
    }

    #[test]
    fn out_of_bounds_lookups_are_none() {
        let view = replicated_view();
        assert!(view.terrain_at(4, 0).is_none());
        assert!(view.damage_at(0, 3).is_none());
    }

    #[test]
    fn apply_update_replaces_state() {
        let mut view = replicated_view();

        let mut board = Board::open(4, 3).unwrap();
        board
            .set_creature(
                0,
                0,
                Creature::new(Race::Orc, 80, 2, 15, 1, 2, 1, Direction::South, 1),
            )
            .unwrap();
        let update = StateUpdate {
            terrain: codec::terrain_payload(&board),
            creatures: codec::creature_payload(&board),
            colors: codec::color_payload(&board),
            damage: codec::damage_payload(&board),
            offsets: codec::offset_payload(&board),
            buildings: codec::building_payload(&board),
        };

        view.apply_update(&update).unwrap();
        assert!(view.creature_at(2, 1).is_none());
        assert_eq!(view.creature_at(0, 0).unwrap().race, Race::Orc);
        assert!(view.buildings().is_empty());
        assert_eq!(view.total_displayed_damage(), 0);
    }

    #[test]
    fn bad_update_keeps_the_previous_state() {
        let mut view = replicated_view();
        let update = StateUpdate {
            terrain: "not,numbers,at,all".to_string(),
            creatures: "0".to_string(),
            colors: "0".to_string(),
            damage: "0".to_string(),
            offsets: "0".to_string(),
            buildings: "0".to_string(),
        };
        assert!(view.apply_update(&update).is_err());
        assert!(view.creature_at(2, 1).is_some());
    }
}
