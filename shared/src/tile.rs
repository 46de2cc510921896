use serde::{Deserialize, Serialize};

use crate::creature::Creature;

/// Terrain classification for one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Open,
    Mountain,
    Water,
    Farmland,
}

impl Terrain {
    pub fn code(self) -> u8 {
        match self {
            Terrain::Open => 0,
            Terrain::Mountain => 1,
            Terrain::Water => 2,
            Terrain::Farmland => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Terrain> {
        match code {
            0 => Some(Terrain::Open),
            1 => Some(Terrain::Mountain),
            2 => Some(Terrain::Water),
            3 => Some(Terrain::Farmland),
            _ => None,
        }
    }

    /// Whether ground units can stand on this terrain at all.
    pub fn walkable(self) -> bool {
        matches!(self, Terrain::Open | Terrain::Farmland)
    }
}

/// Display tint applied to a tile, replicated to viewers in the color
/// payload. White means unaltered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileColor {
    White,
    Grey,
    Red,
    Yellow,
    Green,
    Blue,
}

impl TileColor {
    pub fn code(self) -> u8 {
        match self {
            TileColor::White => 0,
            TileColor::Grey => 1,
            TileColor::Red => 2,
            TileColor::Yellow => 3,
            TileColor::Green => 4,
            TileColor::Blue => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<TileColor> {
        match code {
            0 => Some(TileColor::White),
            1 => Some(TileColor::Grey),
            2 => Some(TileColor::Red),
            3 => Some(TileColor::Yellow),
            4 => Some(TileColor::Green),
            5 => Some(TileColor::Blue),
            _ => None,
        }
    }

    /// RGB triple in [0.0, 1.0] for display collaborators.
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            TileColor::White => (1.0, 1.0, 1.0),
            TileColor::Grey => (0.625, 0.625, 0.625),
            TileColor::Red => (1.0, 0.625, 0.625),
            TileColor::Yellow => (1.0, 1.0, 0.5),
            TileColor::Green => (0.62, 1.0, 0.625),
            TileColor::Blue => (0.625, 0.625, 1.0),
        }
    }
}

/// A production structure occupying one tile. Buildings can be
/// attacked and are removed when their health reaches 0, but they
/// never strike back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    max_health: u32,
    health: u32,
    cost: u32,
    tier: u32,
    controller: u32,
}

impl Building {
    pub fn new(max_health: u32, cost: u32, tier: u32, controller: u32) -> Self {
        Self {
            max_health,
            health: max_health,
            cost,
            tier,
            controller,
        }
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn controller(&self) -> u32 {
        self.controller
    }

    /// Applies damage and reports destruction. Health saturates at 0.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        self.health = self.health.saturating_sub(damage);
        self.health == 0
    }
}

/// One cell of the board: fixed coordinates and terrain, plus
/// exclusively-owned creature and building slots.
///
/// The creature slot has replace semantics: setting a new occupant
/// releases (returns) the previous one, so a tile can never hold two
/// creatures and a replaced creature is never silently leaked into a
/// dangling state.
#[derive(Debug, Clone)]
pub struct Tile {
    x: u32,
    y: u32,
    terrain: Terrain,
    creature: Option<Creature>,
    building: Option<Building>,
    color: TileColor,
    damage: u32,
}

impl Tile {
    pub fn new(terrain: Terrain, x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            terrain,
            creature: None,
            building: None,
            color: TileColor::White,
            damage: 0,
        }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// True iff the creature slot is filled.
    pub fn occupied(&self) -> bool {
        self.creature.is_some()
    }

    pub fn creature(&self) -> Option<&Creature> {
        self.creature.as_ref()
    }

    pub(crate) fn creature_mut(&mut self) -> Option<&mut Creature> {
        self.creature.as_mut()
    }

    /// Places a creature, returning the released previous occupant.
    pub(crate) fn set_creature(&mut self, creature: Creature) -> Option<Creature> {
        self.creature.replace(creature)
    }

    /// Empties the creature slot, returning the occupant.
    pub(crate) fn take_creature(&mut self) -> Option<Creature> {
        self.creature.take()
    }

    pub fn building(&self) -> Option<&Building> {
        self.building.as_ref()
    }

    pub(crate) fn building_mut(&mut self) -> Option<&mut Building> {
        self.building.as_mut()
    }

    pub(crate) fn set_building(&mut self, building: Building) -> Option<Building> {
        self.building.replace(building)
    }

    pub(crate) fn take_building(&mut self) -> Option<Building> {
        self.building.take()
    }

    pub fn color(&self) -> TileColor {
        self.color
    }

    pub(crate) fn set_color(&mut self, color: TileColor) {
        self.color = color;
    }

    /// Damage displayed over this tile since the last combat here, fed
    /// to viewers through the damage payload.
    pub fn damage(&self) -> u32 {
        self.damage
    }

    pub(crate) fn set_damage(&mut self, damage: u32) {
        self.damage = damage;
    }

    pub(crate) fn clear_damage(&mut self) {
        self.damage = 0;
    }

    /// Whether the given creature could stand here right now: walkable
    /// terrain, no occupant, no building.
    pub fn passable_by(&self, _creature: &Creature) -> bool {
        self.terrain.walkable() && self.creature.is_none() && self.building.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::{Direction, Race};

    fn scout() -> Creature {
        Creature::new(Race::Human, 50, 5, 10, 1, 3, 1, Direction::North, 0)
    }

    #[test]
    fn fresh_tile_is_empty() {
        let tile = Tile::new(Terrain::Open, 3, 7);
        assert_eq!(tile.x(), 3);
        assert_eq!(tile.y(), 7);
        assert!(!tile.occupied());
        assert!(tile.building().is_none());
        assert_eq!(tile.color(), TileColor::White);
    }

    #[test]
    fn occupied_tracks_creature_slot() {
        let mut tile = Tile::new(Terrain::Open, 0, 0);
        assert!(tile.set_creature(scout()).is_none());
        assert!(tile.occupied());
        assert!(tile.take_creature().is_some());
        assert!(!tile.occupied());
    }

    #[test]
    fn replacing_a_creature_releases_the_old_one() {
        let mut tile = Tile::new(Terrain::Open, 0, 0);
        tile.set_creature(scout());
        let replaced = tile.set_creature(Creature::new(
            Race::Orc,
            80,
            2,
            15,
            1,
            2,
            2,
            Direction::South,
            1,
        ));
        let released = replaced.expect("previous occupant must be handed back");
        assert_eq!(released.race(), Race::Human);
        assert_eq!(tile.creature().unwrap().race(), Race::Orc);
    }

    #[test]
    fn passability_requires_walkable_and_vacant() {
        let unit = scout();

        let open = Tile::new(Terrain::Open, 0, 0);
        assert!(open.passable_by(&unit));

        let farm = Tile::new(Terrain::Farmland, 0, 0);
        assert!(farm.passable_by(&unit));

        let mountain = Tile::new(Terrain::Mountain, 0, 0);
        assert!(!mountain.passable_by(&unit));

        let water = Tile::new(Terrain::Water, 0, 0);
        assert!(!water.passable_by(&unit));

        let mut taken = Tile::new(Terrain::Open, 0, 0);
        taken.set_creature(scout());
        assert!(!taken.passable_by(&unit));

        let mut built = Tile::new(Terrain::Open, 0, 0);
        built.set_building(Building::new(200, 10, 1, 0));
        assert!(!built.passable_by(&unit));
    }

    #[test]
    fn building_destruction_saturates() {
        let mut b = Building::new(100, 10, 1, 0);
        assert!(!b.take_damage(99));
        assert_eq!(b.health(), 1);
        assert!(b.take_damage(200));
        assert_eq!(b.health(), 0);
    }

    #[test]
    fn terrain_and_color_codes_roundtrip() {
        for code in 0..4u8 {
            assert_eq!(Terrain::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Terrain::from_code(9), None);
        for code in 0..6u8 {
            assert_eq!(TileColor::from_code(code).unwrap().code(), code);
        }
        assert_eq!(TileColor::from_code(6), None);
    }
}
