use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::MOVE_ANIMATION_SPEED;

/// Cardinal movement direction on the board.
///
/// North decreases y, South increases y, West decreases x and East
/// increases x. The numeric codes are what travels over the wire and
/// inside intent strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Wire code for this direction.
    pub fn code(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Parses a wire code. Anything outside 0..=3 is rejected.
    pub fn from_code(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::North),
            1 => Some(Direction::East),
            2 => Some(Direction::South),
            3 => Some(Direction::West),
            _ => None,
        }
    }

    /// The coordinate one step away, or None when the step would leave
    /// the low edge of the grid. Upper bounds are the board's concern.
    pub fn step(self, x: u32, y: u32) -> Option<(u32, u32)> {
        match self {
            Direction::North => y.checked_sub(1).map(|ny| (x, ny)),
            Direction::South => Some((x, y + 1)),
            Direction::West => x.checked_sub(1).map(|nx| (nx, y)),
            Direction::East => Some((x + 1, y)),
        }
    }

    /// Direction of travel between two adjacent coordinates, if they
    /// are exactly one cardinal step apart.
    pub fn between(from: (u32, u32), to: (u32, u32)) -> Option<Direction> {
        let (fx, fy) = from;
        let (tx, ty) = to;
        if fx == tx && ty + 1 == fy {
            Some(Direction::North)
        } else if fx == tx && fy + 1 == ty {
            Some(Direction::South)
        } else if fy == ty && tx + 1 == fx {
            Some(Direction::West)
        } else if fy == ty && fx + 1 == tx {
            Some(Direction::East)
        } else {
            None
        }
    }
}

/// Creature type tag, mostly cosmetic for now but carried on the wire
/// so viewers can pick a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Orc,
}

impl Race {
    pub fn code(self) -> u8 {
        match self {
            Race::Human => 0,
            Race::Elf => 1,
            Race::Dwarf => 2,
            Race::Orc => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Race> {
        match code {
            0 => Some(Race::Human),
            1 => Some(Race::Elf),
            2 => Some(Race::Dwarf),
            3 => Some(Race::Orc),
            _ => None,
        }
    }
}

/// A combat unit living on a single tile.
///
/// Health and energy are clamped pools: health never leaves
/// [0, max_health] and energy never leaves [0, max_energy]. A creature
/// whose health reaches 0 must be removed from its tile by the board;
/// it is never left in place at 0 health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    race: Race,
    max_health: u32,
    health: u32,
    max_energy: u32,
    energy: u32,
    attack: u32,
    range: u32,
    vision: u32,
    cost: u32,
    direction: Direction,
    controller: u32,
    /// Pending movement steps, front first. Pushed by the player layer
    /// when a path is issued and drained one step at a time.
    pub directions: VecDeque<Direction>,
    offset: f32,
}

impl Creature {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        race: Race,
        max_health: u32,
        max_energy: u32,
        attack: u32,
        range: u32,
        vision: u32,
        cost: u32,
        direction: Direction,
        controller: u32,
    ) -> Self {
        Self {
            race,
            max_health,
            health: max_health,
            max_energy,
            energy: max_energy,
            attack,
            range,
            vision,
            cost,
            direction,
            controller,
            directions: VecDeque::new(),
            offset: 0.0,
        }
    }

    pub fn race(&self) -> Race {
        self.race
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_energy(&self) -> u32 {
        self.max_energy
    }

    pub fn energy(&self) -> u32 {
        self.energy
    }

    pub fn attack(&self) -> u32 {
        self.attack
    }

    pub fn range(&self) -> u32 {
        self.range
    }

    pub fn vision(&self) -> u32 {
        self.vision
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn controller(&self) -> u32 {
        self.controller
    }

    /// A unit with range 1 (or 0) fights in melee; anything longer is
    /// a ranged unit and never takes part in counterattacks.
    pub fn melee(&self) -> bool {
        self.range <= 1
    }

    /// Applies damage and reports whether the creature died. Health
    /// saturates at 0 rather than wrapping.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        self.health = self.health.saturating_sub(damage);
        self.health == 0
    }

    /// Spends movement energy, one point per step.
    pub fn decrement_energy(&mut self, amount: u32) {
        self.energy = self.energy.saturating_sub(amount);
    }

    /// Attacking always drains the full pool, melee or ranged.
    pub fn use_all_energy(&mut self) {
        self.energy = 0;
    }

    /// Start-of-turn reset back to the full pool.
    pub fn refresh_energy(&mut self) {
        self.energy = self.max_energy;
    }

    /// Progress of the in-flight step animation, 0.0 when idle and
    /// approaching 1.0 as the step completes. Consumed by viewers via
    /// the offset payload.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// True while a step animation is in flight.
    pub fn mid_step(&self) -> bool {
        self.offset > 0.0
    }

    /// Begins a step animation, counting the current frame's time.
    pub fn begin_step(&mut self, dt: f32) {
        self.offset = (MOVE_ANIMATION_SPEED * dt).min(1.0).max(f32::MIN_POSITIVE);
    }

    /// Advances an in-flight step animation. Returns true exactly once,
    /// on the frame the step completes; the offset then resets to idle.
    /// Does nothing when no step is in flight.
    pub fn advance_offset(&mut self, dt: f32) -> bool {
        if self.offset == 0.0 {
            return false;
        }
        self.offset += MOVE_ANIMATION_SPEED * dt;
        if self.offset >= 1.0 {
            self.offset = 0.0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn footman() -> Creature {
        Creature::new(Race::Human, 100, 4, 30, 1, 2, 1, Direction::North, 0)
    }

    fn archer() -> Creature {
        Creature::new(Race::Elf, 60, 3, 20, 3, 4, 2, Direction::South, 1)
    }

    #[test]
    fn new_creature_starts_at_full_pools() {
        let c = footman();
        assert_eq!(c.health(), c.max_health());
        assert_eq!(c.energy(), c.max_energy());
        assert!(c.directions.is_empty());
        assert_eq!(c.offset(), 0.0);
    }

    #[test]
    fn melee_classification_follows_range() {
        assert!(footman().melee());
        assert!(!archer().melee());
        let zero_range = Creature::new(Race::Orc, 10, 1, 1, 0, 1, 1, Direction::East, 0);
        assert!(zero_range.melee());
    }

    #[test]
    fn take_damage_saturates_at_zero() {
        let mut c = footman();
        assert!(!c.take_damage(99));
        assert_eq!(c.health(), 1);
        assert!(c.take_damage(50));
        assert_eq!(c.health(), 0);
    }

    #[test]
    fn exact_lethal_damage_kills() {
        let mut c = footman();
        assert!(c.take_damage(100));
        assert_eq!(c.health(), 0);
    }

    #[test]
    fn energy_spend_and_refresh() {
        let mut c = footman();
        c.decrement_energy(3);
        assert_eq!(c.energy(), 1);
        c.decrement_energy(5);
        assert_eq!(c.energy(), 0);
        c.refresh_energy();
        assert_eq!(c.energy(), 4);
        c.use_all_energy();
        assert_eq!(c.energy(), 0);
    }

    #[test]
    fn step_animation_completes_once() {
        let mut c = footman();
        assert!(!c.advance_offset(0.1), "idle creature must not animate");

        c.begin_step(0.1);
        assert!(c.mid_step());

        let mut completions = 0;
        for _ in 0..20 {
            if c.advance_offset(0.1) {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert_approx_eq!(c.offset(), 0.0, f32::EPSILON);
    }

    #[test]
    fn direction_codes_roundtrip() {
        for code in 0..4u8 {
            let dir = Direction::from_code(code).unwrap();
            assert_eq!(dir.code(), code);
        }
        assert_eq!(Direction::from_code(4), None);
    }

    #[test]
    fn direction_between_adjacent_pairs() {
        assert_eq!(Direction::between((2, 2), (2, 1)), Some(Direction::North));
        assert_eq!(Direction::between((2, 2), (2, 3)), Some(Direction::South));
        assert_eq!(Direction::between((2, 2), (1, 2)), Some(Direction::West));
        assert_eq!(Direction::between((2, 2), (3, 2)), Some(Direction::East));
        assert_eq!(Direction::between((2, 2), (3, 3)), None);
        assert_eq!(Direction::between((2, 2), (2, 2)), None);
    }

    #[test]
    fn step_refuses_to_leave_low_edge() {
        assert_eq!(Direction::North.step(0, 0), None);
        assert_eq!(Direction::West.step(0, 5), None);
        assert_eq!(Direction::South.step(0, 0), Some((0, 1)));
        assert_eq!(Direction::East.step(0, 0), Some((1, 0)));
    }
}
