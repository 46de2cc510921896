//! Per-seat view and controller state: the current selection, the
//! style/hover/vision overlay, and the queued tile actions that drive
//! clicks into board mutations.

use log::debug;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

use crate::board::{Board, BoardError, CombatReport, SEARCH_ORDER};
use crate::creature::{Creature, Direction, Race};

/// Sentinel passed to [`Player::select_tile`] to clear the selection.
pub const NO_SELECTION: (i32, i32) = (-1, -1);
/// Sentinel marking that an interface element, not a tile, is selected.
pub const INTERFACE_SELECTION: (i32, i32) = (-2, -2);

/// What the seat currently has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    None,
    Interface,
    Tile(u32, u32),
}

/// Overlay classification of a tile, consumed by display collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStyle {
    Regular,
    Selected,
    Attackable,
    Reachable,
}

/// Fog-of-war state of a tile for this seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Unexplored,
    Explored,
    Visible,
}

/// Deferred action enqueued on a tile while it is highlighted, executed
/// when the tile is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAction {
    MoveCreature,
    MakeCreature,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("coordinate ({x}, {y}) is outside the tracked grid")]
    OutOfRange { x: i64, y: i64 },
    #[error("no actions queued at ({x}, {y})")]
    NoActions { x: u32, y: u32 },
    #[error("player overlay tracks an empty board")]
    EmptyBoard,
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone, Copy)]
struct Overlay {
    style: TileStyle,
    hovered: bool,
    visibility: Visibility,
}

impl Overlay {
    fn new() -> Self {
        Self {
            style: TileStyle::Regular,
            hovered: false,
            visibility: Visibility::Unexplored,
        }
    }
}

/// Fixed sight radius granted by an owned building.
const BUILDING_VISION: u32 = 2;

/// Multiplier applied to a tile's color while the cursor hovers it.
const HOVER_EFFECT: f32 = 0.75;

pub struct Player {
    seat: u32,
    selection: Selection,
    overlay: Vec<Vec<Overlay>>,
    actions: Vec<Vec<VecDeque<TileAction>>>,
}

impl Player {
    /// Creates the view state for one seat, shaped to the board's
    /// (possibly jagged) columns.
    pub fn new(board: &Board, seat: u32) -> Self {
        let mut overlay = Vec::new();
        let mut actions = Vec::new();
        for x in 0..board.width() {
            let height = board.height(x).unwrap_or(0) as usize;
            overlay.push(vec![Overlay::new(); height]);
            actions.push((0..height).map(|_| VecDeque::new()).collect());
        }
        Self {
            seat,
            selection: Selection::None,
            overlay,
            actions,
        }
    }

    pub fn seat(&self) -> u32 {
        self.seat
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The selection as a coordinate pair, using the sentinel values
    /// for the non-tile states.
    pub fn selected_tile(&self) -> (i32, i32) {
        match self.selection {
            Selection::None => NO_SELECTION,
            Selection::Interface => INTERFACE_SELECTION,
            Selection::Tile(x, y) => (x as i32, y as i32),
        }
    }

    fn tracks(&self, x: u32, y: u32) -> bool {
        (x as usize) < self.overlay.len() && (y as usize) < self.overlay[x as usize].len()
    }

    fn check(&self, x: i64, y: i64) -> Result<(u32, u32), PlayerError> {
        if x >= 0 && y >= 0 && self.tracks(x as u32, y as u32) {
            Ok((x as u32, y as u32))
        } else {
            Err(PlayerError::OutOfRange { x, y })
        }
    }

    /// Clears every tile style back to regular and drains all pending
    /// tile actions.
    pub fn reset_all_tiles(&mut self) {
        for column in &mut self.overlay {
            for overlay in column {
                overlay.style = TileStyle::Regular;
            }
        }
        for column in &mut self.actions {
            for queue in column {
                queue.clear();
            }
        }
    }

    /// Sets the current selection. The two sentinel pairs bypass board
    /// bounds checking; any other coordinate must be a real tile or the
    /// call fails and the selection is left alone. Selecting a tile
    /// that holds a creature routes through [`Self::select_creature`].
    pub fn select_tile(&mut self, board: &Board, x: i32, y: i32) -> bool {
        if (x, y) == NO_SELECTION {
            self.selection = Selection::None;
            return true;
        }
        if (x, y) == INTERFACE_SELECTION {
            self.selection = Selection::Interface;
            return true;
        }
        let Ok((x, y)) = self.check(x as i64, y as i64) else {
            return false;
        };
        let occupied = board.get(x, y).map(|tile| tile.occupied()).unwrap_or(false);
        if occupied {
            self.select_creature(board, x, y);
        } else {
            self.selection = Selection::Tile(x, y);
        }
        true
    }

    /// Directly restyles one tile. False when the coordinate is not
    /// tracked.
    pub fn set_style(&mut self, x: u32, y: u32, style: TileStyle) -> bool {
        if self.tracks(x, y) {
            self.overlay[x as usize][y as usize].style = style;
            true
        } else {
            false
        }
    }

    pub fn overlay_style(&self, x: u32, y: u32) -> Result<TileStyle, PlayerError> {
        let (x, y) = self.check(x as i64, y as i64)?;
        Ok(self.overlay[x as usize][y as usize].style)
    }

    pub fn visibility(&self, x: u32, y: u32) -> Result<Visibility, PlayerError> {
        let (x, y) = self.check(x as i64, y as i64)?;
        Ok(self.overlay[x as usize][y as usize].visibility)
    }

    /// Number of pending actions queued on one tile.
    pub fn action_queue_len(&self, x: u32, y: u32) -> Result<usize, PlayerError> {
        let (x, y) = self.check(x as i64, y as i64)?;
        Ok(self.actions[x as usize][y as usize].len())
    }

    /// Selects the creature at (x, y) and overlays its options: every
    /// reachable-and-passable tile becomes REACHABLE with a queued move
    /// action, and tiles holding opposing creatures or buildings within
    /// attack range become ATTACKABLE while the creature still has
    /// energy. Selecting a creature that is mid-path is a successful
    /// no-op so commands cannot be re-issued during movement.
    pub fn select_creature(&mut self, board: &Board, x: u32, y: u32) -> bool {
        if !self.tracks(x, y) {
            return false;
        }
        let Ok(tile) = board.get(x, y) else {
            return false;
        };
        let Some(creature) = tile.creature() else {
            return false;
        };
        if !creature.directions.is_empty() {
            return true;
        }

        self.selection = Selection::Tile(x, y);
        self.overlay[x as usize][y as usize].style = TileStyle::Selected;

        for (rx, ry) in board.reachable_tiles(x, y).unwrap_or_default() {
            let passable = board
                .get(rx, ry)
                .map(|t| t.passable_by(creature))
                .unwrap_or(false);
            if passable && self.tracks(rx, ry) {
                self.overlay[rx as usize][ry as usize].style = TileStyle::Reachable;
                self.actions[rx as usize][ry as usize].push_back(TileAction::MoveCreature);
            }
        }

        if creature.energy() > 0 {
            for (tx, ty) in board.attackable_tiles(x, y).unwrap_or_default() {
                let Ok(target) = board.get(tx, ty) else {
                    continue;
                };
                let hostile_creature = target
                    .creature()
                    .map(|c| c.controller() != self.seat)
                    .unwrap_or(false);
                let hostile_building = target
                    .building()
                    .map(|b| b.controller() != self.seat)
                    .unwrap_or(false);
                if (hostile_creature || hostile_building) && self.tracks(tx, ty) {
                    self.overlay[tx as usize][ty as usize].style = TileStyle::Attackable;
                }
            }
        }
        true
    }

    /// Shortest path for the creature at (x, y) to the destination as a
    /// direction sequence.
    ///
    /// Breadth-first search expanding North, West, South, East; that
    /// order is the tie-break between equal-length paths, so the first
    /// shortest path found wins deterministically. A partial path is
    /// extended only while its step count is below the creature's
    /// current energy, which bounds the search to the movement
    /// allowance. Returns an empty sequence on any out-of-range input,
    /// an empty source tile, an impassable destination, or an
    /// unreachable destination.
    pub fn get_path(
        &self,
        board: &Board,
        x: u32,
        y: u32,
        dest_x: u32,
        dest_y: u32,
    ) -> Vec<Direction> {
        let Ok(source) = board.get(x, y) else {
            return Vec::new();
        };
        let Some(creature) = source.creature() else {
            return Vec::new();
        };
        let passable_dest = board
            .get(dest_x, dest_y)
            .map(|t| t.passable_by(creature))
            .unwrap_or(false);
        if !passable_dest {
            return Vec::new();
        }

        let energy = creature.energy() as usize;
        let mut frontier: VecDeque<Vec<(u32, u32)>> = VecDeque::from([vec![(x, y)]]);
        let mut visited = BTreeSet::from([(x, y)]);
        let mut winning_path = Vec::new();

        while let Some(path) = frontier.pop_front() {
            let &(cx, cy) = path.last().unwrap_or(&(x, y));
            if (cx, cy) == (dest_x, dest_y) {
                winning_path = path;
                break;
            }
            if path.len() - 1 >= energy {
                continue;
            }
            for direction in SEARCH_ORDER {
                let Some((nx, ny)) = direction.step(cx, cy) else {
                    continue;
                };
                let passable = board
                    .get(nx, ny)
                    .map(|t| t.passable_by(creature))
                    .unwrap_or(false);
                if passable && visited.insert((nx, ny)) {
                    let mut next = path.clone();
                    next.push((nx, ny));
                    frontier.push_back(next);
                }
            }
        }

        winning_path
            .windows(2)
            .filter_map(|pair| Direction::between(pair[0], pair[1]))
            .collect()
    }

    /// Advances movement for this seat's creatures by one frame.
    ///
    /// North- and east-bound steps keep tile ownership at the departure
    /// cell until the animation offset completes, then move; south- and
    /// west-bound steps move ownership the moment the step starts and
    /// animate from the new cell backwards. The asymmetry keeps a unit
    /// from ever being drawn underneath the tile it is moving onto.
    /// A creature left idle with queued directions starts its next step
    /// in the same frame.
    pub fn update_creatures(&mut self, board: &mut Board, dt: f32) {
        let positions: Vec<(u32, u32)> = board.creature_positions().collect();
        for (x, y) in positions {
            let snapshot = board
                .get(x, y)
                .ok()
                .and_then(|tile| tile.creature())
                .map(|c| (c.controller(), c.direction()));
            let Some((controller, direction)) = snapshot else {
                continue;
            };
            if controller != self.seat {
                continue;
            }

            let completed = board
                .tile_mut(x, y)
                .ok()
                .and_then(|tile| tile.creature_mut())
                .map(|c| c.advance_offset(dt))
                .unwrap_or(false);

            let mut location = (x, y);
            match direction {
                Direction::North | Direction::East => {
                    if completed && board.move_creature(x, y, direction).unwrap_or(false) {
                        if let Some(stepped) = direction.step(x, y) {
                            location = stepped;
                        }
                        self.select_creature(board, location.0, location.1);
                    }
                }
                Direction::South | Direction::West => {
                    // Ownership already moved when the step started.
                    if completed {
                        self.select_creature(board, x, y);
                    }
                }
            }

            let next_step = {
                let creature = board
                    .tile_mut(location.0, location.1)
                    .ok()
                    .and_then(|tile| tile.creature_mut());
                match creature {
                    Some(c) if c.offset() == 0.0 => c.directions.pop_front(),
                    _ => None,
                }
            };
            if let Some(next) = next_step {
                self.move_adjacent(board, location.0, location.1, next, dt);
            }
        }
    }

    /// Starts one step of movement from (x, y). Validates the step,
    /// turns the creature to face it, then applies the asymmetric
    /// offset/ownership ordering described on [`Self::update_creatures`].
    fn move_adjacent(
        &mut self,
        board: &mut Board,
        x: u32,
        y: u32,
        direction: Direction,
        dt: f32,
    ) -> bool {
        let Ok(tile) = board.get(x, y) else {
            return false;
        };
        let Some(creature) = tile.creature() else {
            return false;
        };
        let Some((nx, ny)) = direction.step(x, y) else {
            return false;
        };
        let passable = board
            .get(nx, ny)
            .map(|t| t.passable_by(creature))
            .unwrap_or(false);
        if !passable {
            return false;
        }

        let _ = board.set_direction(x, y, direction.code());
        match direction {
            Direction::North | Direction::East => {
                if let Some(c) = board.tile_mut(x, y).ok().and_then(|t| t.creature_mut()) {
                    c.begin_step(dt);
                }
                true
            }
            Direction::South | Direction::West => {
                if board.move_creature(x, y, direction).unwrap_or(false) {
                    if let Some(c) = board.tile_mut(nx, ny).ok().and_then(|t| t.creature_mut()) {
                        c.begin_step(dt);
                    }
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Pops and executes the front action queued on (x, y).
    ///
    /// A move action paths the selected creature to the tile and queues
    /// the resulting directions onto it, turning it to face the first
    /// step immediately. A make action spawns a recruit from the
    /// selected building. Both clear the overlay and the selection.
    pub fn resolve_tile_action(
        &mut self,
        board: &mut Board,
        x: u32,
        y: u32,
    ) -> Result<(), PlayerError> {
        if self.actions.is_empty() {
            return Err(PlayerError::EmptyBoard);
        }
        let (x, y) = self.check(x as i64, y as i64)?;
        let action = self.actions[x as usize][y as usize]
            .pop_front()
            .ok_or(PlayerError::NoActions { x, y })?;

        match action {
            TileAction::MoveCreature => {
                if let Selection::Tile(sx, sy) = self.selection {
                    if board.get(sx, sy)?.occupied() {
                        let directions = self.get_path(board, sx, sy, x, y);
                        for (index, direction) in directions.iter().enumerate() {
                            if index == 0 {
                                board.set_direction(sx, sy, direction.code())?;
                            }
                            if let Some(creature) = board.tile_mut(sx, sy)?.creature_mut() {
                                creature.directions.push_back(*direction);
                            }
                        }
                        debug!(
                            "seat {} ordered ({}, {}) -> ({}, {})",
                            self.seat, sx, sy, x, y
                        );
                    }
                }
            }
            TileAction::MakeCreature => {
                if let Selection::Tile(sx, sy) = self.selection {
                    if board.get(sx, sy)?.building().is_some() {
                        let recruit = Creature::new(
                            Race::Human,
                            100,
                            4,
                            30,
                            1,
                            1,
                            1,
                            Direction::North,
                            self.seat,
                        );
                        if board.get(x, y)?.passable_by(&recruit) {
                            board.set_creature(x, y, recruit)?;
                        }
                    }
                }
            }
        }

        self.reset_all_tiles();
        self.selection = Selection::None;
        Ok(())
    }

    /// Resolves an attack from the selected creature onto (x, y), when
    /// the target is within range and holds an opposing creature or
    /// building. Damage display values are recorded on both tiles and a
    /// surviving attacker is re-selected. Returns None when nothing was
    /// in a state to fight.
    pub fn attack_tile(
        &mut self,
        board: &mut Board,
        x: u32,
        y: u32,
    ) -> Result<Option<CombatReport>, PlayerError> {
        let (x, y) = self.check(x as i64, y as i64)?;
        let Selection::Tile(sx, sy) = self.selection else {
            return Ok(None);
        };
        let Some(range) = board.get(sx, sy)?.creature().map(|c| c.range()) else {
            return Ok(None);
        };
        if board.tile_distance(sx, sy, x, y)? > range {
            return Ok(None);
        }

        let target = board.get(x, y)?;
        let report = if target.occupied() {
            board.attack(sx, sy, x, y)?
        } else if target.building().is_some() {
            board.attack_building(sx, sy, x, y)?
        } else {
            return Ok(None);
        };

        if report.occurred {
            board.set_damage(x, y, report.attack_damage)?;
            board.set_damage(sx, sy, report.defend_damage)?;
        }
        self.reset_all_tiles();
        self.selection = Selection::None;
        // Re-select the attacker if it survived the exchange.
        self.select_creature(board, sx, sy);
        Ok(Some(report))
    }

    /// Routes one click by the clicked tile's current overlay style:
    /// a reachable tile resolves its queued action, an attackable tile
    /// resolves combat, anything else becomes the new selection.
    /// Clicking the selected tile again, or the no-selection sentinel,
    /// deselects.
    pub fn handle_click(&mut self, board: &mut Board, x: i32, y: i32) -> Result<(), PlayerError> {
        if (x, y) == NO_SELECTION {
            self.reset_all_tiles();
            self.selection = Selection::None;
            return Ok(());
        }
        let (cx, cy) = self.check(x as i64, y as i64)?;
        if self.selection == Selection::Tile(cx, cy) {
            self.reset_all_tiles();
            self.selection = Selection::None;
            return Ok(());
        }

        match self.overlay[cx as usize][cy as usize].style {
            TileStyle::Reachable => self.resolve_tile_action(board, cx, cy),
            TileStyle::Attackable => self.attack_tile(board, cx, cy).map(|_| ()),
            TileStyle::Regular | TileStyle::Selected => {
                self.reset_all_tiles();
                self.select_tile(board, x, y);
                Ok(())
            }
        }
    }

    /// Moves the hover highlight to (x, y); any out-of-range pair (the
    /// no-selection sentinel included) just clears hovering.
    pub fn update_hover(&mut self, x: i32, y: i32) {
        for column in &mut self.overlay {
            for overlay in column {
                overlay.hovered = false;
            }
        }
        if let Ok((x, y)) = self.check(x as i64, y as i64) {
            self.overlay[x as usize][y as usize].hovered = true;
        }
    }

    /// Display color of a tile for this seat, derived from its overlay
    /// style and dimmed while hovered.
    pub fn tile_color(&self, x: u32, y: u32) -> Result<(f32, f32, f32), PlayerError> {
        let (x, y) = self.check(x as i64, y as i64)?;
        let overlay = self.overlay[x as usize][y as usize];
        let (r, g, b) = match overlay.style {
            TileStyle::Regular => (1.0, 1.0, 1.0),
            TileStyle::Selected => (0.625, 0.625, 0.625),
            TileStyle::Attackable => (1.0, 0.625, 0.625),
            TileStyle::Reachable => (0.62, 1.0, 0.625),
        };
        if overlay.hovered {
            Ok((r * HOVER_EFFECT, g * HOVER_EFFECT, b * HOVER_EFFECT))
        } else {
            Ok((r, g, b))
        }
    }

    /// Recomputes fog of war for this seat: tiles in sight of an owned
    /// creature or building become visible, tiles that fall out of
    /// sight are downgraded to explored.
    pub fn update_vision(&mut self, board: &Board) {
        for column in &mut self.overlay {
            for overlay in column {
                if overlay.visibility == Visibility::Visible {
                    overlay.visibility = Visibility::Explored;
                }
            }
        }

        let mut sources: Vec<(u32, u32, u32)> = Vec::new();
        for (x, y) in board.positions() {
            let Ok(tile) = board.get(x, y) else {
                continue;
            };
            if let Some(creature) = tile.creature() {
                if creature.controller() == self.seat {
                    sources.push((x, y, creature.vision()));
                }
            }
            if let Some(building) = tile.building() {
                if building.controller() == self.seat {
                    sources.push((x, y, BUILDING_VISION));
                }
            }
        }

        for (sx, sy, vision) in sources {
            for (x, y) in board.positions() {
                if sx.abs_diff(x) + sy.abs_diff(y) <= vision && self.tracks(x, y) {
                    self.overlay[x as usize][y as usize].visibility = Visibility::Visible;
                }
            }
        }
    }
}
