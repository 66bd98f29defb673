//! Island board: tiles, their flood lifecycle, and movement reachability.
//!
//! This module contains:
//! - The four treasure kinds and the 24 named island locations
//! - The Dry → Flooded → Sunk tile lifecycle
//! - The board itself, which pins every location to one grid cell
//! - Reachability queries used by role movement rules

use crate::game::GameError;
use crate::grid::{island_cells, Cell, ISLAND_CELLS};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// The four treasures the team must recover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TreasureKind {
    EarthStone,
    StatueOfTheWind,
    CrystalOfFire,
    OceansChalice,
}

impl TreasureKind {
    /// All treasure kinds
    pub const ALL: [TreasureKind; 4] = [
        TreasureKind::EarthStone,
        TreasureKind::StatueOfTheWind,
        TreasureKind::CrystalOfFire,
        TreasureKind::OceansChalice,
    ];

    /// Name shown to players
    pub fn display_name(&self) -> &'static str {
        match self {
            TreasureKind::EarthStone => "The Earth Stone",
            TreasureKind::StatueOfTheWind => "The Statue of the Wind",
            TreasureKind::CrystalOfFire => "The Crystal of Fire",
            TreasureKind::OceansChalice => "The Ocean's Chalice",
        }
    }

    /// The two locations where this treasure can be claimed
    pub fn tiles(&self) -> [TileName; 2] {
        match self {
            TreasureKind::EarthStone => [TileName::TempleOfTheSun, TileName::TempleOfTheMoon],
            TreasureKind::StatueOfTheWind => [TileName::WhisperingGarden, TileName::HowlingGarden],
            TreasureKind::CrystalOfFire => [TileName::CaveOfEmbers, TileName::CaveOfShadows],
            TreasureKind::OceansChalice => [TileName::CoralPalace, TileName::TidalPalace],
        }
    }
}

/// The 24 island locations. Each one is also a flood card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileName {
    MistyMarsh,
    Observatory,
    IronGate,
    TidalPalace,
    CrimsonForest,
    BreakersBridge,
    CaveOfEmbers,
    TwilightHollow,
    DunesOfDeception,
    TempleOfTheMoon,
    LostLagoon,
    CaveOfShadows,
    PhantomRock,
    SilverGate,
    Watchtower,
    CopperGate,
    CliffsOfAbandon,
    WhisperingGarden,
    TempleOfTheSun,
    CoralPalace,
    GoldGate,
    FoolsLanding,
    HowlingGarden,
    BronzeGate,
}

impl TileName {
    /// Every location, in canonical order
    pub const ALL: [TileName; ISLAND_CELLS] = [
        TileName::MistyMarsh,
        TileName::Observatory,
        TileName::IronGate,
        TileName::TidalPalace,
        TileName::CrimsonForest,
        TileName::BreakersBridge,
        TileName::CaveOfEmbers,
        TileName::TwilightHollow,
        TileName::DunesOfDeception,
        TileName::TempleOfTheMoon,
        TileName::LostLagoon,
        TileName::CaveOfShadows,
        TileName::PhantomRock,
        TileName::SilverGate,
        TileName::Watchtower,
        TileName::CopperGate,
        TileName::CliffsOfAbandon,
        TileName::WhisperingGarden,
        TileName::TempleOfTheSun,
        TileName::CoralPalace,
        TileName::GoldGate,
        TileName::FoolsLanding,
        TileName::HowlingGarden,
        TileName::BronzeGate,
    ];

    /// Stable identifier, also used to key image assets on the client
    pub fn canonical(&self) -> &'static str {
        match self {
            TileName::MistyMarsh => "MistyMarsh",
            TileName::Observatory => "Observatory",
            TileName::IronGate => "IronGate",
            TileName::TidalPalace => "TidalPalace",
            TileName::CrimsonForest => "CrimsonForest",
            TileName::BreakersBridge => "BreakersBridge",
            TileName::CaveOfEmbers => "CaveOfEmbers",
            TileName::TwilightHollow => "TwilightHollow",
            TileName::DunesOfDeception => "DunesOfDeception",
            TileName::TempleOfTheMoon => "TempleOfTheMoon",
            TileName::LostLagoon => "LostLagoon",
            TileName::CaveOfShadows => "CaveOfShadows",
            TileName::PhantomRock => "PhantomRock",
            TileName::SilverGate => "SilverGate",
            TileName::Watchtower => "Watchtower",
            TileName::CopperGate => "CopperGate",
            TileName::CliffsOfAbandon => "CliffsOfAbandon",
            TileName::WhisperingGarden => "WhisperingGarden",
            TileName::TempleOfTheSun => "TempleOfTheSun",
            TileName::CoralPalace => "CoralPalace",
            TileName::GoldGate => "GoldGate",
            TileName::FoolsLanding => "FoolsLanding",
            TileName::HowlingGarden => "HowlingGarden",
            TileName::BronzeGate => "BronzeGate",
        }
    }

    /// Human readable name ("Cave of Embers", "Fools' Landing")
    pub fn display_name(&self) -> String {
        if *self == TileName::FoolsLanding {
            return "Fools' Landing".to_string();
        }
        let mut out = String::new();
        for (i, ch) in self.canonical().chars().enumerate() {
            if i > 0 && ch.is_ascii_uppercase() {
                out.push(' ');
            }
            out.push(ch);
        }
        out.replace(" Of ", " of ").replace(" The ", " the ")
    }

    /// Look up a location by its canonical identifier
    pub fn from_canonical(name: &str) -> Option<TileName> {
        TileName::ALL.into_iter().find(|t| t.canonical() == name)
    }

    /// The treasure claimable here, if any
    pub fn treasure(&self) -> Option<TreasureKind> {
        TreasureKind::ALL
            .into_iter()
            .find(|kind| kind.tiles().contains(self))
    }

    /// Whether an adventurer may begin the game here
    pub fn is_starting_location(&self) -> bool {
        matches!(
            self,
            TileName::IronGate | TileName::BronzeGate | TileName::GoldGate | TileName::CopperGate
        )
    }

    /// Whether this is the extraction point
    pub fn is_safe_haven(&self) -> bool {
        *self == TileName::FoolsLanding
    }
}

/// Flood lifecycle of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TileState {
    #[default]
    Dry,
    Flooded,
    /// Gone for good. The cell is water from now on.
    Sunk,
}

/// Result of resolving one flood card against the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloodOutcome {
    /// The tile was dry and is now flooded
    Flooded(Cell),
    /// The tile was flooded and has now sunk
    Sunk(Cell),
    /// The tile had already sunk; the card does nothing
    AlreadySunk,
}

/// One island location pinned to its grid cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Which location this is
    pub name: TileName,
    /// Where it sits; never changes
    pub cell: Cell,
    /// Current flood state
    pub state: TileState,
}

impl Tile {
    /// Create a dry tile
    pub fn new(name: TileName, cell: Cell) -> Self {
        Self {
            name,
            cell,
            state: TileState::Dry,
        }
    }

    pub fn is_dry(&self) -> bool {
        self.state == TileState::Dry
    }

    pub fn is_flooded(&self) -> bool {
        self.state == TileState::Flooded
    }

    pub fn is_sunk(&self) -> bool {
        self.state == TileState::Sunk
    }

    /// The treasure claimable here, if any
    pub fn treasure(&self) -> Option<TreasureKind> {
        self.name.treasure()
    }

    pub fn is_starting_location(&self) -> bool {
        self.name.is_starting_location()
    }

    pub fn is_safe_haven(&self) -> bool {
        self.name.is_safe_haven()
    }
}

/// The island board.
///
/// Holds one [`Tile`] per layout cell for the whole game. Sunk tiles are kept
/// as tombstones so their names still resolve, but [`Board::tile_at`] treats
/// their cells as empty water.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Tiles in row-major cell order
    tiles: Vec<Tile>,
}

impl Board {
    /// Create a board with the locations shuffled across the layout
    pub fn standard_with_rng<R: Rng>(rng: &mut R) -> Self {
        let mut names = TileName::ALL;
        names.shuffle(rng);
        let tiles = island_cells()
            .zip(names)
            .map(|(cell, name)| Tile::new(name, cell))
            .collect();
        Self { tiles }
    }

    /// Create a board with an explicit placement.
    ///
    /// `names[i]` is placed on the i-th layout cell in row-major order. Every
    /// location must appear exactly once.
    pub fn from_names(names: &[TileName]) -> Result<Self, GameError> {
        if names.len() != ISLAND_CELLS {
            return Err(GameError::InitializationFailure(format!(
                "expected {} tiles, got {}",
                ISLAND_CELLS,
                names.len()
            )));
        }
        let unique: HashSet<&TileName> = names.iter().collect();
        if unique.len() != ISLAND_CELLS {
            return Err(GameError::InitializationFailure(
                "tile names must be unique".to_string(),
            ));
        }

        let tiles = island_cells()
            .zip(names.iter().copied())
            .map(|(cell, name)| Tile::new(name, cell))
            .collect();
        let board = Self { tiles };
        board.validate()?;
        Ok(board)
    }

    /// Check the structural invariants of the layout
    pub fn validate(&self) -> Result<(), GameError> {
        let haven_count = self.tiles.iter().filter(|t| t.is_safe_haven()).count();
        if haven_count != 1 {
            return Err(GameError::InitializationFailure(format!(
                "expected exactly one safe haven, found {}",
                haven_count
            )));
        }

        let starting = self.tiles.iter().filter(|t| t.is_starting_location()).count();
        if starting != 4 {
            return Err(GameError::InitializationFailure(format!(
                "expected 4 starting locations, found {}",
                starting
            )));
        }

        for kind in TreasureKind::ALL {
            let count = self.tiles.iter().filter(|t| t.treasure() == Some(kind)).count();
            if count != 2 {
                return Err(GameError::InitializationFailure(format!(
                    "{} must have 2 tiles, found {}",
                    kind.display_name(),
                    count
                )));
            }
        }

        if self.tiles.iter().any(|t| !t.cell.in_layout()) {
            return Err(GameError::InitializationFailure(
                "tile placed outside the island layout".to_string(),
            ));
        }
        Ok(())
    }

    // ==================== Query Methods ====================

    /// The tile standing on a cell. `None` for water: outside the layout or sunk.
    pub fn tile_at(&self, cell: Cell) -> Option<&Tile> {
        self.tile_record(cell).filter(|t| !t.is_sunk())
    }

    /// The tile record for a cell, including sunk tombstones
    pub fn tile_record(&self, cell: Cell) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.cell == cell)
    }

    fn tile_record_mut(&mut self, cell: Cell) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|t| t.cell == cell)
    }

    /// The tile record for a named location, including sunk tombstones
    pub fn tile_named(&self, name: TileName) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.name == name)
    }

    /// Every tile record, sunk or not
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Tiles still above water
    pub fn active_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|t| !t.is_sunk())
    }

    /// Whether a cell holds a dry tile
    pub fn is_dry(&self, cell: Cell) -> bool {
        self.tile_at(cell).is_some_and(Tile::is_dry)
    }

    /// Whether a cell holds a flooded (but not sunk) tile
    pub fn is_flooded(&self, cell: Cell) -> bool {
        self.tile_at(cell).is_some_and(Tile::is_flooded)
    }

    /// Whether a cell is water a diver can swim through
    fn is_water(&self, cell: Cell) -> bool {
        self.tile_at(cell).map_or(true, Tile::is_flooded)
    }

    /// Cells holding dry tiles
    pub fn dry_cells(&self) -> BTreeSet<Cell> {
        self.active_tiles()
            .filter(|t| t.is_dry())
            .map(|t| t.cell)
            .collect()
    }

    /// Cells holding flooded tiles
    pub fn flooded_cells(&self) -> BTreeSet<Cell> {
        self.active_tiles()
            .filter(|t| t.is_flooded())
            .map(|t| t.cell)
            .collect()
    }

    /// The safe haven tile record
    pub fn safe_haven(&self) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.is_safe_haven())
    }

    /// The tile records for both locations of a treasure
    pub fn treasure_tiles(&self, kind: TreasureKind) -> Vec<&Tile> {
        self.tiles
            .iter()
            .filter(|t| t.treasure() == Some(kind))
            .collect()
    }

    /// Cells of the starting locations, row-major
    pub fn starting_cells(&self) -> Vec<Cell> {
        self.tiles
            .iter()
            .filter(|t| t.is_starting_location())
            .map(|t| t.cell)
            .collect()
    }

    // ==================== Reachability ====================

    /// Dry orthogonal neighbours of a cell
    pub fn orthogonal_moves(&self, from: Cell) -> BTreeSet<Cell> {
        from.adjacent_cells()
            .into_iter()
            .filter(|&c| self.is_dry(c))
            .collect()
    }

    /// Dry diagonal neighbours of a cell
    pub fn diagonal_moves(&self, from: Cell) -> BTreeSet<Cell> {
        from.diagonal_cells()
            .into_iter()
            .filter(|&c| self.is_dry(c))
            .collect()
    }

    /// Dry tiles reachable by swimming.
    ///
    /// Breadth-first over orthogonal steps through water (flooded tiles, sunk
    /// cells and cells off the island). A dry tile ends the path it was
    /// reached on and is collected; the search never continues past it.
    pub fn underwater_moves(&self, from: Cell) -> BTreeSet<Cell> {
        let mut found = BTreeSet::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for next in current.adjacent_cells() {
                if !visited.insert(next) {
                    continue;
                }
                if self.is_dry(next) {
                    found.insert(next);
                } else if self.is_water(next) {
                    queue.push_back(next);
                }
            }
        }
        found.remove(&from);
        found
    }

    /// Dry tiles within `max_steps` orthogonal steps over dry tiles only.
    ///
    /// The starting cell itself is never included.
    pub fn dry_cells_within(&self, from: Cell, max_steps: u32) -> BTreeSet<Cell> {
        let mut found = BTreeSet::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([(from, 0u32)]);

        while let Some((current, dist)) = queue.pop_front() {
            if dist >= max_steps {
                continue;
            }
            for next in current.adjacent_cells() {
                if self.is_dry(next) && visited.insert(next) {
                    found.insert(next);
                    queue.push_back((next, dist + 1));
                }
            }
        }
        found
    }

    /// Flooded tiles on a cell or its orthogonal neighbours
    pub fn flooded_around(&self, center: Cell) -> BTreeSet<Cell> {
        std::iter::once(center)
            .chain(center.adjacent_cells())
            .filter(|&c| self.is_flooded(c))
            .collect()
    }

    // ==================== Mutation ====================

    /// Resolve a flood card for a location.
    ///
    /// Dry tiles flood, flooded tiles sink, sunk tiles ignore the card.
    pub fn flood(&mut self, name: TileName) -> FloodOutcome {
        let Some(tile) = self.tiles.iter_mut().find(|t| t.name == name) else {
            return FloodOutcome::AlreadySunk;
        };
        match tile.state {
            TileState::Dry => {
                tile.state = TileState::Flooded;
                debug!(tile = name.canonical(), cell = %tile.cell, "tile flooded");
                FloodOutcome::Flooded(tile.cell)
            }
            TileState::Flooded => {
                tile.state = TileState::Sunk;
                debug!(tile = name.canonical(), cell = %tile.cell, "tile sunk");
                FloodOutcome::Sunk(tile.cell)
            }
            TileState::Sunk => FloodOutcome::AlreadySunk,
        }
    }

    /// Shore up a flooded tile. Returns false if the cell holds no flooded tile.
    pub fn shore_up(&mut self, cell: Cell) -> bool {
        match self.tile_record_mut(cell) {
            Some(tile) if tile.state == TileState::Flooded => {
                tile.state = TileState::Dry;
                true
            }
            _ => false,
        }
    }

    /// Force a tile into a given state. Intended for scenario setup.
    pub fn set_state(&mut self, name: TileName, state: TileState) {
        if let Some(tile) = self.tiles.iter_mut().find(|t| t.name == name) {
            tile.state = state;
        }
    }

    /// Convert to a flat, JSON-friendly representation for rendering
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            tiles: self
                .tiles
                .iter()
                .map(|t| TileSnapshot {
                    row: t.cell.row,
                    col: t.cell.col,
                    name: t.name,
                    display_name: t.name.display_name(),
                    state: t.state,
                    treasure: t.treasure(),
                    is_starting_location: t.is_starting_location(),
                    is_safe_haven: t.is_safe_haven(),
                })
                .collect(),
        }
    }
}

/// JSON-friendly board representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub tiles: Vec<TileSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub row: i32,
    pub col: i32,
    pub name: TileName,
    pub display_name: String,
    pub state: TileState,
    pub treasure: Option<TreasureKind>,
    pub is_starting_location: bool,
    pub is_safe_haven: bool,
}
