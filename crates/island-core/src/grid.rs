//! Square grid coordinates for the island board.
//!
//! The island sits on a 6×6 grid. Only 24 of the 36 cells are ever in play;
//! which ones is fixed by [`LAYOUT`] and never changes during a game. Cells
//! outside the layout still exist as coordinates (the diver swims through
//! them), they just never hold a tile.

use serde::{Deserialize, Serialize};

/// Number of grid rows
pub const GRID_ROWS: i32 = 6;

/// Number of grid columns
pub const GRID_COLS: i32 = 6;

/// Number of cells that hold a tile
pub const ISLAND_CELLS: usize = 24;

/// Which cells of the grid are part of the island.
pub const LAYOUT: [[bool; 6]; 6] = [
    [false, false, true, true, false, false],
    [false, true, true, true, true, false],
    [true, true, true, true, true, true],
    [true, true, true, true, true, true],
    [false, true, true, true, true, false],
    [false, false, true, true, false, false],
];

/// Orthogonal step offsets (north, south, west, east)
const ORTHOGONAL: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Diagonal step offsets
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// A cell on the grid, addressed by row then column.
///
/// Ordering is row-major, which is also the order the layout is filled in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    /// Create a new cell coordinate
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Whether this coordinate lies on the 6×6 grid
    pub const fn in_bounds(&self) -> bool {
        self.row >= 0 && self.row < GRID_ROWS && self.col >= 0 && self.col < GRID_COLS
    }

    /// Whether this cell is part of the island layout
    pub fn in_layout(&self) -> bool {
        self.in_bounds() && LAYOUT[self.row as usize][self.col as usize]
    }

    fn offset(&self, (dr, dc): (i32, i32)) -> Cell {
        Cell::new(self.row + dr, self.col + dc)
    }

    /// The orthogonal neighbours that lie on the grid
    pub fn adjacent_cells(&self) -> Vec<Cell> {
        ORTHOGONAL
            .iter()
            .map(|&d| self.offset(d))
            .filter(Cell::in_bounds)
            .collect()
    }

    /// The diagonal neighbours that lie on the grid
    pub fn diagonal_cells(&self) -> Vec<Cell> {
        DIAGONAL
            .iter()
            .map(|&d| self.offset(d))
            .filter(Cell::in_bounds)
            .collect()
    }

    /// Manhattan distance to another cell
    pub fn distance_to(&self, other: &Cell) -> u32 {
        ((self.row - other.row).abs() + (self.col - other.col).abs()) as u32
    }

    /// Whether `other` is one orthogonal step away
    pub fn is_adjacent_to(&self, other: &Cell) -> bool {
        self.distance_to(other) == 1
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Every grid cell in row-major order, inside the layout or not
pub fn all_cells() -> impl Iterator<Item = Cell> {
    (0..GRID_ROWS).flat_map(|row| (0..GRID_COLS).map(move |col| Cell::new(row, col)))
}

/// The island cells in row-major order
pub fn island_cells() -> impl Iterator<Item = Cell> {
    all_cells().filter(Cell::in_layout)
}
