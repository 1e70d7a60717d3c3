use crate::model::card::Card;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Rows and columns on the board.
pub const SIZE: usize = 5;
/// Cells on the board, addressed row-major as `row * SIZE + col`.
pub const CELLS: usize = SIZE * SIZE;

pub type Line = [Option<Card>; SIZE];

pub const fn cell_index(row: usize, col: usize) -> usize {
    row * SIZE + col
}

pub const fn cell_position(index: usize) -> (usize, usize) {
    (index / SIZE, index % SIZE)
}

/// A target cell chosen for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
}

impl Placement {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub const fn from_index(index: usize) -> Self {
        let (row, col) = cell_position(index);
        Self { row, col }
    }

    pub const fn index(self) -> usize {
        cell_index(self.row, self.col)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The 5×5 placement surface. `Copy` so that workers can take private
/// snapshots cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Grid {
    cells: [Option<Card>; CELLS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    OutOfRange { row: usize, col: usize },
    Occupied { row: usize, col: usize, card: Card },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::OutOfRange { row, col } => write!(f, "cell ({row}, {col}) is off the board"),
            GridError::Occupied { row, col, card } => {
                write!(f, "cell ({row}, {col}) already holds {card}")
            }
        }
    }
}

impl std::error::Error for GridError {}

impl Grid {
    pub const fn new() -> Self {
        Self {
            cells: [None; CELLS],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Card> {
        if row >= SIZE || col >= SIZE {
            return None;
        }
        self.cells[cell_index(row, col)]
    }

    pub fn at(&self, index: usize) -> Option<Card> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_empty_at(&self, row: usize, col: usize) -> bool {
        row < SIZE && col < SIZE && self.cells[cell_index(row, col)].is_none()
    }

    /// Put `card` into an empty cell.
    pub fn place(&mut self, row: usize, col: usize, card: Card) -> Result<(), GridError> {
        if row >= SIZE || col >= SIZE {
            return Err(GridError::OutOfRange { row, col });
        }
        let slot = &mut self.cells[cell_index(row, col)];
        if let Some(existing) = *slot {
            return Err(GridError::Occupied {
                row,
                col,
                card: existing,
            });
        }
        *slot = Some(card);
        Ok(())
    }

    /// Overwrite a cell without checking occupancy. Used on private copies.
    pub fn set(&mut self, row: usize, col: usize, card: Option<Card>) {
        self.cells[cell_index(row, col)] = card;
    }

    pub fn clear(&mut self, row: usize, col: usize) -> Option<Card> {
        self.cells[cell_index(row, col)].take()
    }

    pub fn reset(&mut self) {
        self.cells = [None; CELLS];
    }

    pub fn row(&self, row: usize) -> Line {
        core::array::from_fn(|col| self.cells[cell_index(row, col)])
    }

    pub fn column(&self, col: usize) -> Line {
        core::array::from_fn(|row| self.cells[cell_index(row, col)])
    }

    pub fn row_is_empty(&self, row: usize) -> bool {
        (0..SIZE).all(|col| self.cells[cell_index(row, col)].is_none())
    }

    pub fn column_is_empty(&self, col: usize) -> bool {
        (0..SIZE).all(|row| self.cells[cell_index(row, col)].is_none())
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.is_none().then_some(index))
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIZE {
            for col in 0..SIZE {
                if col > 0 {
                    f.write_str(" ")?;
                }
                match self.cells[cell_index(row, col)] {
                    Some(card) => write!(f, "{card}")?,
                    None => f.write_str("--")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
