use crate::bot::partition::PartitionedArray;
use rand::Rng;
use squares_core::model::card::Card;
use squares_core::model::grid::{CELLS, Grid, SIZE, cell_index, cell_position};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cell {cell} is off the board")]
    CellOutOfRange { cell: usize },
    #[error("cell {cell} is already filled")]
    CellOccupied { cell: usize },
    #[error("{card} is not among the undealt cards")]
    CardNotUndealt { card: Card },
    #[error("undo called with no placements recorded")]
    NothingToUndo,
    #[error("every cell is already filled")]
    GridFull,
}

/// Fixed-capacity list of cell indices, refilled at each rollout depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellList {
    cells: [u8; CELLS],
    len: usize,
}

impl CellList {
    pub const fn new() -> Self {
        Self {
            cells: [0; CELLS],
            len: 0,
        }
    }

    pub fn from_slice(cells: &[u8]) -> Self {
        let mut list = Self::new();
        for &cell in cells {
            list.push(cell);
        }
        list
    }

    pub fn push(&mut self, cell: u8) {
        self.cells[self.len] = cell;
        self.len += 1;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        Some(self.cells[rng.gen_range(0..self.len)])
    }
}

impl Default for CellList {
    fn default() -> Self {
        Self::new()
    }
}

fn identity_plays() -> [u8; CELLS] {
    core::array::from_fn(|cell| cell as u8)
}

/// Grid, play list and simulation deck for one game, sharing a single
/// cursor (`num_plays`). Real and simulated placements go through the same
/// [`place`](Self::place) / [`undo`](Self::undo) pair, which must be used
/// strictly last-in first-out.
///
/// Each placement records where its cell index and card were swapped from,
/// so undo restores both arrays to their exact previous order.
#[derive(Debug, Clone)]
pub struct SearchSession {
    grid: Grid,
    plays: PartitionedArray<u8, CELLS>,
    deck: PartitionedArray<Card, { Card::DECK_SIZE }>,
    num_plays: usize,
    trail: [(u8, u8); CELLS],
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            grid: Grid::new(),
            plays: PartitionedArray::new(identity_plays()),
            deck: PartitionedArray::new(Card::all()),
            num_plays: 0,
            trail: [(0, 0); CELLS],
        }
    }

    /// Start a new game: empty grid, identity play list, full deck.
    pub fn reset(&mut self) {
        self.grid.reset();
        self.plays.reset(identity_plays());
        self.deck.reset(Card::all());
        self.num_plays = 0;
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn num_plays(&self) -> usize {
        self.num_plays
    }

    pub fn remaining_cells(&self) -> usize {
        CELLS - self.num_plays
    }

    /// Filled cells in the order they were filled.
    pub fn played(&self) -> &[u8] {
        self.plays.consumed(self.num_plays)
    }

    pub fn undealt(&self) -> &[Card] {
        self.deck.open(self.num_plays)
    }

    pub fn legal_plays(&self) -> CellList {
        CellList::from_slice(self.plays.open(self.num_plays))
    }

    /// Record `card` as the next dealt card by moving it to the cursor slot
    /// of the deck. Nothing else changes.
    pub fn stage(&mut self, card: Card) -> Result<(), SessionError> {
        if self.num_plays >= CELLS {
            return Err(SessionError::GridFull);
        }
        self.deck
            .promote(self.num_plays, card)
            .map(|_| ())
            .ok_or(SessionError::CardNotUndealt { card })
    }

    pub fn place(&mut self, card: Card, row: usize, col: usize) -> Result<(), SessionError> {
        if row >= SIZE || col >= SIZE {
            return Err(SessionError::CellOutOfRange {
                cell: row.saturating_mul(SIZE).saturating_add(col),
            });
        }
        self.place_index(card, cell_index(row, col))
    }

    /// Fill `cell` with `card`. All checks run before anything is mutated,
    /// so a rejected call leaves the session untouched.
    pub fn place_index(&mut self, card: Card, cell: usize) -> Result<(), SessionError> {
        if cell >= CELLS {
            return Err(SessionError::CellOutOfRange { cell });
        }
        if self.num_plays >= CELLS {
            return Err(SessionError::GridFull);
        }
        let cursor = self.num_plays;
        let play_from = self
            .plays
            .find_open(cursor, cell as u8)
            .ok_or(SessionError::CellOccupied { cell })?;
        let deck_from = self
            .deck
            .find_open(cursor, card)
            .ok_or(SessionError::CardNotUndealt { card })?;

        self.plays.swap(cursor, play_from);
        self.deck.swap(cursor, deck_from);
        let (row, col) = cell_position(cell);
        self.grid.set(row, col, Some(card));
        self.trail[cursor] = (play_from as u8, deck_from as u8);
        self.num_plays += 1;
        Ok(())
    }

    /// Revert the most recent placement and return the card it held.
    pub fn undo(&mut self) -> Result<Card, SessionError> {
        if self.num_plays == 0 {
            return Err(SessionError::NothingToUndo);
        }
        self.num_plays -= 1;
        let cursor = self.num_plays;
        let cell = usize::from(self.plays.get(cursor));
        let card = self.deck.get(cursor);
        let (row, col) = cell_position(cell);
        self.grid.set(row, col, None);
        let (play_from, deck_from) = self.trail[cursor];
        self.plays.swap(cursor, usize::from(play_from));
        self.deck.swap(cursor, usize::from(deck_from));
        Ok(card)
    }

    /// Pick a card uniformly from the undealt suffix. The card stays where
    /// it is until [`place_index`](Self::place_index) swaps it to the cursor.
    pub fn draw_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Card> {
        let open = self.deck.open(self.num_plays);
        if open.is_empty() {
            return None;
        }
        Some(open[rng.gen_range(0..open.len())])
    }

    /// The cursor matches grid occupancy, the played prefix is exactly the
    /// set of filled cells, and the dealt prefix holds the cards on the grid.
    pub fn check_invariants(&self) -> bool {
        if self.grid.filled_count() != self.num_plays {
            return false;
        }
        let played_ok = (0..self.num_plays).all(|position| {
            let cell = usize::from(self.plays.get(position));
            self.grid.at(cell) == Some(self.deck.get(position))
        });
        let open_ok = self
            .plays
            .open(self.num_plays)
            .iter()
            .all(|&cell| self.grid.at(usize::from(cell)).is_none());
        played_ok && open_ok
    }
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}
