//! One-step greedy placement value.

use squares_core::model::card::Card;
use squares_core::model::grid::{Grid, cell_position};
use squares_core::scoring::PointSystem;

/// Change in the row and column subscores from putting `card` at `cell`.
///
/// Takes the grid by value: every caller gets its own copy, so concurrent
/// evaluations against one base grid never observe each other.
pub fn marginal_value(system: &PointSystem, mut grid: Grid, card: Card, cell: usize) -> i32 {
    let (row, col) = cell_position(cell);
    debug_assert!(grid.is_empty_at(row, col), "cell {cell} is not empty");

    let row_before = system.hand_score(&grid.row(row));
    let col_before = system.hand_score(&grid.column(col));
    grid.set(row, col, Some(card));
    let row_after = system.hand_score(&grid.row(row));
    let col_after = system.hand_score(&grid.column(col));

    (row_after - row_before) + (col_after - col_before)
}

/// True when the cell's row and column hold no cards, in which case its
/// marginal value is zero for every card.
pub fn is_isolated(grid: &Grid, cell: usize) -> bool {
    let (row, col) = cell_position(cell);
    grid.row_is_empty(row) && grid.column_is_empty(col)
}
