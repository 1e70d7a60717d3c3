mod monte_carlo;

pub use monte_carlo::MonteCarloPlayer;

use crate::bot::{DecisionStats, SearchError};
use squares_core::model::card::Card;
use squares_core::model::grid::Placement;
use squares_core::scoring::PointSystem;

/// Interface a game driver uses to ask a player where each card goes.
pub trait Player: Send {
    fn name(&self) -> &str;

    /// Scoring table for the games that follow.
    fn set_point_system(&mut self, system: PointSystem);

    /// Reset all per-game state before the first card of a new game.
    fn init(&mut self);

    /// Choose a cell for `card` given the player's remaining time, and
    /// commit it to the player's own view of the grid.
    fn get_play(&mut self, card: Card, millis_remaining: u64) -> Result<Placement, SearchError>;

    /// Search statistics of the most recent `get_play`, for players that search.
    fn last_decision(&self) -> Option<&DecisionStats> {
        None
    }
}
