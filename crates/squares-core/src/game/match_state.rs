use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::grid::{CELLS, Grid, GridError, Placement};
use crate::scoring::PointSystem;
use core::fmt;
use core::time::Duration;

/// Wall-clock budget for a whole game of 25 placements.
pub const DEFAULT_GAME_MILLIS: u64 = 30_000;

/// One game of Poker Squares: a seeded deal, the grid being filled and the
/// shrinking time budget of the player.
#[derive(Debug, Clone)]
pub struct MatchState {
    deck: Deck,
    grid: Grid,
    dealt: usize,
    pending: Option<Card>,
    history: Vec<(Card, Placement)>,
    millis_remaining: u64,
    timed_out: bool,
    seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    GameOver,
    NoCardPending,
    CardPending(Card),
    Grid(GridError),
    OutOfTime { elapsed_ms: u64, remaining_ms: u64 },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::GameOver => f.write_str("the grid is already full"),
            MatchError::NoCardPending => f.write_str("no card has been dealt"),
            MatchError::CardPending(card) => write!(f, "{card} is still waiting to be placed"),
            MatchError::Grid(err) => write!(f, "illegal placement: {err}"),
            MatchError::OutOfTime {
                elapsed_ms,
                remaining_ms,
            } => write!(
                f,
                "decision took {elapsed_ms} ms with only {remaining_ms} ms remaining"
            ),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<GridError> for MatchError {
    fn from(err: GridError) -> Self {
        MatchError::Grid(err)
    }
}

impl MatchState {
    pub fn new() -> Self {
        let seed: u64 = rand::random();
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_seed_and_budget(seed, DEFAULT_GAME_MILLIS)
    }

    pub fn with_seed_and_budget(seed: u64, millis: u64) -> Self {
        Self::from_deck(seed, Deck::shuffled_with_seed(seed), millis)
    }

    /// Play a scripted deal; the seed is only recorded.
    pub fn from_deck(seed: u64, deck: Deck, millis: u64) -> Self {
        Self {
            deck,
            grid: Grid::new(),
            dealt: 0,
            pending: None,
            history: Vec::with_capacity(CELLS),
            millis_remaining: millis,
            timed_out: false,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn history(&self) -> &[(Card, Placement)] {
        &self.history
    }

    pub fn millis_remaining(&self) -> u64 {
        self.millis_remaining
    }

    pub fn plays_made(&self) -> usize {
        self.history.len()
    }

    pub fn pending_card(&self) -> Option<Card> {
        self.pending
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn is_complete(&self) -> bool {
        self.timed_out || self.grid.is_full()
    }

    /// Reveal the next card of the deal. It must be placed before another
    /// card can be drawn.
    pub fn next_card(&mut self) -> Result<Card, MatchError> {
        if self.is_complete() {
            return Err(MatchError::GameOver);
        }
        if let Some(card) = self.pending {
            return Err(MatchError::CardPending(card));
        }
        let card = self.deck.get(self.dealt).ok_or(MatchError::GameOver)?;
        self.dealt += 1;
        self.pending = Some(card);
        Ok(card)
    }

    /// Commit the pending card and charge `elapsed` against the budget. A
    /// decision that overruns the budget ends the game and is not applied.
    pub fn apply_play(
        &mut self,
        placement: Placement,
        elapsed: Duration,
    ) -> Result<(), MatchError> {
        let card = self.pending.ok_or(MatchError::NoCardPending)?;
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if elapsed_ms > self.millis_remaining {
            let remaining_ms = self.millis_remaining;
            self.millis_remaining = 0;
            self.timed_out = true;
            self.pending = None;
            return Err(MatchError::OutOfTime {
                elapsed_ms,
                remaining_ms,
            });
        }
        self.grid.place(placement.row, placement.col, card)?;
        self.millis_remaining -= elapsed_ms;
        self.pending = None;
        self.history.push((card, placement));
        Ok(())
    }

    /// Final score of the game. A game lost on time scores zero.
    pub fn final_score(&self, system: &PointSystem) -> i32 {
        if self.timed_out {
            0
        } else {
            system.score(&self.grid)
        }
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchError, MatchState};
    use crate::model::grid::{CELLS, GridError, Placement};
    use crate::scoring::PointSystem;
    use core::time::Duration;

    #[test]
    fn deals_are_reproducible_from_seed() {
        let mut a = MatchState::with_seed(11);
        let mut b = MatchState::with_seed(11);
        for _ in 0..5 {
            let card_a = a.next_card().unwrap();
            assert_eq!(card_a, b.next_card().unwrap());
            let target = Placement::from_index(a.plays_made());
            a.apply_play(target, Duration::ZERO).unwrap();
            b.apply_play(target, Duration::ZERO).unwrap();
        }
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn next_card_requires_previous_placement() {
        let mut state = MatchState::with_seed(3);
        let card = state.next_card().unwrap();
        assert_eq!(state.next_card(), Err(MatchError::CardPending(card)));
    }

    #[test]
    fn occupied_cell_is_rejected_without_losing_the_card() {
        let mut state = MatchState::with_seed(5);
        state.next_card().unwrap();
        state
            .apply_play(Placement::new(0, 0), Duration::ZERO)
            .unwrap();
        let second = state.next_card().unwrap();
        let err = state
            .apply_play(Placement::new(0, 0), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, MatchError::Grid(GridError::Occupied { .. })));
        assert_eq!(state.pending_card(), Some(second));
    }

    #[test]
    fn overrunning_the_budget_forfeits() {
        let mut state = MatchState::with_seed_and_budget(9, 10);
        state.next_card().unwrap();
        let err = state
            .apply_play(Placement::new(2, 2), Duration::from_millis(11))
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::OutOfTime {
                elapsed_ms: 11,
                remaining_ms: 10
            }
        );
        assert!(state.is_complete());
        assert_eq!(state.final_score(&PointSystem::american()), 0);
        assert_eq!(state.next_card(), Err(MatchError::GameOver));
    }

    #[test]
    fn full_game_completes_after_twenty_five_plays() {
        let mut state = MatchState::with_seed(21);
        for index in 0..CELLS {
            state.next_card().unwrap();
            state
                .apply_play(Placement::from_index(index), Duration::from_millis(1))
                .unwrap();
        }
        assert!(state.is_complete());
        assert_eq!(state.millis_remaining(), super::DEFAULT_GAME_MILLIS - 25);
        assert_eq!(state.next_card(), Err(MatchError::GameOver));
        let system = PointSystem::american();
        assert_eq!(state.final_score(&system), system.score(state.grid()));
    }
}
