use crate::bot::error::SearchError;
use crate::bot::greedy;
use crate::bot::session::{CellList, SessionError};
use rand::Rng;
use rayon::prelude::*;
use squares_core::model::card::Card;
use squares_core::model::grid::{CELLS, Grid};
use squares_core::scoring::PointSystem;

/// Chooses a cell for one simulated card by evaluating the greedy marginal
/// value of every legal cell in parallel.
///
/// Holds an optional dedicated rayon pool that is built once and reused by
/// every rollout step; without one the global pool is used.
#[derive(Debug, Default)]
pub struct PlacementResolver {
    pool: Option<rayon::ThreadPool>,
}

impl PlacementResolver {
    pub fn global() -> Self {
        Self { pool: None }
    }

    pub fn with_threads(threads: usize) -> Result<Self, SearchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("squares-resolver-{index}"))
            .build()
            .map_err(|err| SearchError::ThreadPool(err.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn from_threads(threads: Option<usize>) -> Result<Self, SearchError> {
        match threads {
            Some(count) => Self::with_threads(count),
            None => Ok(Self::global()),
        }
    }

    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Greedy value of each legal cell, indexed by cell. Cells outside
    /// `legal` stay `None`; so would any legal cell whose task never wrote.
    pub fn evaluate(
        &self,
        system: &PointSystem,
        grid: &Grid,
        card: Card,
        legal: &[u8],
    ) -> [Option<i32>; CELLS] {
        let mut slots: [Option<i32>; CELLS] = [None; CELLS];
        let mut launched = [false; CELLS];
        for &cell in legal {
            let cell = usize::from(cell);
            if greedy::is_isolated(grid, cell) {
                slots[cell] = Some(0);
            } else {
                launched[cell] = true;
            }
        }

        let base = *grid;
        let fill = |slots: &mut [Option<i32>; CELLS]| {
            slots
                .as_mut_slice()
                .par_iter_mut()
                .enumerate()
                .filter(|(cell, _)| launched[*cell])
                .for_each(|(cell, slot)| {
                    *slot = Some(greedy::marginal_value(system, base, card, cell));
                });
        };
        match &self.pool {
            Some(pool) => pool.install(|| fill(&mut slots)),
            None => fill(&mut slots),
        }
        slots
    }

    /// Cell with the highest non-zero greedy value, ties broken uniformly.
    /// Falls back to a uniformly random legal cell when every value is zero.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        system: &PointSystem,
        grid: &Grid,
        card: Card,
        legal: &[u8],
        rng: &mut R,
    ) -> Result<usize, SearchError> {
        let slots = self.evaluate(system, grid, card, legal);

        let mut best = i32::MIN;
        let mut ties = CellList::new();
        for &cell in legal {
            let index = usize::from(cell);
            let value = slots[index].ok_or(SearchError::UnsetSlot { cell: index })?;
            if value == 0 {
                continue;
            }
            if value > best {
                best = value;
                ties.clear();
            }
            if value == best {
                ties.push(cell);
            }
        }

        let chosen = if ties.is_empty() {
            CellList::from_slice(legal).choose(rng)
        } else {
            ties.choose(rng)
        };
        chosen
            .map(usize::from)
            .ok_or(SearchError::Session(SessionError::GridFull))
    }
}
