use crate::bot::clock::Clock;
use crate::bot::error::SearchError;
use crate::bot::params::SearchParams;
use crate::bot::resolver::PlacementResolver;
use crate::bot::rollout;
use crate::bot::session::{CellList, SearchSession, SessionError};
use core::time::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use squares_core::model::card::Card;
use squares_core::model::grid::Placement;
use squares_core::scoring::PointSystem;

/// Rollout totals for one candidate cell of a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStats {
    pub cell: usize,
    pub rollouts: u64,
    pub total_score: i64,
    /// `NEG_INFINITY` when no rollout finished inside the allotment.
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionStats {
    pub card: Card,
    pub placement: Placement,
    /// Only one cell was open, so no rollouts ran.
    pub forced: bool,
    pub allotment: Duration,
    pub elapsed: Duration,
    pub candidates: Vec<CandidateStats>,
    pub best_average: f64,
    /// Number of candidates sharing `best_average`.
    pub tied: usize,
}

impl DecisionStats {
    pub fn total_rollouts(&self) -> u64 {
        self.candidates.iter().map(|candidate| candidate.rollouts).sum()
    }

    pub fn starved(&self) -> usize {
        self.candidates
            .iter()
            .filter(|candidate| candidate.rollouts == 0)
            .count()
    }
}

/// Time-boxed Monte Carlo move selection for the real incoming card.
#[derive(Debug)]
pub struct SearchController<C: Clock> {
    system: PointSystem,
    params: SearchParams,
    resolver: PlacementResolver,
    rng: StdRng,
    clock: C,
}

impl<C: Clock> SearchController<C> {
    pub fn new(system: PointSystem, params: SearchParams, clock: C) -> Result<Self, SearchError> {
        let resolver = PlacementResolver::from_threads(params.threads)?;
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            system,
            params,
            resolver,
            rng,
            clock,
        })
    }

    pub fn system(&self) -> &PointSystem {
        &self.system
    }

    pub fn set_system(&mut self, system: PointSystem) {
        self.system = system;
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Choose and commit a cell for `card`.
    ///
    /// Every empty cell gets the same slice of the remaining budget; within
    /// it the card is placed tentatively and rollouts are repeated until the
    /// deadline passes (checked between rollouts, never during one). The
    /// cell with the best average wins, ties uniformly at random.
    pub fn decide(
        &mut self,
        session: &mut SearchSession,
        card: Card,
        millis_remaining: u64,
    ) -> Result<DecisionStats, SearchError> {
        let started = self.clock.now();
        session.stage(card)?;
        let legal = session.legal_plays();

        if let [only] = legal.as_slice() {
            let cell = usize::from(*only);
            session.place_index(card, cell)?;
            return Ok(DecisionStats {
                card,
                placement: Placement::from_index(cell),
                forced: true,
                allotment: Duration::ZERO,
                elapsed: self.clock.now().saturating_sub(started),
                candidates: Vec::new(),
                best_average: f64::NEG_INFINITY,
                tied: 1,
            });
        }

        let allotment = self.params.time_policy.per_candidate(
            millis_remaining,
            session.remaining_cells(),
            legal.len(),
        );

        let mut candidates = Vec::with_capacity(legal.len());
        let mut best_average = f64::NEG_INFINITY;
        let mut best = CellList::new();
        for &cell in legal.as_slice() {
            let index = usize::from(cell);
            session.place_index(card, index)?;
            let outcome = self.run_rollouts(session, allotment);
            session.undo()?;
            let (rollouts, total_score) = outcome?;

            let average = if rollouts == 0 {
                f64::NEG_INFINITY
            } else {
                total_score as f64 / rollouts as f64
            };
            if average > best_average {
                best_average = average;
                best.clear();
            }
            if average >= best_average {
                best.push(cell);
            }
            candidates.push(CandidateStats {
                cell: index,
                rollouts,
                total_score,
                average,
            });
        }

        let chosen = best
            .choose(&mut self.rng)
            .map(usize::from)
            .ok_or(SessionError::GridFull)?;
        session.place_index(card, chosen)?;

        Ok(DecisionStats {
            card,
            placement: Placement::from_index(chosen),
            forced: false,
            allotment,
            elapsed: self.clock.now().saturating_sub(started),
            candidates,
            best_average,
            tied: best.len(),
        })
    }

    fn run_rollouts(
        &mut self,
        session: &mut SearchSession,
        allotment: Duration,
    ) -> Result<(u64, i64), SearchError> {
        let deadline = self.clock.now() + allotment;
        let mut rollouts = 0u64;
        let mut total = 0i64;
        while self.clock.now() < deadline {
            let score = rollout::simulate(
                session,
                self.params.depth_limit,
                &self.system,
                &self.resolver,
                &mut self.rng,
            )?;
            total += i64::from(score);
            rollouts += 1;
        }
        Ok((rollouts, total))
    }
}
