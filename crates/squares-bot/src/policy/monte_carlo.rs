use super::Player;
use crate::bot::{
    Clock, DEFAULT_DEPTH_LIMIT, DecisionStats, SearchController, SearchError, SearchParams,
    SearchSession, SystemClock,
};
use squares_core::model::card::Card;
use squares_core::model::grid::Placement;
use squares_core::scoring::PointSystem;
use tracing::{Level, event};

/// Monte Carlo player: rollouts from every candidate cell, each rollout
/// step placed by the parallel greedy resolver.
#[derive(Debug)]
pub struct MonteCarloPlayer<C: Clock = SystemClock> {
    name: String,
    session: SearchSession,
    search: SearchController<C>,
    last_stats: Option<DecisionStats>,
}

impl MonteCarloPlayer<SystemClock> {
    pub fn new(system: PointSystem) -> Result<Self, SearchError> {
        Self::with_params(system, SearchParams::default())
    }

    pub fn with_depth(system: PointSystem, depth_limit: usize) -> Result<Self, SearchError> {
        Self::with_params(system, SearchParams::with_depth(depth_limit))
    }

    pub fn with_params(system: PointSystem, params: SearchParams) -> Result<Self, SearchError> {
        Self::with_clock(system, params, SystemClock::new())
    }

    pub fn from_env(system: PointSystem) -> Result<Self, SearchError> {
        Self::with_params(system, SearchParams::from_env())
    }
}

impl<C: Clock> MonteCarloPlayer<C> {
    pub fn with_clock(
        system: PointSystem,
        params: SearchParams,
        clock: C,
    ) -> Result<Self, SearchError> {
        let name = if params.depth_limit == DEFAULT_DEPTH_LIMIT {
            "monte-carlo".to_string()
        } else {
            format!("monte-carlo-d{}", params.depth_limit)
        };
        Ok(Self {
            name,
            session: SearchSession::new(),
            search: SearchController::new(system, params, clock)?,
            last_stats: None,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn params(&self) -> &SearchParams {
        self.search.params()
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn last_stats(&self) -> Option<&DecisionStats> {
        self.last_stats.as_ref()
    }
}

impl<C: Clock + Send> Player for MonteCarloPlayer<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_point_system(&mut self, system: PointSystem) {
        self.search.set_system(system);
    }

    fn init(&mut self) {
        self.session.reset();
        self.last_stats = None;
    }

    fn get_play(&mut self, card: Card, millis_remaining: u64) -> Result<Placement, SearchError> {
        let stats = self.search.decide(&mut self.session, card, millis_remaining)?;
        log_decision(&self.name, &stats, self.search.params().depth_limit, millis_remaining);
        let placement = stats.placement;
        self.last_stats = Some(stats);
        Ok(placement)
    }

    fn last_decision(&self) -> Option<&DecisionStats> {
        self.last_stats.as_ref()
    }
}

fn decision_details_enabled() -> bool {
    std::env::var("SQUARES_DECISION_DETAILS")
        .map(|raw| matches!(raw.trim(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(false)
}

fn log_decision(player: &str, stats: &DecisionStats, depth_limit: usize, millis_remaining: u64) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    let best_average = if stats.best_average.is_finite() {
        stats.best_average
    } else {
        -1.0
    };

    event!(
        target: "squares_bot::search",
        Level::INFO,
        player,
        card = %stats.card,
        row = stats.placement.row,
        col = stats.placement.col,
        forced = stats.forced,
        candidates = stats.candidates.len(),
        rollouts = stats.total_rollouts(),
        starved = stats.starved(),
        tied = stats.tied,
        best_average,
        depth_limit,
        millis_remaining,
        allotment_us = u64::try_from(stats.allotment.as_micros()).unwrap_or(u64::MAX),
        elapsed_us = u64::try_from(stats.elapsed.as_micros()).unwrap_or(u64::MAX),
    );

    if !decision_details_enabled() {
        return;
    }

    for candidate in &stats.candidates {
        event!(
            target: "squares_bot::search::candidate",
            Level::DEBUG,
            player,
            card = %stats.card,
            cell = candidate.cell,
            rollouts = candidate.rollouts,
            total_score = candidate.total_score,
            average = candidate.average,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::MonteCarloPlayer;
    use crate::bot::{SearchParams, TickClock};
    use crate::policy::Player;
    use core::time::Duration;
    use squares_core::game::match_state::MatchState;
    use squares_core::scoring::PointSystem;

    fn tick_player(depth: usize, seed: u64) -> MonteCarloPlayer<TickClock> {
        let params = SearchParams {
            depth_limit: depth,
            seed: Some(seed),
            ..SearchParams::default()
        };
        MonteCarloPlayer::with_clock(
            PointSystem::american(),
            params,
            TickClock::new(Duration::from_millis(1)),
        )
        .unwrap()
    }

    #[test]
    fn plays_a_complete_game_against_the_driver() {
        let mut player = tick_player(2, 17);
        player.init();
        let mut state = MatchState::with_seed_and_budget(17, 2_000);
        while !state.is_complete() {
            let card = state.next_card().unwrap();
            let placement = player.get_play(card, state.millis_remaining()).unwrap();
            state.apply_play(placement, Duration::ZERO).unwrap();
        }
        assert!(state.grid().is_full());
        assert_eq!(player.session().grid(), state.grid());
        assert!(player.last_stats().unwrap().forced);
    }

    #[test]
    fn init_clears_previous_game() {
        let mut player = tick_player(1, 2);
        player.init();
        player.get_play("AS".parse().unwrap(), 500).unwrap();
        assert_eq!(player.session().num_plays(), 1);
        player.init();
        assert_eq!(player.session().num_plays(), 0);
        assert!(player.last_stats().is_none());
        // The same card may be dealt again in the next game.
        player.get_play("AS".parse().unwrap(), 500).unwrap();
    }

    #[test]
    fn name_reflects_depth_limit() {
        assert_eq!(tick_player(20, 0).name(), "monte-carlo");
        assert_eq!(tick_player(5, 0).name(), "monte-carlo-d5");
        assert_eq!(tick_player(5, 0).named("mc").name(), "mc");
    }
}
