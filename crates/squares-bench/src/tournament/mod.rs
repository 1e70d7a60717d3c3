use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use squares_bot::bot::{SearchError, SearchParams};
use squares_bot::policy::{MonteCarloPlayer, Player};
use squares_core::game::match_state::{MatchError, MatchState};
use squares_core::scoring::PointSystem;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{AgentConfig, AgentKind, BenchmarkConfig, ResolvedOutputs, ValidationError};
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

/// Primary entry point for orchestrating benchmark runs.
pub struct TournamentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    agents: Vec<AgentBlueprint>,
    system: PointSystem,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub agents: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = AgentBlueprint::from_configs(&config.agents)?;
        let system = config.point_system.build()?;

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            agents,
            system,
        })
    }

    pub fn point_system(&self) -> &PointSystem {
        &self.system
    }

    /// Play every configured game with every agent, streaming JSONL rows to
    /// disk. All agents see the same sequence of deals.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut players = self
            .agents
            .iter()
            .map(|agent| agent.spawn_player(self.system.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        for game_index in 0..self.config.games.count {
            let deal_seed = rng.next_u64();
            let mut results = Vec::with_capacity(players.len());
            for (agent, player) in self.agents.iter().zip(players.iter_mut()) {
                results.push(self.play_game(game_index, deal_seed, &agent.name, player.as_mut())?);
            }
            let outcome = GameOutcome { deal_seed, results };
            analytics.record_game(game_index, &outcome)?;
            rows_written += write_game_rows(
                &mut writer,
                &self.config,
                self.system.name(),
                game_index,
                &outcome,
            )?;
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_dir = self.outputs.telemetry_dir();
        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.telemetry_path());

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir)?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            games_played: self.config.games.count,
            agents: self.agents.len(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
        })
    }

    /// One full game under the real clock. A decision that overruns the
    /// remaining budget forfeits the game.
    fn play_game(
        &self,
        game_index: usize,
        deal_seed: u64,
        agent_name: &str,
        player: &mut dyn Player,
    ) -> Result<AgentResult, RunnerError> {
        let mut state = MatchState::with_seed_and_budget(deal_seed, self.config.games.budget_ms);
        let mut metrics = DecisionMetrics::default();
        player.init();

        while !state.is_complete() {
            let card = state
                .next_card()
                .map_err(|err| RunnerError::game(agent_name, err))?;
            let millis_remaining = state.millis_remaining();
            let start = Instant::now();
            let placement = player.get_play(card, millis_remaining)?;
            let elapsed = start.elapsed();
            let elapsed_ms = metrics.record(elapsed, player);

            match state.apply_play(placement, elapsed) {
                Ok(()) => {}
                Err(MatchError::OutOfTime {
                    elapsed_ms,
                    remaining_ms,
                }) => {
                    if self.logging_enabled && tracing::enabled!(Level::WARN) {
                        event!(
                            target: "squares_bench::forfeit",
                            Level::WARN,
                            run_id = %self.config.run_id,
                            game_index = game_index as u32,
                            agent = agent_name,
                            card = %card,
                            elapsed_ms,
                            remaining_ms
                        );
                    }
                    break;
                }
                Err(err) => return Err(RunnerError::game(agent_name, err)),
            }

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "squares_bench::play",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index = game_index as u32,
                    agent = agent_name,
                    card = %card,
                    row = placement.row,
                    col = placement.col,
                    millis_remaining,
                    elapsed_ms
                );
            }
        }

        let kinds = PointSystem::line_kinds(state.grid());
        let mut hands = BTreeMap::new();
        for kind in kinds {
            *hands.entry(kind.as_str().to_string()).or_insert(0usize) += 1;
        }

        Ok(AgentResult {
            agent_name: agent_name.to_string(),
            score: state.final_score(&self.system),
            timed_out: state.timed_out(),
            millis_remaining: state.millis_remaining(),
            hands,
            metrics: metrics.finalize(),
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    point_system: &str,
    game_index: usize,
    outcome: &GameOutcome,
) -> Result<usize, RunnerError> {
    let game_id = format!("G{game_index:05}");

    let mut rows_written = 0usize;
    for result in &outcome.results {
        let row = GameLogRow {
            run_id: config.run_id.clone(),
            game_id: game_id.clone(),
            game_index,
            deal_seed: outcome.deal_seed,
            agent: result.agent_name.clone(),
            point_system: point_system.to_string(),
            score: result.score,
            timed_out: result.timed_out,
            millis_remaining: result.millis_remaining,
            decisions: result.metrics.decisions,
            speed_ms_decision: result.metrics.avg_ms_per_decision,
            rollouts: result.metrics.rollouts,
            forced_plays: result.metrics.forced,
            hands: result.hands.clone(),
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

pub struct GameOutcome {
    pub deal_seed: u64,
    pub results: Vec<AgentResult>,
}

pub struct AgentResult {
    pub agent_name: String,
    pub score: i32,
    pub timed_out: bool,
    pub millis_remaining: u64,
    /// Count of rows and columns per hand kind on the final grid.
    pub hands: BTreeMap<String, usize>,
    pub metrics: DecisionSummary,
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
    rollouts: u64,
    forced: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration, player: &dyn Player) -> f64 {
        self.total += duration;
        self.decisions += 1;
        if let Some(stats) = player.last_decision() {
            self.rollouts += stats.total_rollouts();
            if stats.forced {
                self.forced += 1;
            }
        }
        duration.as_secs_f64() * 1000.0
    }

    fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
            rollouts: self.rollouts,
            forced: self.forced,
        }
    }
}

#[derive(Clone)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
    pub rollouts: u64,
    pub forced: u32,
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    deal_seed: u64,
    agent: String,
    point_system: String,
    score: i32,
    timed_out: bool,
    millis_remaining: u64,
    decisions: u32,
    speed_ms_decision: f64,
    rollouts: u64,
    forced_plays: u32,
    hands: BTreeMap<String, usize>,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Config(#[from] ValidationError),
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed for agent '{agent}': {source}")]
    Game { agent: String, source: MatchError },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl RunnerError {
    fn game(agent: &str, source: MatchError) -> Self {
        RunnerError::Game {
            agent: agent.to_string(),
            source,
        }
    }
}

struct AgentBlueprint {
    name: String,
    implementation: AgentImplementation,
}

enum AgentImplementation {
    MonteCarlo(SearchParams),
}

impl AgentBlueprint {
    fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, ValidationError> {
        configs.iter().map(Self::from_config).collect()
    }

    fn from_config(config: &AgentConfig) -> Result<Self, ValidationError> {
        let implementation = match config.kind {
            AgentKind::MonteCarlo => AgentImplementation::MonteCarlo(config.search_params()?),
        };

        Ok(Self {
            name: config.name.clone(),
            implementation,
        })
    }

    fn spawn_player(&self, system: PointSystem) -> Result<Box<dyn Player>, SearchError> {
        match self.implementation {
            AgentImplementation::MonteCarlo(params) => Ok(Box::new(
                MonteCarloPlayer::with_params(system, params)?.named(self.name.clone()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metrics_average_to_zero() {
        let summary = DecisionMetrics::default().finalize();
        assert_eq!(summary.decisions, 0);
        assert_eq!(summary.avg_ms_per_decision, 0.0);
        assert_eq!(summary.rollouts, 0);
    }

    #[test]
    fn metrics_average_over_decisions() {
        let player = MonteCarloPlayer::with_depth(PointSystem::american(), 1).unwrap();
        let mut metrics = DecisionMetrics::default();
        metrics.record(Duration::from_millis(30), &player);
        metrics.record(Duration::from_millis(10), &player);
        let summary = metrics.finalize();
        assert_eq!(summary.decisions, 2);
        assert!((summary.avg_ms_per_decision - 20.0).abs() < 1e-9);
        assert!((summary.total_ms - 40.0).abs() < 1e-9);
        assert_eq!(summary.forced, 0);
    }

    #[test]
    fn blueprints_carry_search_params() {
        let config = AgentConfig {
            name: "mc".into(),
            kind: AgentKind::MonteCarlo,
            params: serde_yaml::from_str("{depth: 3, time_policy: future_weighted}").unwrap(),
        };
        let blueprint = AgentBlueprint::from_config(&config).unwrap();
        let AgentImplementation::MonteCarlo(params) = blueprint.implementation;
        assert_eq!(params.depth_limit, 3);
        let player = blueprint.spawn_player(PointSystem::british()).unwrap();
        assert_eq!(player.name(), "mc");
    }
}
