use std::path::PathBuf;

use clap::Parser;

use squares_bench::config::BenchmarkConfig;
use squares_bench::logging::init_logging;
use squares_bench::tournament::{RunSummary, TournamentRunner};

/// Play seeded Poker Squares deals against every configured agent and
/// report scores, timing and paired comparisons against a baseline.
#[derive(Debug, Parser)]
#[command(name = "squares-bench", author, version)]
struct Cli {
    /// YAML file describing deals, agents and outputs.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Replace `run_id`; `{run_id}` in output paths follows it.
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Number of deals to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Seed for the deal sequence.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Wall-clock allowance for one whole game, in milliseconds.
    #[arg(long, value_name = "MILLIS")]
    budget_ms: Option<u64>,

    /// Check the configuration and agent parameters, then exit.
    #[arg(long)]
    validate_only: bool,

    /// Also log one event per candidate cell of each decision.
    #[arg(long)]
    log_decision_details: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<BenchmarkConfig> {
        let mut config = BenchmarkConfig::from_path(&self.config)?;
        if let Some(run_id) = &self.run_id {
            config.run_id = run_id.clone();
        }
        if let Some(games) = self.games {
            config.games.count = games;
        }
        if self.seed.is_some() {
            config.games.seed = self.seed;
        }
        if let Some(budget_ms) = self.budget_ms {
            config.games.budget_ms = budget_ms;
        }
        config.logging.decision_details |= self.log_decision_details;
        // Overrides can break what the file alone satisfied.
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    let outputs = config.resolved_outputs();
    let run_id = config.run_id.clone();

    println!(
        "{run_id}: {} deals, {} agents, {} ms per game",
        config.games.count,
        config.agents.len(),
        config.games.budget_ms
    );

    if cli.validate_only {
        // Building the runner parses every agent's search parameters.
        TournamentRunner::new(config, outputs)?;
        println!("Validation-only mode: configuration is valid, no games played.");
        return Ok(());
    }

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = TournamentRunner::new(config, outputs)?;
    println!("Scoring with the {} point system", runner.point_system().name());

    let summary = runner.run()?;
    report(&run_id, &summary);
    Ok(())
}

fn report(run_id: &str, summary: &RunSummary) {
    println!(
        "{run_id}: wrote {} rows ({} deals x {} agents) to {}",
        summary.rows_written,
        summary.games_played,
        summary.agents,
        summary.jsonl_path.display()
    );
    println!("  summary:   {}", summary.summary_path.display());
    if let Some(path) = &summary.plot_path {
        println!("  plot:      {}", path.display());
    }
    if let Some(path) = &summary.telemetry_path {
        println!("  telemetry: {}", path.display());
    }
    let Some(telemetry) = &summary.telemetry_outputs else {
        return;
    };
    println!(
        "  telemetry summaries: {} and {}",
        telemetry.json_path.display(),
        telemetry.markdown_path.display()
    );
    let search = &telemetry.summary.search;
    match search.avg_rollouts {
        Some(avg) => println!("  {} decisions logged, {avg:.1} rollouts on average", search.count),
        None => println!("  {} decisions logged", search.count),
    }
    for (agent, forfeits) in &telemetry.summary.games.forfeit_counts {
        println!("  {agent} forfeited {forfeits} game(s) on time");
    }
}
