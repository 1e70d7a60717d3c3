use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig};
use crate::tournament::{DecisionSummary, GameOutcome};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in tournament results")]
    MissingBaseline(String),
    #[error("agent '{0}' defined in results but missing from configuration")]
    UnknownAgent(String),
    #[error("baseline '{0}' missing for game {1}")]
    MissingBaselineGame(String, String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    agent_order: Vec<String>,
    latency_budget_ms: u64,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(
                    agent.name.clone(),
                    agent.clone(),
                    config.metrics.latency_budget_ms,
                ),
            );
            order.push(agent.name.clone());
        }

        Ok(Self {
            baseline,
            agents,
            comparisons: HashMap::new(),
            agent_order: order,
            latency_budget_ms: config.metrics.latency_budget_ms,
        })
    }

    /// Fold one deal into the per-agent totals. Every agent played the same
    /// cards, so score differences against the baseline are paired samples.
    pub fn record_game(
        &mut self,
        game_index: usize,
        outcome: &GameOutcome,
    ) -> Result<(), AnalyticsError> {
        let game_id = format!("G{game_index:05}");

        let best_score = outcome
            .results
            .iter()
            .map(|result| result.score)
            .max()
            .unwrap_or(0);

        let baseline_score = outcome
            .results
            .iter()
            .find(|result| result.agent_name == self.baseline)
            .map(|result| f64::from(result.score))
            .ok_or_else(|| {
                AnalyticsError::MissingBaselineGame(self.baseline.clone(), game_id.clone())
            })?;

        for result in &outcome.results {
            let acc = self
                .agents
                .get_mut(&result.agent_name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(result.agent_name.clone()))?;

            acc.record_game(
                f64::from(result.score),
                result.score == best_score,
                result.timed_out,
                &result.metrics,
            );
        }

        for result in &outcome.results {
            if result.agent_name == self.baseline {
                continue;
            }
            let diff = f64::from(result.score) - baseline_score;
            self.comparisons
                .entry(result.agent_name.clone())
                .or_insert_with(ComparisonAccumulator::new)
                .record(diff);
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.agent_order {
            if let Some(acc) = self.agents.remove(name) {
                reports.push(acc.into_report());
            }
        }

        let mut comparisons = Vec::new();
        for report in &reports {
            if report.name == self.baseline {
                comparisons.push(ComparisonReport {
                    agent: report.name.clone(),
                    p_value: 1.0,
                    sample_size: report.games,
                });
                continue;
            }
            let (p_value, sample_size) = match self.comparisons.remove(&report.name) {
                Some(comp) => comp.wilcoxon_signed_rank(),
                None => (1.0, 0),
            };
            comparisons.push(ComparisonReport {
                agent: report.name.clone(),
                p_value,
                sample_size,
            });
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
            latency_budget_ms: self.latency_budget_ms,
        }
        .enrich())
    }
}

struct AgentAccumulator {
    name: String,
    config: AgentConfig,
    total_score: f64,
    games: u32,
    wins: u32,
    forfeits: u32,
    per_game_scores: Vec<f64>,
    total_latency_ms: f64,
    total_decisions: u64,
    total_rollouts: u64,
    latency_budget_ms: u64,
}

impl AgentAccumulator {
    fn new(name: String, config: AgentConfig, latency_budget_ms: u64) -> Self {
        Self {
            name,
            config,
            total_score: 0.0,
            games: 0,
            wins: 0,
            forfeits: 0,
            per_game_scores: Vec::new(),
            total_latency_ms: 0.0,
            total_decisions: 0,
            total_rollouts: 0,
            latency_budget_ms,
        }
    }

    fn record_game(
        &mut self,
        score: f64,
        is_best: bool,
        forfeited: bool,
        metrics: &DecisionSummary,
    ) {
        self.total_score += score;
        self.games += 1;
        self.per_game_scores.push(score);
        if is_best {
            self.wins += 1;
        }
        if forfeited {
            self.forfeits += 1;
        }
        self.total_latency_ms += metrics.total_ms;
        self.total_decisions += u64::from(metrics.decisions);
        self.total_rollouts += metrics.rollouts;
    }

    fn into_report(self) -> AgentReport {
        let avg_score = if self.games == 0 {
            0.0
        } else {
            self.total_score / f64::from(self.games)
        };

        let avg_latency = if self.total_decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_decisions as f64
        };

        let avg_rollouts = if self.total_decisions == 0 {
            0.0
        } else {
            self.total_rollouts as f64 / self.total_decisions as f64
        };

        AgentReport {
            name: self.name,
            kind: self.config.kind,
            params: self.config.params,
            games: self.games as usize,
            avg_score,
            ci95: confidence_interval(&self.per_game_scores),
            wins: self.wins as usize,
            forfeits: self.forfeits as usize,
            average_ms_per_decision: avg_latency,
            average_rollouts_per_decision: avg_rollouts,
            delta_vs_baseline: 0.0,
            over_budget: avg_latency > self.latency_budget_ms as f64,
        }
    }
}

/// Paired per-game score differences of one agent against the baseline.
#[derive(Clone, Default)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    fn wilcoxon_signed_rank(self) -> (f64, usize) {
        wilcoxon_signed_rank(&self.diffs)
    }
}

/// Two-sided Wilcoxon signed-rank test under the normal approximation with
/// continuity and tie corrections. Zero differences are dropped. Returns the
/// p-value and the number of non-zero pairs.
fn wilcoxon_signed_rank(diffs: &[f64]) -> (f64, usize) {
    let mut magnitudes: Vec<(f64, bool)> = diffs
        .iter()
        .filter(|d| d.abs() > f64::EPSILON)
        .map(|d| (d.abs(), *d > 0.0))
        .collect();
    let n = magnitudes.len();
    if n == 0 {
        return (1.0, 0);
    }
    magnitudes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (ranks, tie_groups) = average_ranks(&magnitudes);
    let w_plus: f64 = ranks
        .iter()
        .zip(&magnitudes)
        .filter(|(_, (_, positive))| *positive)
        .map(|(rank, _)| *rank)
        .sum();
    let total = (n * (n + 1)) as f64 / 2.0;
    let w = w_plus.min(total - w_plus);

    let n_f = n as f64;
    let mean_w = total / 2.0;
    let tie_adjustment: f64 = tie_groups
        .into_iter()
        .map(|size| {
            let t = size as f64;
            (t.powi(3) - t) / 48.0
        })
        .sum();
    let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
    if variance_w <= 0.0 {
        return (1.0, n);
    }

    let z = ((w - mean_w).abs() - 0.5).max(0.0) / variance_w.sqrt();
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return (1.0, n);
    };
    let p = 2.0 * (1.0 - normal.cdf(z));
    (p.clamp(0.0, 1.0), n)
}

/// 1-based ranks for values already sorted by magnitude; tied magnitudes
/// share their mean rank. Also returns the size of every tie group.
fn average_ranks(sorted: &[(f64, bool)]) -> (Vec<f64>, Vec<usize>) {
    let mut ranks = Vec::with_capacity(sorted.len());
    let mut tie_groups = Vec::new();
    let mut start = 0;
    while start < sorted.len() {
        let end = sorted[start..]
            .iter()
            .position(|(value, _)| (value - sorted[start].0).abs() >= 1e-12)
            .map_or(sorted.len(), |offset| start + offset);
        let rank = (start + end + 1) as f64 / 2.0;
        ranks.extend(std::iter::repeat_n(rank, end - start));
        if end - start > 1 {
            tie_groups.push(end - start);
        }
        start = end;
    }
    (ranks, tie_groups)
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
    pub latency_budget_ms: u64,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .agents
            .iter()
            .find(|agent| agent.name == self.baseline)
            .map(|agent| agent.avg_score)
            .unwrap_or(0.0);

        for agent in &mut self.agents {
            agent.delta_vs_baseline = agent.avg_score - baseline_avg;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Tournament Summary\n\n");
        rows.push_str(&format!(
            "Latency budget: {} ms average per decision\n\n",
            self.latency_budget_ms
        ));
        rows.push_str("| Agent | Kind | Games | Avg score | Δ vs baseline | 95% CI | Best % | Forfeits | Avg ms/decision | Rollouts/decision | Over Budget | p-value |\n");
        rows.push_str("|-------|------|-------|-----------|---------------|--------|--------|----------|-----------------|-------------------|-------------|---------|\n");

        for agent in &self.agents {
            let comparison = self
                .comparisons
                .iter()
                .find(|c| c.agent == agent.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);
            let win_rate = if agent.games == 0 {
                0.0
            } else {
                agent.wins as f64 / agent.games as f64
            };

            rows.push_str(&format!(
                "| {name} | {kind:?} | {games} | {avg:.2} | {delta:+.2} | [{ci_low:.2}, {ci_high:.2}] | {win:.1}% | {forfeits} | {latency:.2} | {rollouts:.1} | {over_budget} | {pval:.3} |\n",
                name = agent.name,
                kind = agent.kind,
                games = agent.games,
                avg = agent.avg_score,
                delta = agent.delta_vs_baseline,
                ci_low = agent.ci95.0,
                ci_high = agent.ci95.1,
                win = win_rate * 100.0,
                forfeits = agent.forfeits,
                latency = agent.average_ms_per_decision,
                rollouts = agent.average_rollouts_per_decision,
                over_budget = if agent.over_budget { "Yes" } else { "No" },
                pval = comparison,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("delta_score.png");
        let baseline = self.baseline.clone();
        let agents_snapshot = self.agents.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut agents = agents_snapshot;
            agents.sort_by(|a, b| a.delta_vs_baseline.total_cmp(&b.delta_vs_baseline));

            // Each agent's confidence interval, shifted onto the delta axis.
            let bars: Vec<(f64, f64, f64)> = agents
                .iter()
                .map(|agent| {
                    let baseline_avg = agent.avg_score - agent.delta_vs_baseline;
                    (
                        agent.ci95.0 - baseline_avg,
                        agent.delta_vs_baseline,
                        agent.ci95.1 - baseline_avg,
                    )
                })
                .collect();

            let y_range_min = bars.iter().map(|bar| bar.0).fold(0.0f64, f64::min);
            let y_range_max = bars.iter().map(|bar| bar.2).fold(0.0f64, f64::max);
            let margin = ((y_range_max - y_range_min).abs() * 0.1).max(1.0);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(
                    "Score delta vs baseline (higher is better)",
                    ("sans-serif", 22),
                )
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(
                    0.0..agents.len() as f64,
                    (y_range_min - margin)..(y_range_max + margin),
                )
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(agents.len())
                .y_desc("Δ mean score vs baseline")
                .x_desc("Agent")
                .x_label_formatter(&|x| {
                    agents
                        .get(x.floor() as usize)
                        .map(|agent| agent.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(agents.iter().enumerate().map(|(idx, agent)| {
                    let color = if agent.name == baseline {
                        &BLUE
                    } else if agent.delta_vs_baseline >= 0.0 {
                        &GREEN
                    } else {
                        &RED
                    };
                    let left = idx as f64 + 0.15;
                    Rectangle::new(
                        [(left, 0.0), (left + 0.7, agent.delta_vs_baseline)],
                        color.filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(bars.iter().enumerate().map(|(idx, &(low, mid, high))| {
                    ErrorBar::new_vertical(idx as f64 + 0.5, low, mid, high, BLACK.filled(), 12)
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub params: serde_yaml::Value,
    pub games: usize,
    pub avg_score: f64,
    pub ci95: (f64, f64),
    /// Games where this agent matched or beat every other agent.
    pub wins: usize,
    pub forfeits: usize,
    pub average_ms_per_decision: f64,
    pub average_rollouts_per_decision: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
    #[serde(skip)]
    pub over_budget: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn confidence_interval(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    if scores.len() == 1 {
        return (mean, mean);
    }
    let variance = scores
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (scores.len() as f64 - 1.0);
    let std_error = (variance / scores.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_scores_give_no_evidence() {
        let mut comp = ComparisonAccumulator::new();
        for _ in 0..10 {
            comp.record(0.0);
        }
        assert_eq!(comp.wilcoxon_signed_rank(), (1.0, 0));
    }

    #[test]
    fn consistent_improvement_is_significant() {
        let mut comp = ComparisonAccumulator::new();
        for diff in 1..=30 {
            comp.record(f64::from(diff));
        }
        let (p, n) = comp.wilcoxon_signed_rank();
        assert_eq!(n, 30);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn balanced_differences_are_not_significant() {
        let mut comp = ComparisonAccumulator::new();
        for diff in 1..=20 {
            comp.record(f64::from(diff));
            comp.record(-f64::from(diff));
        }
        let (p, _) = comp.wilcoxon_signed_rank();
        assert!(p > 0.5, "p = {p}");
    }

    #[test]
    fn ties_share_their_mean_rank() {
        let sorted = [(1.0, true), (2.0, false), (2.0, true), (2.0, true), (5.0, false)];
        let (ranks, ties) = average_ranks(&sorted);
        assert_eq!(ranks, vec![1.0, 3.0, 3.0, 3.0, 5.0]);
        assert_eq!(ties, vec![3]);
    }

    #[test]
    fn confidence_interval_brackets_the_mean() {
        let (low, high) = confidence_interval(&[80.0, 90.0, 100.0, 110.0, 120.0]);
        assert!(low < 100.0 && high > 100.0);
        assert!((low + high) / 2.0 - 100.0 < 1e-9);
        assert_eq!(confidence_interval(&[42.0]), (42.0, 42.0));
        assert_eq!(confidence_interval(&[]), (0.0, 0.0));
    }
}
