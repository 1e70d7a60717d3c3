use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub search: SearchTelemetrySummary,
    pub games: GameTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct SearchTelemetrySummary {
    pub count: usize,
    pub forced: usize,
    pub avg_rollouts: Option<f64>,
    pub avg_candidates: Option<f64>,
    pub avg_tied: Option<f64>,
    pub avg_allotment_us: Option<f64>,
    /// Decisions where at least one candidate finished no rollout.
    pub starved_decisions: usize,
    pub player_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct GameTelemetrySummary {
    pub plays: usize,
    pub forfeit_counts: BTreeMap<String, usize>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate the search and game events captured in a JSON telemetry log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut search = SearchTelemetrySummary::default();
    let mut rollouts_avg = Average::new();
    let mut candidate_avg = Average::new();
    let mut tied_avg = Average::new();
    let mut allotment_avg = Average::new();

    let mut games = GameTelemetrySummary::default();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            "squares_bot::search" => {
                search.count += 1;

                let forced = fields
                    .get("forced")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if forced {
                    search.forced += 1;
                } else {
                    if let Some(rollouts) = fields.get("rollouts").and_then(Value::as_f64) {
                        rollouts_avg.add(rollouts);
                    }
                    if let Some(count) = fields.get("candidates").and_then(Value::as_f64) {
                        candidate_avg.add(count);
                    }
                    if let Some(tied) = fields.get("tied").and_then(Value::as_f64) {
                        tied_avg.add(tied);
                    }
                    if let Some(allotment) = fields.get("allotment_us").and_then(Value::as_f64) {
                        allotment_avg.add(allotment);
                    }
                }

                if fields
                    .get("starved")
                    .and_then(Value::as_u64)
                    .is_some_and(|starved| starved > 0)
                {
                    search.starved_decisions += 1;
                }

                let player = label(&fields, "player");
                *search.player_counts.entry(player).or_insert(0) += 1;
            }
            "squares_bench::play" => {
                games.plays += 1;
            }
            "squares_bench::forfeit" => {
                let agent = label(&fields, "agent");
                *games.forfeit_counts.entry(agent).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    search.avg_rollouts = rollouts_avg.mean();
    search.avg_candidates = candidate_avg.mean();
    search.avg_tied = tied_avg.mean();
    search.avg_allotment_us = allotment_avg.mean();

    Ok(TelemetrySummary { search, games })
}

fn label(fields: &serde_json::Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("<unset>")
        .to_string()
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    let search = &outputs.summary.search;
    section.push_str(&format!("- Search decisions captured: {}\n", search.count));
    section.push_str(&format!("- Forced placements: {}\n", search.forced));
    if let Some(value) = search.avg_rollouts {
        section.push_str(&format!("- Avg rollouts per decision: {:.1}\n", value));
    }
    if let Some(value) = search.avg_candidates {
        section.push_str(&format!("- Avg candidate cells: {:.2}\n", value));
    }
    if let Some(value) = search.avg_tied {
        section.push_str(&format!("- Avg tied best cells: {:.2}\n", value));
    }
    if search.starved_decisions > 0 {
        section.push_str(&format!(
            "- Decisions with starved candidates: {}\n",
            search.starved_decisions
        ));
    }

    let games = &outputs.summary.games;
    section.push_str("\n### Forfeits\n");
    if games.forfeit_counts.is_empty() {
        section.push_str("- <none>\n");
    } else {
        for (label, count) in &games.forfeit_counts {
            section.push_str(&format!("- {}: {}\n", label, count));
        }
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Search Decisions\n");
    output.push_str(&format!("- Events: {}\n", summary.search.count));
    output.push_str(&format!("- Forced: {}\n", summary.search.forced));
    if let Some(value) = summary.search.avg_rollouts {
        output.push_str(&format!("- Avg rollouts: {:.1}\n", value));
    }
    if let Some(value) = summary.search.avg_candidates {
        output.push_str(&format!("- Avg candidates: {:.2}\n", value));
    }
    if let Some(value) = summary.search.avg_tied {
        output.push_str(&format!("- Avg tied: {:.2}\n", value));
    }
    if let Some(value) = summary.search.avg_allotment_us {
        output.push_str(&format!("- Avg allotment per candidate: {:.0} µs\n", value));
    }
    output.push_str(&format!(
        "- Starved decisions: {}\n",
        summary.search.starved_decisions
    ));
    if !summary.search.player_counts.is_empty() {
        output.push_str("- Players:\n");
        for (label, count) in &summary.search.player_counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    output.push('\n');

    output.push_str("## Games\n");
    output.push_str(&format!("- Plays applied: {}\n", summary.games.plays));
    if summary.games.forfeit_counts.is_empty() {
        output.push_str("- Forfeits: <none>\n");
    } else {
        output.push_str("- Forfeits:\n");
        for (label, count) in &summary.games.forfeit_counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
