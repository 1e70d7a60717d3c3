use serde::{Deserialize, Serialize};
use squares_bot::bot::{SearchParams, TimePolicy};
use squares_core::game::match_state::DEFAULT_GAME_MILLIS;
use squares_core::scoring::{HandKind, PointSystem};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_LATENCY_BUDGET_MS: u64 = 1_200;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub games: GamesConfig,
    #[serde(default)]
    pub point_system: PointSystemConfig,
    pub agents: Vec<AgentConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.games.validate()?;
        self.point_system.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.metrics.validate(&self.agents)?;
        self.logging.normalize();
        validate_agents(&mut self.agents)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Deal sampling and clock configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    pub count: usize,
    /// Wall-clock budget for all 25 decisions of one game.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::field(
                "games.count",
                "number of games must be greater than zero",
            ));
        }

        if self.budget_ms == 0 {
            return Err(ValidationError::field(
                "games.budget_ms",
                "time budget must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn default_budget_ms() -> u64 {
    DEFAULT_GAME_MILLIS
}

/// Scoring table used for every game of the run.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointSystemConfig {
    #[default]
    American,
    British,
    Random {
        seed: u64,
    },
    Table {
        #[serde(default)]
        name: Option<String>,
        values: Vec<i32>,
    },
}

impl PointSystemConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let PointSystemConfig::Table { values, .. } = self
            && values.len() != HandKind::COUNT
        {
            return Err(ValidationError::field(
                "point_system.values",
                format!(
                    "expected {} values (high card to royal flush) but found {}",
                    HandKind::COUNT,
                    values.len()
                ),
            ));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<PointSystem, ValidationError> {
        Ok(match self {
            PointSystemConfig::American => PointSystem::american(),
            PointSystemConfig::British => PointSystem::british(),
            PointSystemConfig::Random { seed } => PointSystem::random(*seed),
            PointSystemConfig::Table { name, values } => {
                let table: [i32; HandKind::COUNT] = values.as_slice().try_into().map_err(|_| {
                    ValidationError::field(
                        "point_system.values",
                        format!("expected {} values", HandKind::COUNT),
                    )
                })?;
                PointSystem::from_table(name.clone().unwrap_or_else(|| "custom".into()), table)
            }
        })
    }
}

/// Definition of a benchmark participant.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

impl AgentConfig {
    /// Search parameters from `params`: `depth`, `threads`, `time_policy`
    /// and `seed`. Missing keys keep the player defaults.
    pub fn search_params(&self) -> Result<SearchParams, ValidationError> {
        let mut search = SearchParams::default();
        if self.params.is_null() {
            return Ok(search);
        }

        let field = |key: &str| format!("agents[{}].params.{key}", self.name);
        let mapping = self.params.as_mapping().ok_or_else(|| {
            ValidationError::field(
                format!("agents[{}].params", self.name),
                "expected a mapping of search parameters",
            )
        })?;

        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(ValidationError::field(
                    format!("agents[{}].params", self.name),
                    "parameter names must be strings",
                ));
            };
            match key {
                "depth" => {
                    search.depth_limit = value
                        .as_u64()
                        .and_then(|depth| usize::try_from(depth).ok())
                        .ok_or_else(|| {
                            ValidationError::field(field(key), "expected a non-negative integer")
                        })?;
                }
                "threads" => {
                    let threads = value
                        .as_u64()
                        .filter(|count| *count > 0)
                        .and_then(|count| usize::try_from(count).ok())
                        .ok_or_else(|| {
                            ValidationError::field(field(key), "expected a positive integer")
                        })?;
                    search.threads = Some(threads);
                }
                "time_policy" => {
                    let text = value.as_str().unwrap_or_default();
                    search.time_policy = TimePolicy::parse(text).ok_or_else(|| {
                        ValidationError::field(
                            field(key),
                            format!("unknown time policy '{text}' (even_split or future_weighted)"),
                        )
                    })?;
                }
                "seed" => {
                    search.seed = Some(value.as_u64().ok_or_else(|| {
                        ValidationError::field(field(key), "expected a non-negative integer")
                    })?);
                }
                other => {
                    return Err(ValidationError::field(
                        format!("agents[{}].params", self.name),
                        format!("unknown parameter '{other}'"),
                    ));
                }
            }
        }

        Ok(search)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    MonteCarlo,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::field(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::field(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
    /// Average milliseconds per decision above which an agent is flagged.
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: None,
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
        }
    }
}

impl MetricsConfig {
    fn validate(&self, agents: &[AgentConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Err(ValidationError::field(
                "metrics.baseline",
                "baseline agent must be specified",
            ));
        };

        if !agents.iter().any(|a| &a.name == baseline) {
            return Err(ValidationError::field(
                "metrics.baseline",
                format!("baseline agent '{baseline}' is not defined in agents list"),
            ));
        }

        if self.latency_budget_ms == 0 {
            return Err(ValidationError::field(
                "metrics.latency_budget_ms",
                "latency budget must be greater than zero",
            ));
        }

        Ok(())
    }
}

fn default_latency_budget_ms() -> u64 {
    DEFAULT_LATENCY_BUDGET_MS
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Emit one event per candidate cell in addition to the decision event.
    #[serde(default)]
    pub decision_details: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            decision_details: false,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::field("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::field(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn validate_agents(agents: &mut [AgentConfig]) -> Result<(), ValidationError> {
    if agents.is_empty() {
        return Err(ValidationError::field(
            "agents",
            "at least one agent must be specified",
        ));
    }

    let mut seen = HashSet::new();
    for agent in agents.iter_mut() {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::field("agents.name", "agent name must not be empty"));
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::field(
                format!("agents[{}].name", agent.name),
                "agent name contains invalid characters",
            ));
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::field(
                "agents",
                format!("agent name '{}' defined more than once", agent.name),
            ));
        }

        if agent.params.is_null() {
            agent.params = serde_yaml::Value::Mapping(Default::default());
        }

        agent.search_params()?;
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Telemetry and its summaries sit next to the summary table.
    pub fn telemetry_dir(&self) -> PathBuf {
        match self.summary_md.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn telemetry_path(&self) -> PathBuf {
        self.telemetry_dir().join("telemetry.jsonl")
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "depth_sweep"
games:
  seed: 123
  count: 16
agents:
  - name: "mc_d20"
    kind: "monte_carlo"
    params:
      depth: 20
  - name: "mc_d2"
    kind: "monte_carlo"
    params:
      depth: 2
      threads: 2
outputs:
  jsonl: "bench/out/{run_id}/games.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
metrics:
  baseline: "mc_d20"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    fn parse(yaml: &str) -> BenchmarkConfig {
        serde_yaml::from_str(yaml).expect("parse yaml")
    }

    #[test]
    fn telemetry_sits_beside_summary_table() {
        let outputs = ResolvedOutputs {
            jsonl: PathBuf::from("out/games.jsonl"),
            summary_md: PathBuf::from("out/run/summary.md"),
            plots_dir: PathBuf::from("out/plots"),
        };
        assert_eq!(outputs.telemetry_dir(), PathBuf::from("out/run"));
        assert_eq!(
            outputs.telemetry_path(),
            PathBuf::from("out/run/telemetry.jsonl")
        );

        let bare = ResolvedOutputs {
            summary_md: PathBuf::from("summary.md"),
            ..outputs
        };
        assert_eq!(bare.telemetry_dir(), PathBuf::from("."));
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg = parse(BASIC_YAML);
        cfg.validate().expect("validate");

        assert_eq!(cfg.games.budget_ms, DEFAULT_GAME_MILLIS);
        assert_eq!(cfg.point_system, PointSystemConfig::American);
        assert_eq!(cfg.metrics.latency_budget_ms, DEFAULT_LATENCY_BUDGET_MS);
        assert!(cfg.logging.enable_structured);
        assert!(!cfg.logging.decision_details);

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/depth_sweep/games.jsonl")
        );
    }

    #[test]
    fn parses_point_system_variants() {
        let british = BASIC_YAML.replace("agents:", "point_system:\n  kind: british\nagents:");
        assert_eq!(parse(&british).point_system, PointSystemConfig::British);

        let random =
            BASIC_YAML.replace("agents:", "point_system:\n  kind: random\n  seed: 9\nagents:");
        let system = parse(&random).point_system.build().unwrap();
        assert_eq!(system, PointSystem::random(9));

        let table = BASIC_YAML.replace(
            "agents:",
            "point_system:\n  kind: table\n  name: flat\n  values: [1, 1, 1, 1, 1, 1, 1, 1, 1, 1]\nagents:",
        );
        let system = parse(&table).point_system.build().unwrap();
        assert_eq!(system.name(), "flat");
        assert_eq!(system.points(HandKind::RoyalFlush), 1);
    }

    #[test]
    fn rejects_short_point_table() {
        let yaml = BASIC_YAML.replace(
            "agents:",
            "point_system:\n  kind: table\n  values: [0, 2, 5]\nagents:",
        );
        let err = parse(&yaml).validate().expect_err("short table");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "point_system.values"
        ));
    }

    #[test]
    fn rejects_missing_baseline() {
        let yaml = BASIC_YAML.replace("baseline: \"mc_d20\"\n", "");
        let err = parse(&yaml).validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "metrics.baseline"
        ));
    }

    #[test]
    fn rejects_duplicate_agents() {
        let yaml = BASIC_YAML.replace("name: \"mc_d2\"", "name: \"mc_d20\"");
        let err = parse(&yaml).validate().expect_err("duplicate agents should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents"
        ));
    }

    #[test]
    fn rejects_zero_games_and_zero_budget() {
        let yaml = BASIC_YAML.replace("count: 16", "count: 0");
        let err = parse(&yaml).validate().expect_err("zero games");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "games.count"
        ));

        let yaml = BASIC_YAML.replace("count: 16", "count: 16\n  budget_ms: 0");
        let err = parse(&yaml).validate().expect_err("zero budget");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "games.budget_ms"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("depth_sweep", "depth sweep");
        let err = parse(&yaml).validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn rejects_unknown_agent_kind() {
        let yaml = BASIC_YAML.replacen("monte_carlo", "flush", 1);
        assert!(serde_yaml::from_str::<BenchmarkConfig>(&yaml).is_err());
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/plots",
            "bench/out/{run_id}/{run_id}/plots",
        );
        let mut cfg = parse(&yaml);
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.plots_dir,
            PathBuf::from("bench/out/depth_sweep/depth_sweep/plots")
        );
    }

    #[test]
    fn search_params_default_when_unset() {
        let agent = AgentConfig {
            name: "mc".into(),
            kind: AgentKind::MonteCarlo,
            params: serde_yaml::Value::Null,
        };
        assert_eq!(agent.search_params().unwrap(), SearchParams::default());
    }

    #[test]
    fn search_params_parse_every_key() {
        let yaml = BASIC_YAML.replace(
            "      depth: 2\n      threads: 2",
            "      depth: 2\n      threads: 2\n      time_policy: future_weighted\n      seed: 77",
        );
        let mut cfg = parse(&yaml);
        cfg.validate().expect("valid");
        let params = cfg.agents[1].search_params().unwrap();
        assert_eq!(params.depth_limit, 2);
        assert_eq!(params.threads, Some(2));
        assert_eq!(params.time_policy, TimePolicy::FutureWeighted);
        assert_eq!(params.seed, Some(77));
    }

    #[test]
    fn rejects_bad_search_params() {
        for (from, to, field) in [
            ("threads: 2", "threads: 0", "agents[mc_d2].params.threads"),
            ("threads: 2", "time_policy: greedy", "agents[mc_d2].params.time_policy"),
            ("threads: 2", "style: flush", "agents[mc_d2].params"),
            (
                "depth: 2\n      threads",
                "depth: -2\n      threads",
                "agents[mc_d2].params.depth",
            ),
        ] {
            let mut cfg = parse(&BASIC_YAML.replace(from, to));
            let err = cfg.validate().unwrap_err();
            assert!(
                matches!(&err, ValidationError::InvalidField { field: f, .. } if f == field),
                "{to}: {err}"
            );
        }
    }
}
