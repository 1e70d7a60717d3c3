use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

/// Keeps the background writer alive; dropping it flushes the telemetry file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Route every `tracing` event of the run into a JSON-lines file next to the
/// summary table. Returns `None` when structured logging is off.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
    run_id: &str,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    export_run_env(logging, run_id);

    let telemetry_path = outputs.telemetry_path();
    let file = create_telemetry_file(&telemetry_path)?;
    let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(logging)));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!(
            "WARN: a tracing subscriber is already installed; events will not reach {}",
            telemetry_path.display()
        );
    }

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path,
    }))
}

/// Players read these when they are built, so this runs while the process is
/// still single-threaded.
fn export_run_env(logging: &LoggingConfig, run_id: &str) {
    unsafe {
        std::env::set_var("SQUARES_BENCH_RUN_ID", run_id);
        if logging.decision_details {
            std::env::set_var("SQUARES_DECISION_DETAILS", "1");
        }
    }
}

fn create_telemetry_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    File::create(path).with_context(|| format!("creating telemetry file at {}", path.display()))
}

/// Default `EnvFilter` directives when `RUST_LOG` is unset. Candidate events
/// are DEBUG, so they need their own directive to pass an INFO filter.
fn filter_directives(logging: &LoggingConfig) -> String {
    let level = logging.level().unwrap_or(Level::INFO);
    if logging.decision_details {
        format!("{level},squares_bot::search::candidate=debug")
    } else {
        level.to_string()
    }
}
