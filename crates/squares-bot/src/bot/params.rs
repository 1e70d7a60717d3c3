use core::time::Duration;

/// Rollout depth used when nothing else is configured.
pub const DEFAULT_DEPTH_LIMIT: usize = 20;

/// How the remaining game budget is divided into a per-candidate allotment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimePolicy {
    /// `millis / remaining_cells / candidates`.
    #[default]
    EvenSplit,
    /// Skips the last cell, which is always forced and costs no search time.
    FutureWeighted,
}

impl TimePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "even" | "even_split" | "evensplit" => Some(TimePolicy::EvenSplit),
            "future" | "future_weighted" | "futureweighted" => Some(TimePolicy::FutureWeighted),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TimePolicy::EvenSplit => "even_split",
            TimePolicy::FutureWeighted => "future_weighted",
        }
    }

    /// Time each candidate may spend on rollouts. Zero when `millis` is zero.
    pub fn per_candidate(self, millis: u64, remaining_cells: usize, candidates: usize) -> Duration {
        let decisions = match self {
            TimePolicy::EvenSplit => remaining_cells,
            TimePolicy::FutureWeighted => remaining_cells.saturating_sub(1),
        }
        .max(1);
        let divisor = decisions.saturating_mul(candidates.max(1));
        let divisor = u32::try_from(divisor).unwrap_or(u32::MAX);
        Duration::from_millis(millis) / divisor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub depth_limit: usize,
    /// Dedicated worker count for placement resolution; `None` uses the
    /// global rayon pool.
    pub threads: Option<usize>,
    pub time_policy: TimePolicy,
    /// Fixes the search RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            threads: None,
            time_policy: TimePolicy::default(),
            seed: None,
        }
    }
}

impl SearchParams {
    pub fn with_depth(depth_limit: usize) -> Self {
        Self {
            depth_limit,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let depth_limit = read("SQUARES_DEPTH_LIMIT")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(defaults.depth_limit);

        let threads = read("SQUARES_THREADS")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|count| *count > 0);

        let time_policy = read("SQUARES_TIME_POLICY")
            .and_then(|raw| TimePolicy::parse(&raw))
            .unwrap_or(defaults.time_policy);

        let seed = read("SQUARES_SEED").and_then(|raw| raw.trim().parse::<u64>().ok());

        Self {
            depth_limit,
            threads,
            time_policy,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_DEPTH_LIMIT, SearchParams, TimePolicy};
    use core::time::Duration;
    use std::collections::HashMap;

    fn params_from(vars: &[(&str, &str)]) -> SearchParams {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SearchParams::from_reader(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let params = params_from(&[]);
        assert_eq!(params, SearchParams::default());
        assert_eq!(params.depth_limit, DEFAULT_DEPTH_LIMIT);
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let params = params_from(&[
            ("SQUARES_DEPTH_LIMIT", "3"),
            ("SQUARES_THREADS", "0"),
            ("SQUARES_TIME_POLICY", "future"),
            ("SQUARES_SEED", "not-a-number"),
        ]);
        assert_eq!(params.depth_limit, 3);
        assert_eq!(params.threads, None);
        assert_eq!(params.time_policy, TimePolicy::FutureWeighted);
        assert_eq!(params.seed, None);
    }

    #[test]
    fn even_split_divides_by_cells_and_candidates() {
        let allotment = TimePolicy::EvenSplit.per_candidate(30_000, 25, 25);
        assert_eq!(allotment, Duration::from_millis(48));
    }

    #[test]
    fn allotment_keeps_sub_millisecond_precision() {
        let allotment = TimePolicy::EvenSplit.per_candidate(1, 10, 10);
        assert_eq!(allotment, Duration::from_micros(10));
        assert!(allotment > Duration::ZERO);
    }

    #[test]
    fn zero_budget_yields_zero_allotment() {
        assert_eq!(
            TimePolicy::EvenSplit.per_candidate(0, 5, 5),
            Duration::ZERO
        );
    }

    #[test]
    fn future_weighted_skips_the_forced_final_cell() {
        assert_eq!(
            TimePolicy::FutureWeighted.per_candidate(1_000, 2, 2),
            Duration::from_millis(500)
        );
        assert_eq!(
            TimePolicy::EvenSplit.per_candidate(1_000, 2, 2),
            Duration::from_millis(250)
        );
    }
}
