//! Parallel batch execution
//!
//! ```text
//! episodes 0..n ──par──► run_episode(conditions, base_seed + i)
//!                           │
//!                           ├── ok          → EpisodeStats → fold
//!                           ├── degenerate  → counted, batch continues
//!                           └── other error → abort flag set, batch fails
//!                                                │
//!                                 try_reduce ◄───┘
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rf_spin_core::{ConditionSet, SpinEngine};
use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::stats::{BatchStats, EpisodeStats};

/// Batch parameters
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub episodes: u64,
    /// Episode `i` runs from `derive_seed(base_seed, i)`
    pub base_seed: u64,
    /// Worker threads; all cores when `None`
    pub threads: Option<usize>,
    /// Stake per episode
    pub cost: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            base_seed: 0,
            threads: None,
            cost: 1.0,
        }
    }
}

impl BatchConfig {
    pub fn new(episodes: u64) -> Self {
        Self { episodes, ..Self::default() }
    }

    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// Cooperative cancellation shared with the workers
#[derive(Debug, Default)]
pub struct BatchControl {
    abort: AtomicBool,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Episodes not yet started are skipped
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }
}

/// Seed of episode `index`; replay one episode with
/// `engine.run_episode(conditions, derive_seed(base, index))`
pub fn derive_seed(base_seed: u64, index: u64) -> u64 {
    base_seed.wrapping_add(index)
}

/// Run `config.episodes` episodes under one condition set
pub fn run_batch(
    engine: &SpinEngine,
    conditions: &ConditionSet,
    config: &BatchConfig,
    control: &BatchControl,
) -> SimResult<BatchStats> {
    if config.episodes == 0 {
        return Err(SimError::InvalidBatch("batch has no episodes".to_string()));
    }
    if !config.cost.is_finite() || config.cost <= 0.0 {
        return Err(SimError::InvalidBatch(format!("episode cost {} must be positive", config.cost)));
    }
    engine.game().validate_conditions(conditions)?;

    let threads = config.threads.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SimError::ThreadPool(e.to_string()))?;

    log::info!(
        "batch '{}' on '{}': {} episodes, {threads} threads, base seed {}",
        conditions.criteria,
        engine.game().config().game_id,
        config.episodes,
        config.base_seed
    );

    let stats = pool.install(|| {
        (0..config.episodes)
            .into_par_iter()
            .try_fold(BatchStats::default, |mut stats, index| {
                if control.is_aborted() {
                    stats.skipped += 1;
                    return Ok(stats);
                }
                let seed = derive_seed(config.base_seed, index);
                match engine.run_episode(conditions, seed) {
                    Ok(result) => stats.record(&EpisodeStats::from_result(&result, config.cost)),
                    Err(e) if e.is_recoverable() => {
                        log::warn!("episode {index} (seed {seed}) rejected: {e}");
                        stats.degenerate += 1;
                    }
                    Err(e) => {
                        control.abort();
                        return Err(SimError::from(e));
                    }
                }
                Ok(stats)
            })
            .try_reduce(BatchStats::default, |a, b| Ok(a.merge(b)))
    })?;

    log::info!(
        "batch '{}' done: rtp {:.4}, hit rate {:.4}, {} degenerate, {} skipped",
        conditions.criteria,
        stats.rtp(),
        stats.hit_rate(),
        stats.degenerate,
        stats.skipped
    );
    Ok(stats)
}

/// Statistics of a whole bet mode, one batch per distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeReport {
    pub mode: String,
    pub cost: f64,
    pub by_criteria: BTreeMap<String, BatchStats>,
}

impl ModeReport {
    /// All distributions merged (episodes are already split by quota)
    pub fn combined(&self) -> BatchStats {
        self.by_criteria
            .values()
            .cloned()
            .fold(BatchStats::default(), BatchStats::merge)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Split `config.episodes` across a bet mode's distributions by quota and
/// run each; seeds do not overlap between distributions
pub fn run_bet_mode(
    engine: &SpinEngine,
    mode: &str,
    config: &BatchConfig,
    control: &BatchControl,
) -> SimResult<ModeReport> {
    let bet_mode = engine.game().bet_mode(mode)?;
    let counts = split_by_quota(
        config.episodes,
        &bet_mode.distributions.iter().map(|d| d.quota).collect::<Vec<_>>(),
    );

    let mut by_criteria = BTreeMap::new();
    let mut offset = 0u64;
    for (dist, episodes) in bet_mode.distributions.iter().zip(counts) {
        if episodes == 0 {
            continue;
        }
        let batch = BatchConfig {
            episodes,
            base_seed: derive_seed(config.base_seed, offset),
            threads: config.threads,
            cost: bet_mode.cost,
        };
        let stats = run_batch(engine, &dist.conditions, &batch, control)?;
        by_criteria.insert(dist.conditions.criteria.clone(), stats);
        offset += episodes;
    }

    Ok(ModeReport { mode: bet_mode.name.clone(), cost: bet_mode.cost, by_criteria })
}

/// Largest-remainder split of `total` by `quotas`
fn split_by_quota(total: u64, quotas: &[f64]) -> Vec<u64> {
    let sum: f64 = quotas.iter().sum();
    if quotas.is_empty() || sum <= 0.0 {
        return vec![0; quotas.len()];
    }
    let exact: Vec<f64> = quotas.iter().map(|q| total as f64 * q / sum).collect();
    let mut counts: Vec<u64> = exact.iter().map(|e| e.floor() as u64).collect();
    let mut remainder = total.saturating_sub(counts.iter().sum());

    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for i in order.into_iter().cycle() {
        if remainder == 0 {
            break;
        }
        counts[i] += 1;
        remainder -= 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_by_quota_sums_to_total() {
        let counts = split_by_quota(1000, &[0.001, 0.1, 0.4, 0.499]);
        assert_eq!(counts.iter().sum::<u64>(), 1000);
        assert_eq!(counts, vec![1, 100, 400, 499]);

        let counts = split_by_quota(7, &[1.0, 1.0, 1.0]);
        assert_eq!(counts, vec![3, 2, 2]);
    }

    #[test]
    fn test_derive_seed_wraps() {
        assert_eq!(derive_seed(10, 5), 15);
        assert_eq!(derive_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn test_control_abort() {
        let control = BatchControl::new();
        assert!(!control.is_aborted());
        control.abort();
        assert!(control.is_aborted());
    }
}
