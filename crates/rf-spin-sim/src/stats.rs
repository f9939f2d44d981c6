//! Per-episode statistics and their batch reduction
//!
//! Money is accumulated in integer minor units so the reduction is exact and
//! the batch result does not depend on how rayon split the work.

use std::collections::BTreeMap;

use rf_spin_core::{EpisodeResult, FeatureKind, to_minor_units};
use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// What one episode contributes to a batch
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStats {
    /// Stake in minor units
    pub cost: i64,
    pub total_win: i64,
    pub basegame_win: i64,
    pub freegame_win: i64,
    pub satisfied: bool,
    pub wincap: bool,
    pub freegame: bool,
    pub retriggers: u32,
    pub freespins_played: u32,
    pub cascades: u32,
    pub max_cascade_depth: u32,
    pub highest_grid_multiplier: u32,
    pub base_scatters: u32,
    pub near_miss: bool,
    pub cluster_sizes: BTreeMap<u32, u32>,
    pub wins_by_symbol: BTreeMap<String, i64>,
    pub feature_triggers: BTreeMap<FeatureKind, u32>,
}

impl EpisodeStats {
    pub fn from_result(result: &EpisodeResult, cost: f64) -> Self {
        Self {
            cost: to_minor_units(cost),
            total_win: result.payout_cents(),
            basegame_win: to_minor_units(result.basegame_win),
            freegame_win: to_minor_units(result.freegame_win),
            satisfied: result.satisfied,
            wincap: result.wincap_triggered,
            freegame: result.freegame_triggered,
            retriggers: result.retriggers,
            freespins_played: result.freespins_played,
            cascades: result.cascades,
            max_cascade_depth: result.max_cascade_depth,
            highest_grid_multiplier: result.highest_grid_multiplier,
            base_scatters: result.base_scatter_count,
            near_miss: result.near_miss,
            cluster_sizes: result.cluster_sizes.clone(),
            wins_by_symbol: result
                .wins_by_symbol
                .iter()
                .map(|(name, amount)| (name.clone(), to_minor_units(*amount)))
                .collect(),
            feature_triggers: result.feature_triggers.clone(),
        }
    }
}

/// Reduced statistics of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Episodes that completed
    pub episodes: u64,
    /// Episodes whose forced draw could not be produced
    pub degenerate: u64,
    /// Episodes skipped after an abort
    pub skipped: u64,
    pub staked: i64,
    pub total_win: i64,
    pub basegame_win: i64,
    pub freegame_win: i64,
    /// Episodes with a nonzero win
    pub hits: u64,
    pub satisfied: u64,
    pub wincap_hits: u64,
    pub max_win: i64,
    pub freegame_triggers: u64,
    pub retriggers: u64,
    pub freespins_played: u64,
    pub cascades: u64,
    pub max_cascade_depth: u32,
    pub highest_grid_multiplier: u32,
    pub near_misses: u64,
    /// Base scatter count → episodes
    pub scatter_counts: BTreeMap<u32, u64>,
    pub cluster_sizes: BTreeMap<u32, u64>,
    pub wins_by_symbol: BTreeMap<String, i64>,
    pub feature_triggers: BTreeMap<FeatureKind, u64>,
}

impl BatchStats {
    pub fn record(&mut self, episode: &EpisodeStats) {
        self.episodes += 1;
        self.staked += episode.cost;
        self.total_win += episode.total_win;
        self.basegame_win += episode.basegame_win;
        self.freegame_win += episode.freegame_win;
        self.hits += u64::from(episode.total_win > 0);
        self.satisfied += u64::from(episode.satisfied);
        self.wincap_hits += u64::from(episode.wincap);
        self.max_win = self.max_win.max(episode.total_win);
        self.freegame_triggers += u64::from(episode.freegame);
        self.retriggers += u64::from(episode.retriggers);
        self.freespins_played += u64::from(episode.freespins_played);
        self.cascades += u64::from(episode.cascades);
        self.max_cascade_depth = self.max_cascade_depth.max(episode.max_cascade_depth);
        self.highest_grid_multiplier =
            self.highest_grid_multiplier.max(episode.highest_grid_multiplier);
        self.near_misses += u64::from(episode.near_miss);
        *self.scatter_counts.entry(episode.base_scatters).or_default() += 1;
        for (size, n) in &episode.cluster_sizes {
            *self.cluster_sizes.entry(*size).or_default() += u64::from(*n);
        }
        for (symbol, amount) in &episode.wins_by_symbol {
            *self.wins_by_symbol.entry(symbol.clone()).or_default() += amount;
        }
        for (kind, n) in &episode.feature_triggers {
            *self.feature_triggers.entry(*kind).or_default() += u64::from(*n);
        }
    }

    /// Combine two partial reductions
    pub fn merge(mut self, other: BatchStats) -> BatchStats {
        self.episodes += other.episodes;
        self.degenerate += other.degenerate;
        self.skipped += other.skipped;
        self.staked += other.staked;
        self.total_win += other.total_win;
        self.basegame_win += other.basegame_win;
        self.freegame_win += other.freegame_win;
        self.hits += other.hits;
        self.satisfied += other.satisfied;
        self.wincap_hits += other.wincap_hits;
        self.max_win = self.max_win.max(other.max_win);
        self.freegame_triggers += other.freegame_triggers;
        self.retriggers += other.retriggers;
        self.freespins_played += other.freespins_played;
        self.cascades += other.cascades;
        self.max_cascade_depth = self.max_cascade_depth.max(other.max_cascade_depth);
        self.highest_grid_multiplier = self.highest_grid_multiplier.max(other.highest_grid_multiplier);
        self.near_misses += other.near_misses;
        for (k, v) in other.scatter_counts {
            *self.scatter_counts.entry(k).or_default() += v;
        }
        for (k, v) in other.cluster_sizes {
            *self.cluster_sizes.entry(k).or_default() += v;
        }
        for (k, v) in other.wins_by_symbol {
            *self.wins_by_symbol.entry(k).or_default() += v;
        }
        for (k, v) in other.feature_triggers {
            *self.feature_triggers.entry(k).or_default() += v;
        }
        self
    }

    /// Return to player: total win over total stake
    pub fn rtp(&self) -> f64 {
        ratio(self.total_win, self.staked)
    }

    pub fn base_rtp(&self) -> f64 {
        ratio(self.basegame_win, self.staked)
    }

    pub fn free_rtp(&self) -> f64 {
        ratio(self.freegame_win, self.staked)
    }

    pub fn hit_rate(&self) -> f64 {
        per_episode(self.hits, self.episodes)
    }

    pub fn freegame_rate(&self) -> f64 {
        per_episode(self.freegame_triggers, self.episodes)
    }

    /// Share of episodes meeting their conditions
    pub fn acceptance_rate(&self) -> f64 {
        per_episode(self.satisfied, self.episodes)
    }

    pub fn average_win(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.total_win as f64 / 100.0 / self.episodes as f64
        }
    }

    pub fn max_win_multiple(&self) -> f64 {
        self.max_win as f64 / 100.0
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn ratio(num: i64, den: i64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn per_episode(count: u64, episodes: u64) -> f64 {
    if episodes == 0 { 0.0 } else { count as f64 / episodes as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(win: f64, free: f64) -> EpisodeResult {
        EpisodeResult {
            total_win: win,
            basegame_win: win - free,
            freegame_win: free,
            freegame_triggered: free > 0.0,
            satisfied: true,
            base_scatter_count: if free > 0.0 { 4 } else { 1 },
            ..EpisodeResult::default()
        }
    }

    #[test]
    fn test_record_and_rates() {
        let mut stats = BatchStats::default();
        for result in [episode(0.0, 0.0), episode(2.5, 0.0), episode(12.0, 10.0), episode(0.0, 0.0)] {
            stats.record(&EpisodeStats::from_result(&result, 1.0));
        }
        assert_eq!(stats.episodes, 4);
        assert_eq!(stats.staked, 400);
        assert_eq!(stats.total_win, 1450);
        assert!((stats.rtp() - 3.625).abs() < 1e-12);
        assert!((stats.free_rtp() - 2.5).abs() < 1e-12);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-12);
        assert!((stats.freegame_rate() - 0.25).abs() < 1e-12);
        assert_eq!(stats.max_win, 1200);
        assert_eq!(stats.scatter_counts.get(&1), Some(&3));
    }

    #[test]
    fn test_merge_matches_sequential_record() {
        let results = [episode(1.0, 0.0), episode(3.0, 2.0), episode(0.0, 0.0)];
        let mut sequential = BatchStats::default();
        for r in &results {
            sequential.record(&EpisodeStats::from_result(r, 1.0));
        }

        let mut left = BatchStats::default();
        left.record(&EpisodeStats::from_result(&results[0], 1.0));
        let mut right = BatchStats::default();
        right.record(&EpisodeStats::from_result(&results[1], 1.0));
        right.record(&EpisodeStats::from_result(&results[2], 1.0));

        assert_eq!(left.merge(right), sequential);
    }

    #[test]
    fn test_empty_batch_rates_are_zero() {
        let stats = BatchStats::default();
        assert_eq!(stats.rtp(), 0.0);
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.average_win(), 0.0);
    }
}
