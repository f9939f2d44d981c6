//! Game and per-episode condition configuration
//!
//! [`GameConfig`] is the serde-facing description of one game: symbols,
//! paytable, reel sets, win model, features and freespin tables. It is
//! compiled once into a [`crate::Game`] and shared read-only. A
//! [`ConditionSet`] is the resolved distribution bucket an orchestrator hands
//! to every episode.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};
use crate::features::{FeatureIntensity, FeatureSet};
use crate::multiplier::MultiplierGridConfig;
use crate::paytable::PayEntry;
use crate::sampler::WeightedTable;
use crate::symbols::SymbolDef;
use crate::wins::WinModel;

/// Base game or freegame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "basegame")]
    Base,
    #[serde(rename = "freegame")]
    Free,
}

impl GameType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "basegame",
            Self::Free => "freegame",
        }
    }
}

/// A value per game type; freegame falls back to the basegame value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByGameType<T> {
    pub basegame: T,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub freegame: Option<T>,
}

impl<T> ByGameType<T> {
    pub fn both(value: T) -> Self {
        Self { basegame: value, freegame: None }
    }

    pub fn split(basegame: T, freegame: T) -> Self {
        Self { basegame, freegame: Some(freegame) }
    }

    pub fn get(&self, gametype: GameType) -> &T {
        match gametype {
            GameType::Base => &self.basegame,
            GameType::Free => self.freegame.as_ref().unwrap_or(&self.basegame),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.basegame).chain(self.freegame.iter())
    }
}

/// Scatter count → freespins awarded, per game type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreespinTriggers {
    /// Entry table
    #[serde(default)]
    pub basegame: BTreeMap<u32, u32>,
    /// Retrigger table
    #[serde(default)]
    pub freegame: BTreeMap<u32, u32>,
}

impl FreespinTriggers {
    /// Award for `count` scatters: the entry with the largest count not
    /// above `count`, nothing below the smallest entry
    pub fn award(&self, gametype: GameType, count: u32) -> Option<u32> {
        let table = match gametype {
            GameType::Base => &self.basegame,
            GameType::Free => &self.freegame,
        };
        table.range(..=count).next_back().map(|(_, spins)| *spins)
    }

    /// Smallest scatter count that awards anything
    pub fn min_count(&self, gametype: GameType) -> Option<u32> {
        let table = match gametype {
            GameType::Base => &self.basegame,
            GameType::Free => &self.freegame,
        };
        table.keys().next().copied()
    }
}

/// Freegame tier selected at entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusTier {
    pub name: String,
    /// Entry scatter count from which this tier applies
    pub min_triggers: u32,
    #[serde(default)]
    pub intensity: FeatureIntensity,
    /// Freegame reel weights for this tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reel_weights: Option<WeightedTable<String>>,
}

/// Independent overlay strips that swap sentinel cells for a replacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Overlay reel set → weight
    pub reels: WeightedTable<String>,
    pub sentinel: String,
    pub replacement: String,
}

/// Capability strips gating reel-level features per reel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub reels: WeightedTable<String>,
    /// Capability symbol that allows the reel
    pub permit: String,
}

/// Resolved distribution conditions for one episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSet {
    pub criteria: String,
    /// Exact total win the episode must produce to be kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_criteria: Option<f64>,
    pub reel_weights: ByGameType<WeightedTable<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<ByGameType<OverlayConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<ByGameType<CapabilityConfig>>,
    /// Multiplier tags for wilds on the board
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mult_values: Option<ByGameType<WeightedTable<u32>>>,
    /// Forced scatter count on the base reveal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scatter_triggers: Option<WeightedTable<u32>>,
    #[serde(default)]
    pub force_wincap: bool,
    #[serde(default)]
    pub force_freegame: bool,
    /// Tier used on freegame entry instead of the count-based choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_tier: Option<String>,
}

impl ConditionSet {
    pub fn new(criteria: impl Into<String>, reel_weights: ByGameType<WeightedTable<String>>) -> Self {
        Self {
            criteria: criteria.into(),
            win_criteria: None,
            reel_weights,
            overlay: None,
            capability: None,
            mult_values: None,
            scatter_triggers: None,
            force_wincap: false,
            force_freegame: false,
            bonus_tier: None,
        }
    }

    /// Single reel set for every game type
    pub fn single_reel_set(criteria: impl Into<String>, reel_set: &str) -> EngineResult<Self> {
        let weights = WeightedTable::new(vec![(reel_set.to_string(), 1.0)])?;
        Ok(Self::new(criteria, ByGameType::both(weights)))
    }

    pub fn with_win_criteria(mut self, win: f64) -> Self {
        self.win_criteria = Some(win);
        self
    }

    pub fn with_overlay(mut self, overlay: ByGameType<OverlayConfig>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_capability(mut self, capability: ByGameType<CapabilityConfig>) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn with_mult_values(mut self, values: ByGameType<WeightedTable<u32>>) -> Self {
        self.mult_values = Some(values);
        self
    }

    pub fn with_forced_freegame(mut self, scatter_triggers: WeightedTable<u32>) -> Self {
        self.force_freegame = true;
        self.scatter_triggers = Some(scatter_triggers);
        self
    }

    pub fn with_forced_wincap(mut self) -> Self {
        self.force_wincap = true;
        self
    }

    pub fn with_bonus_tier(mut self, tier: impl Into<String>) -> Self {
        self.bonus_tier = Some(tier.into());
        self
    }
}

/// One distribution bucket of a bet mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    /// Share of the simulation sampled under this bucket
    pub quota: f64,
    pub conditions: ConditionSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetMode {
    pub name: String,
    #[serde(default = "default_cost")]
    pub cost: f64,
    pub distributions: Vec<Distribution>,
}

fn default_cost() -> f64 {
    1.0
}

fn default_global_multiplier() -> f64 {
    1.0
}

fn default_force_attempts() -> usize {
    100
}

/// Complete game description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_id: String,
    /// Maximum payout per episode, as a multiple of stake
    pub wincap: f64,
    /// Visible rows per reel
    pub num_rows: Vec<usize>,
    pub symbols: Vec<SymbolDef>,
    pub win_model: WinModel,
    pub paytable: Vec<PayEntry>,
    /// Reel set name → one strip (symbol names) per reel
    pub reels: BTreeMap<String, Vec<Vec<String>>>,
    /// Winning symbols are removed and refilled
    #[serde(default)]
    pub tumble: bool,
    /// Cascade bound per reveal; defaults to cells × 8
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cascades: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier_grid: Option<MultiplierGridConfig>,
    #[serde(default)]
    pub freespin_triggers: FreespinTriggers,
    #[serde(default)]
    pub features: FeatureSet,
    /// Feature intensity outside bonus tiers
    #[serde(default)]
    pub base_intensity: FeatureIntensity,
    #[serde(default)]
    pub bonus_tiers: Vec<BonusTier>,
    #[serde(default = "default_global_multiplier")]
    pub global_multiplier: f64,
    /// Board redraws allowed when forcing a scatter count
    #[serde(default = "default_force_attempts")]
    pub max_force_attempts: usize,
    #[serde(default)]
    pub bet_modes: Vec<BetMode>,
}

impl GameConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SpinError::config(format!("cannot read {}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&text),
            _ => Self::from_json(&text),
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn num_cells(&self) -> usize {
        self.num_rows.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_uses_largest_key_not_above_count() {
        let mut triggers = FreespinTriggers::default();
        triggers.basegame.insert(4, 10);
        triggers.basegame.insert(5, 12);
        triggers.freegame.insert(2, 3);
        triggers.freegame.insert(3, 5);

        assert_eq!(triggers.award(GameType::Base, 3), None);
        assert_eq!(triggers.award(GameType::Base, 4), Some(10));
        assert_eq!(triggers.award(GameType::Base, 7), Some(12));
        assert_eq!(triggers.award(GameType::Free, 3), Some(5));
        assert_eq!(triggers.min_count(GameType::Base), Some(4));
    }

    #[test]
    fn test_by_gametype_falls_back_to_base() {
        let only_base = ByGameType::both(1);
        assert_eq!(*only_base.get(GameType::Free), 1);
        let split = ByGameType::split(1, 2);
        assert_eq!(*split.get(GameType::Free), 2);
        assert_eq!(split.values().count(), 2);
    }

    #[test]
    fn test_condition_set_from_json() {
        let json = r#"{
            "criteria": "freegame",
            "reel_weights": {"basegame": {"BR0": 1}, "freegame": {"FR0": 3, "FR1": 1}},
            "scatter_triggers": {"4": 5, "5": 1},
            "force_freegame": true
        }"#;
        let conditions: ConditionSet = serde_json::from_str(json).unwrap();
        assert!(conditions.force_freegame);
        assert!(!conditions.force_wincap);
        assert_eq!(conditions.reel_weights.get(GameType::Free).len(), 2);
        assert_eq!(conditions.scatter_triggers.unwrap().len(), 2);
    }

    #[test]
    fn test_gametype_names() {
        assert_eq!(serde_json::to_string(&GameType::Free).unwrap(), r#""freegame""#);
        assert_eq!(GameType::Base.as_str(), "basegame");
    }
}
