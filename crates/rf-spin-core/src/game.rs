//! Compiled, immutable game

use std::collections::HashSet;

use crate::config::{BetMode, BonusTier, ConditionSet, GameConfig, GameType};
use crate::error::{EngineResult, SpinError};
use crate::features::{CompiledFeatures, FeaturePhase};
use crate::multiplier::{GridPersistence, MultiplierGrid};
use crate::paytable::Paytable;
use crate::reels::ReelSets;
use crate::sampler::WeightedTable;
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};
use crate::wins::WinModel;

/// A validated game, shared read-only by every episode
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    symbols: SymbolTable,
    paytable: Paytable,
    reel_sets: ReelSets,
    features: CompiledFeatures,
    scatter: Option<SymbolId>,
    max_cascades: u32,
}

impl Game {
    /// Resolve names and validate everything that can be checked up front
    pub fn compile(config: GameConfig) -> EngineResult<Self> {
        if !config.wincap.is_finite() || config.wincap <= 0.0 {
            return Err(SpinError::config(format!("wincap {} must be positive", config.wincap)));
        }
        if !config.global_multiplier.is_finite() || config.global_multiplier <= 0.0 {
            return Err(SpinError::config(format!(
                "global multiplier {} must be positive",
                config.global_multiplier
            )));
        }
        if config.num_rows.is_empty() {
            return Err(SpinError::config("game has no reels"));
        }
        if let Some(reel) = config.num_rows.iter().position(|&r| r == 0) {
            return Err(SpinError::config(format!("reel {reel} has no rows")));
        }

        let symbols = SymbolTable::new(config.symbols.clone())?;
        let paytable = Paytable::compile(&config.paytable, &symbols)?;
        let reel_sets = ReelSets::compile(&config.reels, &symbols)?;
        if reel_sets.is_empty() {
            return Err(SpinError::config("game has no reel sets"));
        }
        for set in reel_sets.iter() {
            if set.num_reels() != config.num_rows.len() {
                return Err(SpinError::config(format!(
                    "reel set '{}' has {} reels, game has {}",
                    set.name,
                    set.num_reels(),
                    config.num_rows.len()
                )));
            }
        }

        if let WinModel::Lines { paylines, .. } = &config.win_model {
            if paylines.is_empty() {
                return Err(SpinError::config("lines game has no paylines"));
            }
            for line in paylines {
                let fits = line.rows.len() == config.num_rows.len()
                    && line.rows.iter().zip(&config.num_rows).all(|(row, rows)| row < rows);
                if !fits {
                    return Err(SpinError::config(format!(
                        "payline {} does not fit the board",
                        line.index
                    )));
                }
            }
        }

        if let Some(grid) = &config.multiplier_grid {
            grid.validate()?;
        }

        let features = CompiledFeatures::compile(&config.features, &symbols)?;
        if features.has_phase(FeaturePhase::AfterSettle) && !config.tumble {
            return Err(SpinError::config(
                "after-settle features need a tumbling game",
            ));
        }

        config.base_intensity.validate()?;
        let mut tier_names = HashSet::new();
        for tier in &config.bonus_tiers {
            if !tier_names.insert(tier.name.as_str()) {
                return Err(SpinError::config(format!("duplicate bonus tier '{}'", tier.name)));
            }
            tier.intensity.validate()?;
            if let Some(weights) = &tier.reel_weights {
                check_reel_weights(&reel_sets, weights)?;
            }
        }

        let scatter = symbols.first_of(SymbolKind::Scatter);
        let triggers = &config.freespin_triggers;
        if scatter.is_none() && !(triggers.basegame.is_empty() && triggers.freegame.is_empty()) {
            return Err(SpinError::config("freespin triggers configured without a scatter symbol"));
        }
        if let Some((count, _)) = triggers
            .basegame
            .iter()
            .chain(triggers.freegame.iter())
            .find(|(_, spins)| **spins == 0)
        {
            return Err(SpinError::config(format!("freespin award for {count} scatters is zero")));
        }

        let max_cascades = config
            .max_cascades
            .unwrap_or((config.num_cells() * 8) as u32);
        if max_cascades == 0 {
            return Err(SpinError::config("cascade bound must be positive"));
        }

        let game = Self {
            symbols,
            paytable,
            reel_sets,
            features,
            scatter,
            max_cascades,
            config,
        };

        for mode in &game.config.bet_modes {
            if mode.distributions.is_empty() {
                return Err(SpinError::config(format!("bet mode '{}' has no distributions", mode.name)));
            }
            for dist in &mode.distributions {
                if !dist.quota.is_finite() || dist.quota <= 0.0 {
                    return Err(SpinError::config(format!(
                        "bet mode '{}' criteria '{}' has quota {}",
                        mode.name, dist.conditions.criteria, dist.quota
                    )));
                }
                game.validate_conditions(&dist.conditions)?;
            }
        }

        log::debug!(
            "compiled game '{}': {} symbols, {} reel sets, {} model",
            game.config.game_id,
            game.symbols.len(),
            game.reel_sets.len(),
            game.config.win_model.name()
        );
        Ok(game)
    }

    /// Check a condition set against this game's symbols, reels and tiers
    pub fn validate_conditions(&self, conditions: &ConditionSet) -> EngineResult<()> {
        for weights in conditions.reel_weights.values() {
            check_reel_weights(&self.reel_sets, weights)?;
        }
        if let Some(overlay) = &conditions.overlay {
            for o in overlay.values() {
                check_reel_weights(&self.reel_sets, &o.reels)?;
                self.symbols.id(&o.sentinel)?;
                self.symbols.id(&o.replacement)?;
            }
        }
        if let Some(capability) = &conditions.capability {
            for c in capability.values() {
                check_reel_weights(&self.reel_sets, &c.reels)?;
                self.symbols.id(&c.permit)?;
            }
        }
        if conditions.scatter_triggers.is_some() && self.scatter.is_none() {
            return Err(SpinError::config(format!(
                "criteria '{}' forces scatters but the game has none",
                conditions.criteria
            )));
        }
        if let Some(tier) = &conditions.bonus_tier {
            self.tier(tier)?;
        }
        if let Some(win) = conditions.win_criteria {
            if !win.is_finite() || win < 0.0 || win > self.config.wincap {
                return Err(SpinError::config(format!(
                    "criteria '{}' targets unreachable win {win}",
                    conditions.criteria
                )));
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn paytable(&self) -> &Paytable {
        &self.paytable
    }

    pub fn reel_sets(&self) -> &ReelSets {
        &self.reel_sets
    }

    pub fn features(&self) -> &CompiledFeatures {
        &self.features
    }

    pub fn scatter(&self) -> Option<SymbolId> {
        self.scatter
    }

    pub fn max_cascades(&self) -> u32 {
        self.max_cascades
    }

    pub fn wincap(&self) -> f64 {
        self.config.wincap
    }

    pub fn num_rows(&self) -> &[usize] {
        &self.config.num_rows
    }

    /// Fresh grid for an episode (inert without grid configuration)
    pub fn new_grid(&self) -> MultiplierGrid {
        match &self.config.multiplier_grid {
            Some(grid) => MultiplierGrid::new(&self.config.num_rows, grid.cap),
            None => MultiplierGrid::inert(&self.config.num_rows),
        }
    }

    pub fn grid_persistence(&self) -> GridPersistence {
        self.config
            .multiplier_grid
            .as_ref()
            .map(|g| g.persistence)
            .unwrap_or_default()
    }

    pub fn tier(&self, name: &str) -> EngineResult<&BonusTier> {
        self.config
            .bonus_tiers
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SpinError::config(format!("unknown bonus tier '{name}'")))
    }

    /// Highest tier whose threshold the entry scatter count reaches
    pub fn tier_for_count(&self, scatters: u32) -> Option<&BonusTier> {
        self.config
            .bonus_tiers
            .iter()
            .filter(|t| t.min_triggers <= scatters)
            .max_by_key(|t| t.min_triggers)
    }

    pub fn bet_mode(&self, name: &str) -> EngineResult<&BetMode> {
        self.config
            .bet_modes
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| SpinError::config(format!("unknown bet mode '{name}'")))
    }

    /// Conditions of one criteria within a bet mode
    pub fn conditions(&self, mode: &str, criteria: &str) -> EngineResult<&ConditionSet> {
        self.bet_mode(mode)?
            .distributions
            .iter()
            .map(|d| &d.conditions)
            .find(|c| c.criteria == criteria)
            .ok_or_else(|| {
                SpinError::config(format!("bet mode '{mode}' has no criteria '{criteria}'"))
            })
    }

    /// Freespin award for a scatter count
    pub fn freespin_award(&self, gametype: GameType, scatters: u32) -> Option<u32> {
        self.config.freespin_triggers.award(gametype, scatters)
    }
}

fn check_reel_weights(sets: &ReelSets, weights: &WeightedTable<String>) -> EngineResult<()> {
    for name in weights.keys() {
        if !sets.contains(name) {
            return Err(SpinError::config(format!("missing reel set '{name}'")));
        }
    }
    Ok(())
}
