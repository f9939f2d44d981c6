//! Guillotine blade drop
//!
//! A trigger on a reel either jams (stays inert) or drops: the trigger cell
//! and every cell below it become wilds carrying one reel multiplier. The
//! reel multiplier combines a base draw with one draw per beheaded symbol.
//!
//! ```text
//! reel 2        jam  → unchanged
//!   G  (row 1)  drop → W×m at rows 1..=last
//!   H1           m = combine(base, behead(H1), behead(L2))
//!   L2
//! ```

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{FeatureContext, FeatureEffect, FeatureKind};
use crate::board::{Board, Position};
use crate::error::{EngineResult, SpinError};
use crate::sampler::WeightedTable;
use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::wins::MultiplierCombine;

fn default_true() -> bool {
    true
}

fn default_behead_combine() -> MultiplierCombine {
    MultiplierCombine::Additive
}

/// Per-tier tuning of reel-level features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureIntensity {
    /// Jam outcome available; when false every trigger drops
    #[serde(default = "default_true")]
    pub jam_allowed: bool,
    /// Seed a trigger on every reveal that lacks one
    #[serde(default)]
    pub guaranteed_trigger: bool,
    /// Chance to seed a trigger on a reveal that lacks one
    #[serde(default)]
    pub force_trigger_chance: f64,
    #[serde(default = "default_behead_combine")]
    pub behead_combine: MultiplierCombine,
}

impl Default for FeatureIntensity {
    fn default() -> Self {
        Self {
            jam_allowed: true,
            guaranteed_trigger: false,
            force_trigger_chance: 0.0,
            behead_combine: default_behead_combine(),
        }
    }
}

impl FeatureIntensity {
    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.force_trigger_chance) {
            return Err(SpinError::config(format!(
                "force trigger chance {} outside [0, 1]",
                self.force_trigger_chance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JamOutcome {
    Jam,
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JamWeights {
    pub jam: f64,
    pub drop: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuillotineConfig {
    /// Base reel multiplier → weight
    pub reel_multipliers: WeightedTable<u32>,
    /// Per beheaded symbol: extra multiplier → weight
    #[serde(default)]
    pub behead: BTreeMap<String, WeightedTable<u32>>,
    pub jam_weights: JamWeights,
    /// Replaces excess triggers and scatters
    pub filler: String,
    /// At most one scatter per reel; extras become filler
    #[serde(default)]
    pub one_scatter_per_reel: bool,
}

#[cfg(test)]
impl GuillotineConfig {
    pub(crate) fn example() -> Self {
        let mut behead = BTreeMap::new();
        behead.insert("H1".to_string(), WeightedTable::new(vec![(3u32, 1.0)]).unwrap());
        behead.insert("L1".to_string(), WeightedTable::new(vec![(1u32, 1.0)]).unwrap());
        Self {
            reel_multipliers: WeightedTable::new(vec![(2u32, 1.0)]).unwrap(),
            behead,
            jam_weights: JamWeights { jam: 1.0, drop: 9.0 },
            filler: "X".into(),
            one_scatter_per_reel: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Guillotine {
    trigger: SymbolId,
    wild: SymbolId,
    filler: SymbolId,
    scatter: Option<SymbolId>,
    reel_multipliers: WeightedTable<u32>,
    behead: BTreeMap<SymbolId, WeightedTable<u32>>,
    jam: WeightedTable<JamOutcome>,
    one_scatter_per_reel: bool,
}

impl Guillotine {
    pub fn compile(config: &GuillotineConfig, symbols: &SymbolTable) -> EngineResult<Self> {
        let trigger = symbols
            .first_of(SymbolKind::Feature(FeatureKind::Guillotine))
            .ok_or_else(|| SpinError::config("guillotine configured without a trigger symbol"))?;
        let wild = symbols
            .first_of(SymbolKind::Wild)
            .ok_or_else(|| SpinError::config("guillotine needs a wild symbol"))?;
        let filler = symbols.id(&config.filler)?;
        if symbols.is_special(filler) {
            return Err(SpinError::config(format!(
                "guillotine filler '{}' must not be a special symbol",
                config.filler
            )));
        }

        let mut behead = BTreeMap::new();
        for (name, table) in &config.behead {
            behead.insert(symbols.id(name)?, table.clone());
        }

        let jam = WeightedTable::new(vec![
            (JamOutcome::Jam, config.jam_weights.jam),
            (JamOutcome::Drop, config.jam_weights.drop),
        ])?;

        Ok(Self {
            trigger,
            wild,
            filler,
            scatter: symbols.first_of(SymbolKind::Scatter),
            reel_multipliers: config.reel_multipliers.clone(),
            behead,
            jam,
            one_scatter_per_reel: config.one_scatter_per_reel,
        })
    }

    /// Shape a freshly drawn board: scatter limit and trigger seeding
    pub fn prepare_board<R: Rng + ?Sized>(
        &self,
        board: &mut Board,
        intensity: &FeatureIntensity,
        rng: &mut R,
    ) -> EngineResult<Vec<FeatureEffect>> {
        let mut effects = Vec::new();

        if let (true, Some(scatter)) = (self.one_scatter_per_reel, self.scatter) {
            for reel in 0..board.num_reels() {
                let extras: Vec<Position> = (0..board.rows(reel))
                    .map(|row| Position::new(reel, row))
                    .filter(|p| board.get(*p).is_some_and(|s| s.id == scatter))
                    .skip(1)
                    .collect();
                if extras.is_empty() {
                    continue;
                }
                for pos in &extras {
                    board.set(*pos, Symbol::new(self.filler))?;
                }
                effects.push(FeatureEffect::TriggerReplaced { reel, positions: extras });
            }
        }

        if board.count(self.trigger) > 0 {
            return Ok(effects);
        }
        let seed = intensity.guaranteed_trigger
            || (intensity.force_trigger_chance > 0.0 && rng.random_bool(intensity.force_trigger_chance));
        if !seed {
            return Ok(effects);
        }

        let candidates: Vec<Position> = board
            .cells()
            .filter(|(p, s)| board.is_reel_enabled(p.reel) && Some(s.id) != self.scatter)
            .map(|(p, _)| p)
            .collect();
        if candidates.is_empty() {
            log::debug!("no cell available to seed a guillotine trigger");
            return Ok(effects);
        }
        let position = candidates[rng.random_range(0..candidates.len())];
        board.set(position, Symbol::new(self.trigger))?;
        effects.push(FeatureEffect::TriggerPlaced { position });
        Ok(effects)
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        triggers: &[Position],
        ctx: &mut FeatureContext<'_>,
        rng: &mut R,
        effects: &mut Vec<FeatureEffect>,
    ) -> EngineResult<bool> {
        let mut by_reel: BTreeMap<usize, Vec<Position>> = BTreeMap::new();
        for &pos in triggers {
            by_reel.entry(pos.reel).or_default().push(pos);
        }

        let mut mutated = false;
        for (reel, mut on_reel) in by_reel {
            on_reel.sort();
            let trigger = on_reel[0];

            // One trigger per reel
            let excess = on_reel.split_off(1);
            if !excess.is_empty() {
                for pos in &excess {
                    ctx.board.set(*pos, Symbol::new(self.filler))?;
                }
                mutated = true;
                effects.push(FeatureEffect::TriggerReplaced { reel, positions: excess });
            }

            if !ctx.board.is_reel_enabled(reel) {
                effects.push(FeatureEffect::GuillotineBlocked { reel, trigger });
                continue;
            }

            let outcome = if ctx.intensity.jam_allowed {
                *self.jam.sample(rng)
            } else {
                JamOutcome::Drop
            };
            if outcome == JamOutcome::Jam {
                log::trace!("guillotine jammed on reel {reel}");
                effects.push(FeatureEffect::GuillotineJam { reel, trigger });
                continue;
            }

            // Trigger cell and everything below it, scatters included
            let path: Vec<Position> = (trigger.row..ctx.board.rows(reel))
                .map(|row| Position::new(reel, row))
                .collect();

            let base_multiplier = *self.reel_multipliers.sample(rng);
            let mut behead = Vec::new();
            for pos in path.iter().filter(|p| **p != trigger) {
                let Some(cell) = ctx.board.get(*pos) else {
                    continue;
                };
                if let Some(table) = self.behead.get(&cell.id) {
                    behead.push(*table.sample(rng));
                }
            }

            let combined = ctx
                .intensity
                .behead_combine
                .combine(std::iter::once(base_multiplier).chain(behead.iter().copied()));
            let reel_multiplier = combined.min(f64::from(u32::MAX)).round() as u32;

            for pos in &path {
                ctx.board.set(*pos, Symbol::new(self.wild).with_multiplier(reel_multiplier))?;
            }
            mutated = true;

            log::trace!(
                "guillotine dropped on reel {reel}: {} cells at {reel_multiplier}x",
                path.len()
            );
            effects.push(FeatureEffect::GuillotineDrop {
                reel,
                trigger,
                path,
                base_multiplier,
                behead,
                reel_multiplier,
            });
        }
        Ok(mutated)
    }

    pub fn trigger(&self) -> SymbolId {
        self.trigger
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::multiplier::MultiplierGrid;
    use crate::reels::ReelSets;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn run(
        feature: &Guillotine,
        t: &SymbolTable,
        board: &mut Board,
        intensity: &FeatureIntensity,
        seed: u64,
    ) -> Vec<FeatureEffect> {
        let mut grid = MultiplierGrid::inert(&vec![board.rows(0); board.num_reels()]);
        let triggers = board.positions_of(feature.trigger());
        let mut ctx = FeatureContext {
            symbols: t,
            board,
            grid: &mut grid,
            intensity,
            wild_multipliers: None,
        };
        let mut effects = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        feature.apply(&triggers, &mut ctx, &mut rng, &mut effects).unwrap();
        effects
    }

    fn no_jam() -> FeatureIntensity {
        FeatureIntensity { jam_allowed: false, ..FeatureIntensity::default() }
    }

    #[test]
    fn test_drop_turns_path_into_multiplier_wilds() {
        let t = fixtures::symbols();
        let feature = Guillotine::compile(&GuillotineConfig::example(), &t).unwrap();
        let mut board = Board::from_names(
            &t,
            &[&["L2", "L2", "L2", "L2"], &["L2", "G", "H1", "L1"]],
        )
        .unwrap();
        let effects = run(&feature, &t, &mut board, &no_jam(), 7);

        let FeatureEffect::GuillotineDrop { reel, path, base_multiplier, behead, reel_multiplier, .. } =
            &effects[0]
        else {
            panic!("unexpected effect {:?}", effects[0]);
        };
        assert_eq!(*reel, 1);
        assert_eq!(path.len(), 3);
        assert_eq!(*base_multiplier, 2);
        assert_eq!(behead, &vec![3, 1]);
        // Additive: 2 + 3 + 1
        assert_eq!(*reel_multiplier, 6);

        let w = t.id("W").unwrap();
        for row in 1..4 {
            let cell = board.get(Position::new(1, row)).unwrap();
            assert_eq!(cell.id, w);
            assert_eq!(cell.multiplier, Some(6));
        }
        assert_eq!(board.get(Position::new(1, 0)).unwrap().id, t.id("L2").unwrap());
    }

    #[test]
    fn test_blade_converts_scatter_in_path() {
        let t = fixtures::symbols();
        let feature = Guillotine::compile(&GuillotineConfig::example(), &t).unwrap();
        let mut board = Board::from_names(&t, &[&["G", "S", "H1", "L1"]]).unwrap();
        let effects = run(&feature, &t, &mut board, &no_jam(), 11);

        let FeatureEffect::GuillotineDrop { path, reel_multiplier, .. } = &effects[0] else {
            panic!("unexpected effect {:?}", effects[0]);
        };
        assert_eq!(path.len(), 4);
        let w = t.id("W").unwrap();
        for row in 0..4 {
            let cell = board.get(Position::new(0, row)).unwrap();
            assert_eq!(cell.id, w);
            assert_eq!(cell.multiplier, Some(*reel_multiplier));
        }
        assert_eq!(board.count(t.id("S").unwrap()), 0);
    }

    #[test]
    fn test_extra_triggers_on_one_reel_become_filler() {
        let t = fixtures::symbols();
        let feature = Guillotine::compile(&GuillotineConfig::example(), &t).unwrap();
        let mut board = Board::from_names(&t, &[&["G", "L2", "G"]]).unwrap();
        let effects = run(&feature, &t, &mut board, &no_jam(), 1);

        assert_eq!(
            effects[0],
            FeatureEffect::TriggerReplaced { reel: 0, positions: vec![Position::new(0, 2)] }
        );
        assert!(matches!(effects[1], FeatureEffect::GuillotineDrop { reel: 0, .. }));
        assert_eq!(board.count(t.id("G").unwrap()), 0);
    }

    #[test]
    fn test_jam_only_leaves_trigger_inert() {
        let t = fixtures::symbols();
        let mut config = GuillotineConfig::example();
        config.jam_weights = JamWeights { jam: 1.0, drop: 0.0 };
        let feature = Guillotine::compile(&config, &t).unwrap();
        let mut board = Board::from_names(&t, &[&["G", "H1"]]).unwrap();
        let before = board.clone();
        let effects = run(&feature, &t, &mut board, &FeatureIntensity::default(), 3);

        assert_eq!(effects, vec![FeatureEffect::GuillotineJam { reel: 0, trigger: Position::new(0, 0) }]);
        assert_eq!(board, before);
    }

    #[test]
    fn test_blocked_reel_is_inert() {
        let t = fixtures::symbols();
        let feature = Guillotine::compile(&GuillotineConfig::example(), &t).unwrap();

        let mut raw = BTreeMap::new();
        raw.insert("BR0".to_string(), vec![vec!["G".to_string(), "H1".to_string()]]);
        raw.insert("CAP".to_string(), vec![vec!["L2".to_string()]]);
        let sets = ReelSets::compile(&raw, &t).unwrap();
        let weights = WeightedTable::new(vec![("BR0".to_string(), 1.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut board = Board::draw(&sets, &weights, &[2], &mut rng).unwrap();
        board
            .apply_capability(sets.get("CAP").unwrap(), t.id("X").unwrap(), &mut rng)
            .unwrap();

        let effects = run(&feature, &t, &mut board, &no_jam(), 3);
        assert!(matches!(effects[0], FeatureEffect::GuillotineBlocked { reel: 0, .. }));
        assert_eq!(board.count(t.id("W").unwrap()), 0);
    }

    #[test]
    fn test_prepare_board_limits_scatters_and_seeds_trigger() {
        let t = fixtures::symbols();
        let feature = Guillotine::compile(&GuillotineConfig::example(), &t).unwrap();
        let mut board = Board::from_names(&t, &[&["S", "L1", "S"], &["H1", "H2", "L1"]]).unwrap();
        let intensity = FeatureIntensity { guaranteed_trigger: true, ..FeatureIntensity::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let effects = feature.prepare_board(&mut board, &intensity, &mut rng).unwrap();
        assert_eq!(
            effects[0],
            FeatureEffect::TriggerReplaced { reel: 0, positions: vec![Position::new(0, 2)] }
        );
        assert!(matches!(effects[1], FeatureEffect::TriggerPlaced { .. }));
        assert_eq!(board.count(t.id("S").unwrap()), 1);
        assert_eq!(board.count(t.id("G").unwrap()), 1);
        // The remaining scatter is never overwritten by the seed
        assert_eq!(board.get(Position::new(0, 0)).unwrap().id, t.id("S").unwrap());
    }
}
