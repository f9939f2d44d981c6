//! Board-altering features
//!
//! Features are triggered by the presence of a feature symbol, never by a
//! random roll. Each kind has exactly one handler; the resolver scans the
//! board once, then runs the handlers in a fixed priority order with the
//! trigger positions found at scan time.
//!
//! ```text
//! FeatureResolver
//!     Scan   → trigger positions per kind (priority order)
//!     Apply  → WildInjection → AreaExplosion → Transformation → Guillotine
//!     Settle → caller tumbles marked cells and re-evaluates once
//! ```

pub mod explosion;
pub mod guillotine;
pub mod transform;
pub mod wild_injection;

pub use explosion::*;
pub use guillotine::*;
pub use transform::*;
pub use wild_injection::*;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Position};
use crate::error::{EngineResult, SpinError};
use crate::multiplier::MultiplierGrid;
use crate::sampler::WeightedTable;
use crate::symbols::SymbolTable;

// ═══════════════════════════════════════════════════════════════════════════
// KINDS & PHASES
// ═══════════════════════════════════════════════════════════════════════════

/// Feature categories, declared in resolution priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Places wilds on random cells
    WildInjection,
    /// Clears an area around the trigger and boosts its grid cells
    AreaExplosion,
    /// Turns every instance of one symbol into another
    Transformation,
    /// Blade drop: trigger and the cells below it become multiplier wilds
    Guillotine,
}

impl FeatureKind {
    pub const PRIORITY: [FeatureKind; 4] = [
        FeatureKind::WildInjection,
        FeatureKind::AreaExplosion,
        FeatureKind::Transformation,
        FeatureKind::Guillotine,
    ];

    /// When this kind is resolved within a reveal
    pub fn phase(self) -> FeaturePhase {
        match self {
            Self::Guillotine => FeaturePhase::OnDraw,
            _ => FeaturePhase::AfterSettle,
        }
    }
}

/// Resolution point within a reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePhase {
    /// On the fresh board, before the first evaluation
    OnDraw,
    /// After the cascade loop has settled
    AfterSettle,
}

/// Resolver progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Scan,
    Apply,
    Settle,
}

// ═══════════════════════════════════════════════════════════════════════════
// EFFECT RECORDS
// ═══════════════════════════════════════════════════════════════════════════

/// What a handler did to the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum FeatureEffect {
    WildInjection {
        trigger: Position,
        wilds: Vec<Position>,
        dud: bool,
    },
    AreaExplosion {
        trigger: Position,
        radius: u32,
        affected: Vec<Position>,
    },
    Transformation {
        trigger: Position,
        from: Option<String>,
        to: Option<String>,
        positions: Vec<Position>,
    },
    /// Trigger seeded onto the board at draw time
    TriggerPlaced {
        position: Position,
    },
    /// Excess triggers on one reel turned into filler
    TriggerReplaced {
        reel: usize,
        positions: Vec<Position>,
    },
    /// Reel not permitted by its capability strip
    GuillotineBlocked {
        reel: usize,
        trigger: Position,
    },
    GuillotineJam {
        reel: usize,
        trigger: Position,
    },
    GuillotineDrop {
        reel: usize,
        trigger: Position,
        path: Vec<Position>,
        base_multiplier: u32,
        behead: Vec<u32>,
        reel_multiplier: u32,
    },
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

/// Feature configuration as written in the game file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wild_injection: Option<WildInjectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_explosion: Option<AreaExplosionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<TransformationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guillotine: Option<GuillotineConfig>,
}

/// Features with symbol names resolved
#[derive(Debug, Clone, Default)]
pub struct CompiledFeatures {
    pub wild_injection: Option<WildInjection>,
    pub area_explosion: Option<AreaExplosion>,
    pub transformation: Option<Transformation>,
    pub guillotine: Option<Guillotine>,
}

impl CompiledFeatures {
    pub fn compile(set: &FeatureSet, symbols: &SymbolTable) -> EngineResult<Self> {
        let compiled = Self {
            wild_injection: set
                .wild_injection
                .as_ref()
                .map(|c| WildInjection::compile(c, symbols))
                .transpose()?,
            area_explosion: set
                .area_explosion
                .as_ref()
                .map(AreaExplosion::compile)
                .transpose()?,
            transformation: set
                .transformation
                .as_ref()
                .map(|c| Transformation::compile(c, symbols))
                .transpose()?,
            guillotine: set
                .guillotine
                .as_ref()
                .map(|c| Guillotine::compile(c, symbols))
                .transpose()?,
        };

        for id in symbols.ids() {
            if let Some(kind) = symbols.feature_of(id) {
                if !compiled.is_configured(kind) {
                    return Err(SpinError::config(format!(
                        "symbol '{}' triggers {kind:?} but that feature is not configured",
                        symbols.name(id)
                    )));
                }
            }
        }

        Ok(compiled)
    }

    pub fn is_configured(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::WildInjection => self.wild_injection.is_some(),
            FeatureKind::AreaExplosion => self.area_explosion.is_some(),
            FeatureKind::Transformation => self.transformation.is_some(),
            FeatureKind::Guillotine => self.guillotine.is_some(),
        }
    }

    /// Any configured feature resolves in `phase`
    pub fn has_phase(&self, phase: FeaturePhase) -> bool {
        FeatureKind::PRIORITY
            .iter()
            .any(|k| k.phase() == phase && self.is_configured(*k))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RESOLVER
// ═══════════════════════════════════════════════════════════════════════════

/// Mutable episode state a handler may touch
pub struct FeatureContext<'a> {
    pub symbols: &'a SymbolTable,
    pub board: &'a mut Board,
    pub grid: &'a mut MultiplierGrid,
    pub intensity: &'a FeatureIntensity,
    /// Multiplier table for wilds created by features
    pub wild_multipliers: Option<&'a WeightedTable<u32>>,
}

/// Result of one Scan/Apply pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureOutcome {
    pub mutated: bool,
    pub effects: Vec<FeatureEffect>,
    /// Trigger count per kind found at scan time
    pub triggers: Vec<(FeatureKind, u32)>,
}

/// Scan/Apply/Settle walk over the configured features
pub struct FeatureResolver<'a> {
    features: &'a CompiledFeatures,
    state: ResolverState,
}

impl<'a> FeatureResolver<'a> {
    pub fn new(features: &'a CompiledFeatures) -> Self {
        Self { features, state: ResolverState::Scan }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// Trigger positions per configured kind of `phase`, in priority order
    pub fn scan(
        &mut self,
        phase: FeaturePhase,
        board: &Board,
        symbols: &SymbolTable,
    ) -> Vec<(FeatureKind, Vec<Position>)> {
        self.state = ResolverState::Scan;
        FeatureKind::PRIORITY
            .iter()
            .filter(|k| k.phase() == phase && self.features.is_configured(**k))
            .filter_map(|&kind| {
                let positions: Vec<Position> = board
                    .cells()
                    .filter(|(_, s)| symbols.feature_of(s.id) == Some(kind))
                    .map(|(p, _)| p)
                    .collect();
                (!positions.is_empty()).then_some((kind, positions))
            })
            .collect()
    }

    /// Scan once, then run every triggered handler once
    ///
    /// Leaves the resolver in `Settle`; the caller owns the tumble and the
    /// settle evaluation.
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        phase: FeaturePhase,
        ctx: &mut FeatureContext<'_>,
        rng: &mut R,
    ) -> EngineResult<FeatureOutcome> {
        let found = self.scan(phase, ctx.board, ctx.symbols);
        self.state = ResolverState::Apply;

        let mut outcome = FeatureOutcome::default();
        for (kind, triggers) in found {
            outcome.triggers.push((kind, triggers.len() as u32));
            let effects = &mut outcome.effects;
            let mutated = match kind {
                FeatureKind::WildInjection => match &self.features.wild_injection {
                    Some(f) => f.apply(&triggers, ctx, rng, effects)?,
                    None => false,
                },
                FeatureKind::AreaExplosion => match &self.features.area_explosion {
                    Some(f) => f.apply(&triggers, ctx, rng, effects)?,
                    None => false,
                },
                FeatureKind::Transformation => match &self.features.transformation {
                    Some(f) => f.apply(&triggers, ctx, rng, effects)?,
                    None => false,
                },
                FeatureKind::Guillotine => match &self.features.guillotine {
                    Some(f) => f.apply(&triggers, ctx, rng, effects)?,
                    None => false,
                },
            };
            outcome.mutated |= mutated;
        }

        self.state = ResolverState::Settle;
        Ok(outcome)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::WeightedTable;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn features(symbols: &SymbolTable) -> CompiledFeatures {
        CompiledFeatures::compile(
            &FeatureSet {
                wild_injection: Some(WildInjectionConfig {
                    dud_chance: 0.0,
                    min_wilds: 1,
                    max_wilds: 1,
                    wild: None,
                }),
                area_explosion: Some(AreaExplosionConfig {
                    radius_weights: WeightedTable::new(vec![(1u32, 1.0)]).unwrap(),
                }),
                transformation: Some(TransformationConfig {
                    transformable: vec!["L1".into(), "L2".into()],
                    targets: WeightedTable::new(vec![("H1".to_string(), 1.0)]).unwrap(),
                }),
                guillotine: Some(GuillotineConfig::example()),
            },
            symbols,
        )
        .unwrap()
    }

    #[test]
    fn test_unconfigured_trigger_symbol_rejected() {
        let t = fixtures::symbols();
        let err = CompiledFeatures::compile(&FeatureSet::default(), &t).unwrap_err();
        assert!(matches!(err, SpinError::Configuration(_)));
    }

    #[test]
    fn test_scan_order_and_phase() {
        let t = fixtures::symbols();
        let f = features(&t);
        let board = Board::from_names(
            &t,
            &[&["T", "L1", "L2"], &["B", "P", "L1"], &["G", "L2", "L1"]],
        )
        .unwrap();
        let mut resolver = FeatureResolver::new(&f);

        let after: Vec<FeatureKind> = resolver
            .scan(FeaturePhase::AfterSettle, &board, &t)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            after,
            vec![FeatureKind::WildInjection, FeatureKind::AreaExplosion, FeatureKind::Transformation]
        );

        let on_draw = resolver.scan(FeaturePhase::OnDraw, &board, &t);
        assert_eq!(on_draw.len(), 1);
        assert_eq!(on_draw[0].0, FeatureKind::Guillotine);
        assert_eq!(on_draw[0].1, vec![Position::new(2, 0)]);
    }

    #[test]
    fn test_resolve_walks_states_and_uses_scan_positions() {
        let t = fixtures::symbols();
        let f = features(&t);
        let mut board = Board::from_names(
            &t,
            &[&["P", "L1", "L2"], &["L2", "L1", "L1"], &["L2", "L2", "T"]],
        )
        .unwrap();
        let mut grid = MultiplierGrid::new(&[3, 3, 3], 64);
        let intensity = FeatureIntensity::default();
        let mut ctx = FeatureContext {
            symbols: &t,
            board: &mut board,
            grid: &mut grid,
            intensity: &intensity,
            wild_multipliers: None,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut resolver = FeatureResolver::new(&f);

        let outcome = resolver.resolve(FeaturePhase::AfterSettle, &mut ctx, &mut rng).unwrap();
        assert_eq!(resolver.state(), ResolverState::Settle);
        assert!(outcome.mutated);
        assert_eq!(
            outcome.triggers,
            vec![(FeatureKind::WildInjection, 1), (FeatureKind::Transformation, 1)]
        );
        assert!(matches!(outcome.effects[0], FeatureEffect::WildInjection { .. }));
        assert!(matches!(outcome.effects[1], FeatureEffect::Transformation { .. }));

        // Both triggers consumed
        assert!(board.get(Position::new(0, 0)).unwrap().explode);
        assert!(board.get(Position::new(2, 2)).unwrap().explode);
    }
}
