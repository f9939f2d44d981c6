//! Symbol transformation

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{FeatureContext, FeatureEffect};
use crate::board::Position;
use crate::error::{EngineResult, SpinError};
use crate::sampler::WeightedTable;
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationConfig {
    /// Symbols that may be picked as the source
    pub transformable: Vec<String>,
    /// Target symbol → weight
    pub targets: WeightedTable<String>,
}

/// Picks one transformable symbol present on the board and turns every
/// instance of it into a weighted target different from the source
#[derive(Debug, Clone)]
pub struct Transformation {
    transformable: Vec<SymbolId>,
    targets: WeightedTable<SymbolId>,
}

impl Transformation {
    pub fn compile(config: &TransformationConfig, symbols: &SymbolTable) -> EngineResult<Self> {
        if config.transformable.is_empty() {
            return Err(SpinError::config("transformation has no transformable symbols"));
        }
        let transformable = config
            .transformable
            .iter()
            .map(|name| symbols.id(name))
            .collect::<EngineResult<Vec<_>>>()?;
        let targets = config.targets.try_map(|name| {
            let id = symbols.id(name)?;
            if symbols.kind(id) != SymbolKind::Regular {
                return Err(SpinError::config(format!(
                    "transformation target '{name}' is not a regular symbol"
                )));
            }
            Ok(id)
        })?;
        Ok(Self { transformable, targets })
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        triggers: &[Position],
        ctx: &mut FeatureContext<'_>,
        rng: &mut R,
        effects: &mut Vec<FeatureEffect>,
    ) -> EngineResult<bool> {
        for &trigger in triggers {
            ctx.board.mark(trigger);

            let mut present: Vec<SymbolId> = ctx
                .board
                .cells()
                .map(|(_, s)| s.id)
                .filter(|id| self.transformable.contains(id))
                .collect();
            present.sort();
            present.dedup();

            let picked = if present.is_empty() {
                None
            } else {
                let source = present[rng.random_range(0..present.len())];
                self.pick_target(source, rng).map(|target| (source, target))
            };

            let Some((source, target)) = picked else {
                effects.push(FeatureEffect::Transformation {
                    trigger,
                    from: None,
                    to: None,
                    positions: Vec::new(),
                });
                continue;
            };

            let positions = ctx.board.positions_of(source);
            for pos in &positions {
                // Keep removal marks from earlier handlers
                if let Some(cell) = ctx.board.get_mut(*pos) {
                    cell.id = target;
                    cell.multiplier = None;
                }
            }

            log::trace!(
                "transformation at {trigger:?}: {} -> {} ({} cells)",
                ctx.symbols.name(source),
                ctx.symbols.name(target),
                positions.len()
            );
            effects.push(FeatureEffect::Transformation {
                trigger,
                from: Some(ctx.symbols.name(source).to_string()),
                to: Some(ctx.symbols.name(target).to_string()),
                positions,
            });
        }
        Ok(!triggers.is_empty())
    }

    /// Weighted target excluding the source; None when only the source remains
    fn pick_target<R: Rng + ?Sized>(&self, source: SymbolId, rng: &mut R) -> Option<SymbolId> {
        if !self.targets.keys().any(|k| *k == source) {
            return Some(*self.targets.sample(rng));
        }
        let reduced = self.targets.without(&source).ok()?;
        Some(*reduced.sample(rng))
    }
}
