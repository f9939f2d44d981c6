//! Area explosion ("bomb")

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{FeatureContext, FeatureEffect};
use crate::board::Position;
use crate::error::EngineResult;
use crate::sampler::WeightedTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaExplosionConfig {
    /// Manhattan radius → weight
    pub radius_weights: WeightedTable<u32>,
}

/// Clears every cell within a sampled Manhattan radius of the trigger and
/// doubles the grid multiplier under each cleared cell (clamped at the cap).
/// Scatters in range are cleared like any other symbol.
#[derive(Debug, Clone)]
pub struct AreaExplosion {
    radius_weights: WeightedTable<u32>,
}

impl AreaExplosion {
    pub fn compile(config: &AreaExplosionConfig) -> EngineResult<Self> {
        Ok(Self { radius_weights: config.radius_weights.clone() })
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        triggers: &[Position],
        ctx: &mut FeatureContext<'_>,
        rng: &mut R,
        effects: &mut Vec<FeatureEffect>,
    ) -> EngineResult<bool> {
        for &trigger in triggers {
            let radius = *self.radius_weights.sample(rng);
            let affected: Vec<Position> = ctx
                .board
                .cells()
                .filter(|(p, _)| p.manhattan(&trigger) <= radius as usize)
                .map(|(p, _)| p)
                .collect();

            for pos in &affected {
                ctx.board.mark(*pos);
            }
            ctx.grid.boost(&affected);

            log::trace!("explosion at {trigger:?}, radius {radius}, {} cells", affected.len());
            effects.push(FeatureEffect::AreaExplosion { trigger, radius, affected });
        }
        Ok(!triggers.is_empty())
    }
}
