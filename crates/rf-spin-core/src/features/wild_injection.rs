//! Wild injection ("potion"): the trigger scatters wilds over the board

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{FeatureContext, FeatureEffect};
use crate::board::Position;
use crate::error::{EngineResult, SpinError};
use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};

fn default_dud_chance() -> f64 {
    0.4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WildInjectionConfig {
    /// Chance that a trigger places nothing
    #[serde(default = "default_dud_chance")]
    pub dud_chance: f64,
    pub min_wilds: u32,
    pub max_wilds: u32,
    /// Wild to place; the table's first wild when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wild: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WildInjection {
    dud_chance: f64,
    min_wilds: u32,
    max_wilds: u32,
    wild: SymbolId,
}

impl WildInjection {
    pub fn compile(config: &WildInjectionConfig, symbols: &SymbolTable) -> EngineResult<Self> {
        if !(0.0..=1.0).contains(&config.dud_chance) {
            return Err(SpinError::config(format!(
                "wild injection dud chance {} outside [0, 1]",
                config.dud_chance
            )));
        }
        if config.min_wilds > config.max_wilds {
            return Err(SpinError::config(format!(
                "wild injection range {}..={} is empty",
                config.min_wilds, config.max_wilds
            )));
        }
        let wild = match &config.wild {
            Some(name) => symbols.id(name)?,
            None => symbols
                .first_of(SymbolKind::Wild)
                .ok_or_else(|| SpinError::config("wild injection needs a wild symbol"))?,
        };
        Ok(Self {
            dud_chance: config.dud_chance,
            min_wilds: config.min_wilds,
            max_wilds: config.max_wilds,
            wild,
        })
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        triggers: &[Position],
        ctx: &mut FeatureContext<'_>,
        rng: &mut R,
        effects: &mut Vec<FeatureEffect>,
    ) -> EngineResult<bool> {
        for &trigger in triggers {
            let dud = rng.random_bool(self.dud_chance);
            let wanted = if dud {
                0
            } else {
                rng.random_range(self.min_wilds..=self.max_wilds) as usize
            };

            // Plain cells still on the board
            let candidates: Vec<Position> = ctx
                .board
                .cells()
                .filter(|(_, s)| !s.explode && !ctx.symbols.is_special(s.id))
                .map(|(p, _)| p)
                .collect();
            let amount = wanted.min(candidates.len());

            let mut wilds = Vec::with_capacity(amount);
            for i in rand::seq::index::sample(rng, candidates.len(), amount) {
                let pos = candidates[i];
                let mut wild = Symbol::new(self.wild);
                if let Some(table) = ctx.wild_multipliers {
                    wild.multiplier = Some(*table.sample(rng));
                }
                ctx.board.set(pos, wild)?;
                wilds.push(pos);
            }
            wilds.sort();

            ctx.board.mark(trigger);
            log::trace!("wild injection at {trigger:?}: {} wilds (dud: {dud})", wilds.len());
            effects.push(FeatureEffect::WildInjection { trigger, wilds, dud });
        }
        Ok(!triggers.is_empty())
    }
}
