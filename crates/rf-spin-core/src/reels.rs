//! Reel strips and named reel sets

use std::collections::BTreeMap;

use crate::error::{EngineResult, SpinError};
use crate::symbols::{SymbolId, SymbolTable};

/// A circular reel strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelStrip {
    symbols: Vec<SymbolId>,
}

impl ReelStrip {
    pub fn new(symbols: Vec<SymbolId>) -> EngineResult<Self> {
        if symbols.is_empty() {
            return Err(SpinError::config("reel strip is empty"));
        }
        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Get symbol at position (wraps around)
    pub fn symbol_at(&self, position: usize) -> SymbolId {
        self.symbols[position % self.symbols.len()]
    }

    /// Visible window of `rows` symbols starting at `stop`
    pub fn window(&self, stop: usize, rows: usize) -> impl Iterator<Item = SymbolId> + '_ {
        (0..rows).map(move |row| self.symbol_at(stop + row))
    }

    /// Strip indices holding `symbol`
    pub fn occurrences(&self, symbol: SymbolId) -> Vec<usize> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == symbol)
            .map(|(i, _)| i)
            .collect()
    }

    /// Stop positions whose window does not show `symbol`
    pub fn stops_without(&self, symbol: SymbolId, rows: usize) -> Vec<usize> {
        (0..self.symbols.len())
            .filter(|&stop| self.window(stop, rows).all(|s| s != symbol))
            .collect()
    }

    /// Stop one position above `stop`
    pub fn step_up(&self, stop: usize) -> usize {
        (stop + self.symbols.len() - 1) % self.symbols.len()
    }
}

/// One strip per reel, selected as a unit by reel-weight tables
#[derive(Debug, Clone)]
pub struct ReelSet {
    pub name: String,
    pub reels: Vec<ReelStrip>,
}

impl ReelSet {
    /// Resolve symbol names into a reel set
    pub fn compile(name: &str, reels: &[Vec<String>], symbols: &SymbolTable) -> EngineResult<Self> {
        if reels.is_empty() {
            return Err(SpinError::config(format!("reel set '{name}' has no reels")));
        }
        let mut strips = Vec::with_capacity(reels.len());
        for (i, reel) in reels.iter().enumerate() {
            let ids = reel
                .iter()
                .map(|s| symbols.id(s))
                .collect::<EngineResult<Vec<_>>>()?;
            let strip = ReelStrip::new(ids)
                .map_err(|_| SpinError::config(format!("reel set '{name}' reel {i} is empty")))?;
            strips.push(strip);
        }
        Ok(Self { name: name.to_string(), reels: strips })
    }

    pub fn num_reels(&self) -> usize {
        self.reels.len()
    }

    pub fn strip(&self, reel: usize) -> EngineResult<&ReelStrip> {
        self.reels.get(reel).ok_or_else(|| {
            SpinError::config(format!("reel set '{}' has no reel {reel}", self.name))
        })
    }
}

/// All reel sets of a game, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ReelSets {
    sets: BTreeMap<String, ReelSet>,
}

impl ReelSets {
    pub fn compile(raw: &BTreeMap<String, Vec<Vec<String>>>, symbols: &SymbolTable) -> EngineResult<Self> {
        let mut sets = BTreeMap::new();
        for (name, reels) in raw {
            sets.insert(name.clone(), ReelSet::compile(name, reels, symbols)?);
        }
        Ok(Self { sets })
    }

    pub fn get(&self, name: &str) -> EngineResult<&ReelSet> {
        self.sets
            .get(name)
            .ok_or_else(|| SpinError::config(format!("missing reel set '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReelSet> {
        self.sets.values()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
