//! Symbol definitions and the per-game symbol table

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};
use crate::features::FeatureKind;

/// Compact symbol identifier, an index into the game's [`SymbolTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u16);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Regular paying symbol
    Regular,
    /// Substitutes for any regular symbol
    Wild,
    /// Freespin trigger, never substituted
    Scatter,
    /// Triggers a board-altering feature when present
    Feature(FeatureKind),
    /// Neutral filler used to replace excess triggers
    Filler,
}

/// A symbol definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDef {
    /// Symbol name (e.g., "H1", "L3", "W", "S")
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: SymbolKind,
}

fn default_kind() -> SymbolKind {
    SymbolKind::Regular
}

impl SymbolDef {
    pub fn regular(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SymbolKind::Regular }
    }

    pub fn wild(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SymbolKind::Wild }
    }

    pub fn scatter(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SymbolKind::Scatter }
    }

    pub fn feature(name: impl Into<String>, feature: FeatureKind) -> Self {
        Self { name: name.into(), kind: SymbolKind::Feature(feature) }
    }

    pub fn filler(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SymbolKind::Filler }
    }
}

/// Name ↔ id lookup plus symbol kinds, built once per game
#[derive(Debug, Clone)]
pub struct SymbolTable {
    defs: Vec<SymbolDef>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new(defs: Vec<SymbolDef>) -> EngineResult<Self> {
        if defs.is_empty() {
            return Err(SpinError::config("symbol table is empty"));
        }
        if defs.len() > u16::MAX as usize {
            return Err(SpinError::config("too many symbols"));
        }
        let mut by_name = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if by_name.insert(def.name.clone(), SymbolId(i as u16)).is_some() {
                return Err(SpinError::config(format!("duplicate symbol '{}'", def.name)));
            }
        }
        Ok(Self { defs, by_name })
    }

    /// Resolve a symbol name
    pub fn id(&self, name: &str) -> EngineResult<SymbolId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SpinError::config(format!("unknown symbol '{name}'")))
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.defs.get(id.0 as usize).map(|d| d.name.as_str()).unwrap_or("?")
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.defs
            .get(id.0 as usize)
            .map(|d| d.kind)
            .unwrap_or(SymbolKind::Regular)
    }

    pub fn is_wild(&self, id: SymbolId) -> bool {
        self.kind(id) == SymbolKind::Wild
    }

    pub fn is_scatter(&self, id: SymbolId) -> bool {
        self.kind(id) == SymbolKind::Scatter
    }

    /// Wild, scatter and feature triggers
    pub fn is_special(&self, id: SymbolId) -> bool {
        matches!(
            self.kind(id),
            SymbolKind::Wild | SymbolKind::Scatter | SymbolKind::Feature(_)
        )
    }

    pub fn feature_of(&self, id: SymbolId) -> Option<FeatureKind> {
        match self.kind(id) {
            SymbolKind::Feature(f) => Some(f),
            _ => None,
        }
    }

    /// First symbol of the given kind
    pub fn first_of(&self, kind: SymbolKind) -> Option<SymbolId> {
        self.defs
            .iter()
            .position(|d| d.kind == kind)
            .map(|i| SymbolId(i as u16))
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.defs.len()).map(|i| SymbolId(i as u16))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// A populated board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    /// Numeric multiplier attribute (wild multipliers, reel multipliers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
    /// Marked for removal at the next tumble
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub explode: bool,
}

impl Symbol {
    pub fn new(id: SymbolId) -> Self {
        Self { id, multiplier: None, explode: false }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }
}
