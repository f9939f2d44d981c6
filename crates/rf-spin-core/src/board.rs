//! The reel board: drawing, overlays and tumble refill

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};
use crate::reels::{ReelSet, ReelSets};
use crate::sampler::WeightedTable;
use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};

/// A board cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub reel: usize,
    pub row: usize,
}

impl Position {
    pub fn new(reel: usize, row: usize) -> Self {
        Self { reel, row }
    }

    pub fn manhattan(&self, other: &Position) -> usize {
        self.reel.abs_diff(other.reel) + self.row.abs_diff(other.row)
    }
}

/// Serializable view of a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
}

/// Result of a tumble
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TumbleOutcome {
    /// Cells removed, in pre-tumble coordinates
    pub removed: Vec<Position>,
    /// Cells filled from the strip, in post-tumble coordinates
    pub refilled: Vec<Position>,
}

/// Reel-major, possibly ragged grid of symbols
///
/// Remembers which reel set and stops produced it so a tumble can keep
/// reading the same strips upward.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    reels: Vec<Vec<Symbol>>,
    reel_set: String,
    stops: Vec<usize>,
    /// Reels allowed to resolve reel-level features
    enabled: Vec<bool>,
}

impl Board {
    /// Draw a board: one reel set from `weights`, a uniform stop per reel
    pub fn draw<R: Rng + ?Sized>(
        sets: &ReelSets,
        weights: &WeightedTable<String>,
        num_rows: &[usize],
        rng: &mut R,
    ) -> EngineResult<Self> {
        let set = sets.get(weights.sample(rng))?;
        check_shape(set, num_rows)?;

        let mut reels = Vec::with_capacity(num_rows.len());
        let mut stops = Vec::with_capacity(num_rows.len());
        for (reel, &rows) in num_rows.iter().enumerate() {
            let strip = set.strip(reel)?;
            let stop = rng.random_range(0..strip.len());
            reels.push(strip.window(stop, rows).map(Symbol::new).collect());
            stops.push(stop);
        }

        Ok(Self {
            reels,
            reel_set: set.name.clone(),
            stops,
            enabled: vec![true; num_rows.len()],
        })
    }

    /// Draw a board showing exactly `count` instances of `trigger`
    ///
    /// Picks `count` distinct reels able to show the trigger and lands one
    /// occurrence in a random visible row; the other reels stop where the
    /// trigger is not visible. Gives up after `attempts` boards.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_forced<R: Rng + ?Sized>(
        sets: &ReelSets,
        weights: &WeightedTable<String>,
        num_rows: &[usize],
        trigger: SymbolId,
        count: usize,
        attempts: usize,
        rng: &mut R,
    ) -> EngineResult<Self> {
        let set = sets.get(weights.sample(rng))?;
        check_shape(set, num_rows)?;

        let mut occurrences = Vec::with_capacity(num_rows.len());
        let mut clean_stops = Vec::with_capacity(num_rows.len());
        for (reel, &rows) in num_rows.iter().enumerate() {
            let strip = set.strip(reel)?;
            occurrences.push(strip.occurrences(trigger));
            clean_stops.push(strip.stops_without(trigger, rows));
        }

        let candidates: Vec<usize> = (0..num_rows.len())
            .filter(|&r| !occurrences[r].is_empty())
            .collect();
        if candidates.len() < count {
            return Err(SpinError::degenerate(format!(
                "reel set '{}' can show at most {} trigger reels, {count} requested",
                set.name,
                candidates.len()
            )));
        }

        for _ in 0..attempts.max(1) {
            let mut chosen = vec![false; num_rows.len()];
            for i in rand::seq::index::sample(rng, candidates.len(), count) {
                chosen[candidates[i]] = true;
            }

            let mut reels = Vec::with_capacity(num_rows.len());
            let mut stops = Vec::with_capacity(num_rows.len());
            for (reel, &rows) in num_rows.iter().enumerate() {
                let strip = set.strip(reel)?;
                let stop = if chosen[reel] {
                    let occ = &occurrences[reel];
                    let at = occ[rng.random_range(0..occ.len())];
                    let row = rng.random_range(0..rows);
                    (at + strip.len() * rows - row) % strip.len()
                } else if clean_stops[reel].is_empty() {
                    rng.random_range(0..strip.len())
                } else {
                    clean_stops[reel][rng.random_range(0..clean_stops[reel].len())]
                };
                reels.push(strip.window(stop, rows).map(Symbol::new).collect());
                stops.push(stop);
            }

            let board = Self {
                reels,
                reel_set: set.name.clone(),
                stops,
                enabled: vec![true; num_rows.len()],
            };
            if board.count(trigger) == count {
                return Ok(board);
            }
        }

        log::warn!(
            "forced draw of {count} triggers from '{}' failed after {attempts} attempts",
            set.name
        );
        Err(SpinError::degenerate(format!(
            "could not land exactly {count} triggers on reel set '{}'",
            set.name
        )))
    }

    /// Build a board from symbol names, reel-major (for fixtures and replays)
    pub fn from_names(symbols: &SymbolTable, reels: &[&[&str]]) -> EngineResult<Self> {
        let mut cols = Vec::with_capacity(reels.len());
        for reel in reels {
            if reel.is_empty() {
                return Err(SpinError::config("board reel has no rows"));
            }
            let col = reel
                .iter()
                .map(|name| symbols.id(name).map(Symbol::new))
                .collect::<EngineResult<Vec<_>>>()?;
            cols.push(col);
        }
        Ok(Self {
            stops: vec![0; cols.len()],
            enabled: vec![true; cols.len()],
            reels: cols,
            reel_set: String::new(),
        })
    }

    /// Replace cells whose overlay symbol equals `sentinel` with `replacement`
    ///
    /// The overlay strip is stopped independently of the primary strip.
    pub fn apply_overlay<R: Rng + ?Sized>(
        &mut self,
        overlay: &ReelSet,
        sentinel: SymbolId,
        replacement: SymbolId,
        rng: &mut R,
    ) -> EngineResult<Vec<Position>> {
        let mut replaced = Vec::new();
        for reel in 0..self.reels.len() {
            let strip = overlay.strip(reel)?;
            let stop = rng.random_range(0..strip.len());
            for row in 0..self.reels[reel].len() {
                if strip.symbol_at(stop + row) == sentinel {
                    self.reels[reel][row] = Symbol::new(replacement);
                    replaced.push(Position::new(reel, row));
                }
            }
        }
        Ok(replaced)
    }

    /// Enable only the reels whose capability symbol is `permit`
    pub fn apply_capability<R: Rng + ?Sized>(
        &mut self,
        capability: &ReelSet,
        permit: SymbolId,
        rng: &mut R,
    ) -> EngineResult<()> {
        for reel in 0..self.reels.len() {
            let strip = capability.strip(reel)?;
            let stop = rng.random_range(0..strip.len());
            self.enabled[reel] = strip.symbol_at(stop) == permit;
        }
        Ok(())
    }

    /// Remove marked cells, shift survivors down and refill from the strip
    ///
    /// Replacements continue upward from each reel's stop: every removed cell
    /// moves the stop up by one and the symbol there enters at the top, so the
    /// column always reads as a contiguous strip window above the survivors.
    pub fn tumble(&mut self, sets: &ReelSets) -> EngineResult<TumbleOutcome> {
        let set = sets.get(&self.reel_set)?;
        let mut outcome = TumbleOutcome::default();

        for reel in 0..self.reels.len() {
            let column = &mut self.reels[reel];
            let removed = column.iter().filter(|s| s.explode).count();
            if removed == 0 {
                continue;
            }
            outcome.removed.extend(
                column
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.explode)
                    .map(|(row, _)| Position::new(reel, row)),
            );

            let strip = set.strip(reel)?;
            let mut stop = self.stops[reel];
            let mut fresh = Vec::with_capacity(column.len());
            for _ in 0..removed {
                stop = strip.step_up(stop);
                fresh.push(Symbol::new(strip.symbol_at(stop)));
            }
            fresh.reverse();
            fresh.extend(column.iter().filter(|s| !s.explode).copied());

            *column = fresh;
            self.stops[reel] = stop;
            outcome.refilled.extend((0..removed).map(|row| Position::new(reel, row)));
        }

        Ok(outcome)
    }

    pub fn num_reels(&self) -> usize {
        self.reels.len()
    }

    pub fn rows(&self, reel: usize) -> usize {
        self.reels.get(reel).map_or(0, Vec::len)
    }

    pub fn num_cells(&self) -> usize {
        self.reels.iter().map(Vec::len).sum()
    }

    pub fn reel(&self, reel: usize) -> &[Symbol] {
        self.reels.get(reel).map_or(&[], Vec::as_slice)
    }

    pub fn get(&self, pos: Position) -> Option<&Symbol> {
        self.reels.get(pos.reel).and_then(|r| r.get(pos.row))
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Symbol> {
        self.reels.get_mut(pos.reel).and_then(|r| r.get_mut(pos.row))
    }

    /// Overwrite a cell
    pub fn set(&mut self, pos: Position, symbol: Symbol) -> EngineResult<()> {
        let cell = self
            .get_mut(pos)
            .ok_or_else(|| SpinError::invariant(format!("position {pos:?} is off the board")))?;
        *cell = symbol;
        Ok(())
    }

    /// Mark a cell for removal at the next tumble
    pub fn mark(&mut self, pos: Position) {
        if let Some(cell) = self.get_mut(pos) {
            cell.explode = true;
        }
    }

    pub fn has_marked(&self) -> bool {
        self.cells().any(|(_, s)| s.explode)
    }

    /// All cells in reel-major order
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Symbol)> {
        self.reels.iter().enumerate().flat_map(|(reel, col)| {
            col.iter()
                .enumerate()
                .map(move |(row, s)| (Position::new(reel, row), s))
        })
    }

    pub fn positions_of(&self, id: SymbolId) -> Vec<Position> {
        self.cells().filter(|(_, s)| s.id == id).map(|(p, _)| p).collect()
    }

    pub fn positions_of_kind(&self, symbols: &SymbolTable, kind: SymbolKind) -> Vec<Position> {
        self.cells()
            .filter(|(_, s)| symbols.kind(s.id) == kind)
            .map(|(p, _)| p)
            .collect()
    }

    pub fn count(&self, id: SymbolId) -> usize {
        self.cells().filter(|(_, s)| s.id == id).count()
    }

    pub fn count_kind(&self, symbols: &SymbolTable, kind: SymbolKind) -> usize {
        self.cells().filter(|(_, s)| symbols.kind(s.id) == kind).count()
    }

    pub fn reel_set(&self) -> &str {
        &self.reel_set
    }

    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    pub fn is_reel_enabled(&self, reel: usize) -> bool {
        self.enabled.get(reel).copied().unwrap_or(false)
    }

    /// Symbol names, reel-major
    pub fn names(&self, symbols: &SymbolTable) -> Vec<Vec<String>> {
        self.reels
            .iter()
            .map(|col| col.iter().map(|s| symbols.name(s.id).to_string()).collect())
            .collect()
    }

    pub fn snapshot(&self, symbols: &SymbolTable) -> Vec<Vec<CellSnapshot>> {
        self.reels
            .iter()
            .map(|col| {
                col.iter()
                    .map(|s| CellSnapshot {
                        name: symbols.name(s.id).to_string(),
                        multiplier: s.multiplier,
                    })
                    .collect()
            })
            .collect()
    }
}

fn check_shape(set: &ReelSet, num_rows: &[usize]) -> EngineResult<()> {
    if set.num_reels() != num_rows.len() {
        return Err(SpinError::config(format!(
            "reel set '{}' has {} reels, board needs {}",
            set.name,
            set.num_reels(),
            num_rows.len()
        )));
    }
    if let Some(reel) = num_rows.iter().position(|&r| r == 0) {
        return Err(SpinError::config(format!("reel {reel} has no rows")));
    }
    Ok(())
}
