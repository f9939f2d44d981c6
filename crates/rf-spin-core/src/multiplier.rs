//! Per-cell multiplier grid

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::error::{EngineResult, SpinError};
use crate::wins::WinRecord;

/// When the grid returns to 1x
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPersistence {
    /// Reset before every reveal, each freespin included
    #[default]
    ResetEveryReveal,
    /// Reset before the base reveal only; freespins inherit the grid untouched
    PersistThroughFreegame,
}

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplierGridConfig {
    /// Largest value a cell may reach (power of two)
    pub cap: u32,
    #[serde(default)]
    pub persistence: GridPersistence,
}

impl MultiplierGridConfig {
    pub fn new(cap: u32, persistence: GridPersistence) -> Self {
        Self { cap, persistence }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.cap.is_power_of_two() {
            return Err(SpinError::config(format!(
                "multiplier grid cap {} is not a power of two",
                self.cap
            )));
        }
        Ok(())
    }
}

/// Multiplier per board cell, doubling on wins and clamped to `cap`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiplierGrid {
    cells: Vec<Vec<u32>>,
    cap: u32,
}

impl MultiplierGrid {
    pub fn new(num_rows: &[usize], cap: u32) -> Self {
        Self {
            cells: num_rows.iter().map(|&rows| vec![1; rows]).collect(),
            cap: cap.max(1),
        }
    }

    /// Grid fixed at 1x (games without grid multipliers)
    pub fn inert(num_rows: &[usize]) -> Self {
        Self::new(num_rows, 1)
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn is_inert(&self) -> bool {
        self.cap == 1
    }

    /// Every cell back to 1x
    pub fn reset(&mut self) {
        for col in &mut self.cells {
            col.fill(1);
        }
    }

    pub fn get(&self, pos: Position) -> u32 {
        self.cells
            .get(pos.reel)
            .and_then(|c| c.get(pos.row))
            .copied()
            .unwrap_or(1)
    }

    /// Double every cell covered by any win of one evaluation pass
    ///
    /// Overlapping wins double a shared cell once. Returns true if any cell
    /// changed.
    pub fn apply_wins(&mut self, wins: &[WinRecord]) -> bool {
        let covered: BTreeSet<Position> = wins
            .iter()
            .flat_map(|w| w.positions.iter().copied())
            .collect();
        self.double_all(covered)
    }

    /// Double the given cells once each (area effects)
    pub fn boost(&mut self, positions: &[Position]) -> bool {
        let unique: BTreeSet<Position> = positions.iter().copied().collect();
        self.double_all(unique)
    }

    fn double_all(&mut self, positions: BTreeSet<Position>) -> bool {
        let mut changed = false;
        for pos in positions {
            if let Some(cell) = self.cells.get_mut(pos.reel).and_then(|c| c.get_mut(pos.row)) {
                let next = cell.saturating_mul(2).min(self.cap);
                changed |= next != *cell;
                *cell = next;
            }
        }
        changed
    }

    pub fn max_value(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(1)
    }

    pub fn cells(&self) -> &[Vec<u32>] {
        &self.cells
    }

    /// Every cell a power of two within `1..=cap`
    pub fn check(&self) -> EngineResult<()> {
        for (reel, col) in self.cells.iter().enumerate() {
            for (row, &v) in col.iter().enumerate() {
                if !v.is_power_of_two() || v > self.cap {
                    return Err(SpinError::invariant(format!(
                        "grid cell ({reel},{row}) holds {v}, cap {}",
                        self.cap
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolId;
    use crate::wins::{WinKind, WinRecord};

    fn win(positions: &[(usize, usize)]) -> WinRecord {
        WinRecord {
            symbol: SymbolId(0),
            kind: WinKind::Cluster,
            count: positions.len() as u32,
            positions: positions.iter().map(|&(r, w)| Position::new(r, w)).collect(),
            base_pay: 1.0,
            multiplier: 1.0,
            amount: 1.0,
        }
    }

    #[test]
    fn test_overlapping_wins_double_once() {
        let mut grid = MultiplierGrid::new(&[3, 3], 64);
        grid.apply_wins(&[win(&[(0, 0), (0, 1)]), win(&[(0, 1), (1, 1)])]);
        assert_eq!(grid.get(Position::new(0, 1)), 2);
        assert_eq!(grid.get(Position::new(0, 0)), 2);
        assert_eq!(grid.get(Position::new(1, 1)), 2);
        assert_eq!(grid.get(Position::new(1, 0)), 1);
    }

    #[test]
    fn test_clamps_at_cap() {
        let mut grid = MultiplierGrid::new(&[1], 8);
        for _ in 0..10 {
            grid.apply_wins(&[win(&[(0, 0)])]);
            grid.check().unwrap();
        }
        assert_eq!(grid.get(Position::new(0, 0)), 8);
        assert!(!grid.apply_wins(&[win(&[(0, 0)])]));
    }

    #[test]
    fn test_monotonic_until_reset() {
        let mut grid = MultiplierGrid::new(&[2, 2], 64);
        let mut last = grid.clone();
        for i in 0..20 {
            grid.apply_wins(&[win(&[(i % 2, 0), (1, i % 2)])]);
            for reel in 0..2 {
                for row in 0..2 {
                    let p = Position::new(reel, row);
                    assert!(grid.get(p) >= last.get(p));
                    assert!(grid.get(p).is_power_of_two());
                }
            }
            last = grid.clone();
        }
        grid.reset();
        assert_eq!(grid.max_value(), 1);
    }

    #[test]
    fn test_inert_grid_never_grows() {
        let mut grid = MultiplierGrid::inert(&[3]);
        grid.boost(&[Position::new(0, 0)]);
        assert_eq!(grid.max_value(), 1);
        assert!(grid.is_inert());
    }

    #[test]
    fn test_cap_must_be_power_of_two() {
        assert!(MultiplierGridConfig::new(64, GridPersistence::ResetEveryReveal).validate().is_ok());
        assert!(MultiplierGridConfig::new(50, GridPersistence::ResetEveryReveal).validate().is_err());
    }

    #[test]
    fn test_check_detects_corruption() {
        let mut grid = MultiplierGrid::new(&[2], 4);
        grid.cells[0][1] = 3;
        assert!(matches!(grid.check(), Err(SpinError::InvariantViolation(_))));
    }
}
