//! Paytable and payline definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};

/// A payline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payline {
    /// Payline index (0-based)
    pub index: u16,
    /// Row position on each reel (e.g., [1, 0, 0, 0, 1] for a "V" shape)
    pub rows: Vec<usize>,
}

impl Payline {
    /// Create a straight line (same row across all reels)
    pub fn straight(index: u16, row: usize, reel_count: usize) -> Self {
        Self { index, rows: vec![row; reel_count] }
    }

    pub fn new(index: u16, rows: Vec<usize>) -> Self {
        Self { index, rows }
    }
}

/// A configured pay: `symbol` landing between `min` and `max` (inclusive) times
///
/// `max` defaults to `min`, which is how lines and ways tables are written.
/// Cluster and scatter-pay tables use ranges such as 6..=8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayEntry {
    pub symbol: String,
    pub min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Payout as a multiple of stake
    pub pay: f64,
}

impl PayEntry {
    pub fn exact(symbol: impl Into<String>, count: u32, pay: f64) -> Self {
        Self { symbol: symbol.into(), min: count, max: None, pay }
    }

    pub fn range(symbol: impl Into<String>, min: u32, max: u32, pay: f64) -> Self {
        Self { symbol: symbol.into(), min, max: Some(max), pay }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PayBucket {
    min: u32,
    max: u32,
    pay: f64,
}

/// Compiled paytable: per-symbol ordered count buckets
#[derive(Debug, Clone, Default)]
pub struct Paytable {
    buckets: BTreeMap<SymbolId, Vec<PayBucket>>,
}

impl Paytable {
    pub fn compile(entries: &[PayEntry], symbols: &SymbolTable) -> EngineResult<Self> {
        let mut buckets: BTreeMap<SymbolId, Vec<PayBucket>> = BTreeMap::new();
        for entry in entries {
            let id = symbols.id(&entry.symbol)?;
            let max = entry.max.unwrap_or(entry.min);
            if entry.min == 0 || max < entry.min {
                return Err(SpinError::config(format!(
                    "pay entry for '{}' has invalid range {}..={max}",
                    entry.symbol, entry.min
                )));
            }
            if !entry.pay.is_finite() || entry.pay < 0.0 {
                return Err(SpinError::config(format!(
                    "pay entry for '{}' has invalid pay {}",
                    entry.symbol, entry.pay
                )));
            }
            buckets.entry(id).or_default().push(PayBucket { min: entry.min, max, pay: entry.pay });
        }

        for (id, list) in &mut buckets {
            list.sort_by_key(|b| b.min);
            if list.windows(2).any(|w| w[1].min <= w[0].max) {
                return Err(SpinError::config(format!(
                    "pay ranges for '{}' overlap",
                    symbols.name(*id)
                )));
            }
        }

        Ok(Self { buckets })
    }

    /// Pay for `count` of `symbol`
    ///
    /// Counts past the top bucket pay the top bucket; counts below the
    /// smallest bucket or falling in a gap pay nothing.
    pub fn pay(&self, symbol: SymbolId, count: u32) -> Option<f64> {
        let list = self.buckets.get(&symbol)?;
        if let Some(bucket) = list.iter().find(|b| count >= b.min && count <= b.max) {
            return Some(bucket.pay);
        }
        let top = list.last()?;
        (count > top.max).then_some(top.pay)
    }

    /// Smallest paying count for `symbol`
    pub fn min_count(&self, symbol: SymbolId) -> Option<u32> {
        self.buckets.get(&symbol).and_then(|l| l.first()).map(|b| b.min)
    }

    /// Symbols with at least one pay, in id order
    pub fn paying_symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.buckets.keys().copied()
    }

    /// Regular symbols with pays (the ones wilds substitute for)
    pub fn regular_symbols<'a>(&'a self, symbols: &'a SymbolTable) -> impl Iterator<Item = SymbolId> + 'a {
        self.paying_symbols()
            .filter(move |id| symbols.kind(*id) == SymbolKind::Regular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolDef;

    fn symbols() -> SymbolTable {
        SymbolTable::new(vec![
            SymbolDef::regular("H1"),
            SymbolDef::regular("L1"),
            SymbolDef::wild("W"),
        ])
        .unwrap()
    }

    #[test]
    fn test_payline_straight() {
        let line = Payline::straight(0, 1, 5);
        assert_eq!(line.rows, vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_range_buckets() {
        let t = symbols();
        let pt = Paytable::compile(
            &[
                PayEntry::range("H1", 5, 5, 20.0),
                PayEntry::range("H1", 6, 8, 40.0),
                PayEntry::range("H1", 9, 12, 100.0),
                PayEntry::range("H1", 13, 49, 500.0),
            ],
            &t,
        )
        .unwrap();
        let h1 = t.id("H1").unwrap();

        assert_eq!(pt.pay(h1, 4), None);
        assert_eq!(pt.pay(h1, 5), Some(20.0));
        assert_eq!(pt.pay(h1, 8), Some(40.0));
        assert_eq!(pt.pay(h1, 49), Some(500.0));
        assert_eq!(pt.pay(h1, 64), Some(500.0));
        assert_eq!(pt.min_count(h1), Some(5));
        assert_eq!(pt.pay(t.id("L1").unwrap(), 5), None);
    }

    #[test]
    fn test_exact_entries() {
        let t = symbols();
        let pt = Paytable::compile(
            &[PayEntry::exact("L1", 3, 0.5), PayEntry::exact("L1", 4, 1.0), PayEntry::exact("L1", 5, 2.5)],
            &t,
        )
        .unwrap();
        let l1 = t.id("L1").unwrap();
        assert_eq!(pt.pay(l1, 2), None);
        assert_eq!(pt.pay(l1, 4), Some(1.0));
        assert_eq!(pt.pay(l1, 6), Some(2.5));
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let t = symbols();
        assert!(Paytable::compile(&[PayEntry::range("H1", 6, 5, 1.0)], &t).is_err());
        assert!(Paytable::compile(&[PayEntry::exact("H1", 3, -1.0)], &t).is_err());
        assert!(Paytable::compile(&[PayEntry::exact("ZZ", 3, 1.0)], &t).is_err());
        assert!(
            Paytable::compile(&[PayEntry::range("H1", 5, 8, 1.0), PayEntry::range("H1", 8, 9, 2.0)], &t)
                .is_err()
        );
    }

    #[test]
    fn test_regular_symbols_skip_wilds() {
        let t = symbols();
        let pt = Paytable::compile(&[PayEntry::exact("W", 5, 50.0), PayEntry::exact("H1", 5, 20.0)], &t)
            .unwrap();
        let regular: Vec<_> = pt.regular_symbols(&t).collect();
        assert_eq!(regular, vec![t.id("H1").unwrap()]);
    }
}
