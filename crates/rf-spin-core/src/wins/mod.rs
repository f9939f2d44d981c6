//! Win evaluation
//!
//! Four interchangeable models share one contract: given a board, the
//! paytable and the current multiplier grid, produce every win and the pass
//! total. Amounts stay at full `f64` precision; rounding to minor units
//! happens once, when the episode result is reported.
//!
//! ```text
//! WinModel::evaluate(board, ctx)
//!     ├── Cluster     4-neighbour flood fill, range buckets
//!     ├── Lines       fixed paylines, left to right
//!     ├── Ways        every row combination, reels from the left
//!     └── ScatterPay  total count anywhere
//! ```

pub mod cluster;
pub mod lines;
pub mod scatter;
pub mod ways;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Position};
use crate::multiplier::MultiplierGrid;
use crate::paytable::{Payline, Paytable};
use crate::symbols::{SymbolId, SymbolTable};

/// How several multipliers collapse into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierCombine {
    /// Sum of the contributions
    Additive,
    /// Product of the contributions
    Multiplicative,
    /// Largest contribution only
    #[default]
    MaxOf,
}

impl MultiplierCombine {
    /// Combine contributions; no contributions is 1x
    pub fn combine(self, values: impl IntoIterator<Item = u32>) -> f64 {
        let mut iter = values.into_iter().map(f64::from).peekable();
        if iter.peek().is_none() {
            return 1.0;
        }
        match self {
            Self::Additive => iter.sum(),
            Self::Multiplicative => iter.product(),
            Self::MaxOf => iter.fold(1.0, f64::max),
        }
    }

    /// Combine only active (> 1x) contributions, so untouched cells don't
    /// inflate an additive sum
    pub fn combine_active(self, values: impl IntoIterator<Item = u32>) -> f64 {
        self.combine(values.into_iter().filter(|&v| v > 1)).max(1.0)
    }
}

/// Shape of a win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WinKind {
    Cluster,
    Line { index: u16 },
    Ways { ways: u64 },
    Scatter,
}

/// One paying combination from one evaluation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRecord {
    pub symbol: SymbolId,
    pub kind: WinKind,
    /// Cluster size, line length, reels matched or symbol count
    pub count: u32,
    pub positions: Vec<Position>,
    /// Paytable value × global multiplier
    pub base_pay: f64,
    pub multiplier: f64,
    pub amount: f64,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub total_win: f64,
    pub wins: Vec<WinRecord>,
}

impl Evaluation {
    pub fn from_wins(wins: Vec<WinRecord>) -> Self {
        let total_win = wins.iter().map(|w| w.amount).sum();
        Self { total_win, wins }
    }

    pub fn is_win(&self) -> bool {
        self.total_win > 0.0
    }

    /// Union of all winning positions
    pub fn positions(&self) -> BTreeSet<Position> {
        self.wins.iter().flat_map(|w| w.positions.iter().copied()).collect()
    }
}

/// Everything an evaluation pass reads besides the board
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub symbols: &'a SymbolTable,
    pub paytable: &'a Paytable,
    pub grid: &'a MultiplierGrid,
    pub global_multiplier: f64,
    pub wincap: f64,
}

/// Win model selected by game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum WinModel {
    Cluster {
        /// How grid cells inside a cluster combine
        #[serde(default)]
        combine: MultiplierCombine,
    },
    Lines {
        paylines: Vec<Payline>,
        /// How wild multipliers on a line combine across reels
        #[serde(default)]
        combine: MultiplierCombine,
    },
    Ways,
    ScatterPay {
        #[serde(default)]
        combine: MultiplierCombine,
    },
}

impl WinModel {
    pub fn evaluate(&self, board: &Board, ctx: &EvalContext<'_>) -> Evaluation {
        match self {
            Self::Cluster { combine } => cluster::evaluate(board, ctx, *combine),
            Self::Lines { paylines, combine } => lines::evaluate(board, ctx, paylines, *combine),
            Self::Ways => ways::evaluate(board, ctx),
            Self::ScatterPay { combine } => scatter::evaluate(board, ctx, *combine),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cluster { .. } => "cluster",
            Self::Lines { .. } => "lines",
            Self::Ways => "ways",
            Self::ScatterPay { .. } => "scatter_pay",
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster { .. })
    }
}

/// Round a stake multiple to integer minor units (cents)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
