//! Episode events and results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{CellSnapshot, Position};
use crate::config::GameType;
use crate::features::{FeatureEffect, FeatureKind};
use crate::symbols::SymbolTable;
use crate::wins::{WinKind, WinRecord, to_minor_units};

/// Win line as it appears in the event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinDetail {
    pub symbol: String,
    pub kind: WinKind,
    pub count: u32,
    pub positions: Vec<Position>,
    pub base_pay: f64,
    pub multiplier: f64,
    pub amount: f64,
}

impl WinDetail {
    pub fn from_record(record: &WinRecord, symbols: &SymbolTable) -> Self {
        Self {
            symbol: symbols.name(record.symbol).to_string(),
            kind: record.kind,
            count: record.count,
            positions: record.positions.clone(),
            base_pay: record.base_pay,
            multiplier: record.multiplier,
            amount: record.amount,
        }
    }
}

/// One entry of the ordered event stream
///
/// The stream is enough to replay an episode: every board the player sees,
/// every win, every grid state and every feature mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpinEvent {
    Reveal {
        gametype: GameType,
        reel_set: String,
        stops: Vec<usize>,
        board: Vec<Vec<CellSnapshot>>,
    },
    GridMultipliers {
        gametype: GameType,
        grid: Vec<Vec<u32>>,
    },
    WinInfo {
        gametype: GameType,
        total_win: f64,
        wins: Vec<WinDetail>,
    },
    Tumble {
        removed: Vec<Position>,
        board: Vec<Vec<CellSnapshot>>,
    },
    /// Running win of the current reveal after a tumble win
    TumbleWin {
        amount: f64,
    },
    Feature {
        gametype: GameType,
        effect: FeatureEffect,
    },
    FreespinTrigger {
        gametype: GameType,
        positions: Vec<Position>,
        scatters: u32,
        awarded: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tier: Option<String>,
    },
    FreespinUpdate {
        current: u32,
        total: u32,
    },
    /// Settled win of one reveal
    SpinWin {
        gametype: GameType,
        amount: f64,
    },
    FreespinEnd {
        played: u32,
        amount: f64,
    },
    Wincap {
        amount: f64,
    },
    FinalWin {
        amount: f64,
        basegame: f64,
        freegame: f64,
    },
}

/// Event recorder; skips building events when disabled
#[derive(Debug, Clone, Default)]
pub struct Book {
    enabled: bool,
    events: Vec<SpinEvent>,
}

impl Book {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, events: Vec::new() }
    }

    pub fn record(&mut self, event: impl FnOnce() -> SpinEvent) {
        if self.enabled {
            self.events.push(event());
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<SpinEvent> {
        self.events
    }
}

/// Everything one episode produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeResult {
    pub seed: u64,
    pub criteria: String,
    /// Base + free win, never above the wincap
    pub total_win: f64,
    pub basegame_win: f64,
    pub freegame_win: f64,
    pub wincap_triggered: bool,
    pub freegame_triggered: bool,
    /// Episode met every forced outcome and win target of its conditions
    pub satisfied: bool,
    pub freespins_played: u32,
    pub retriggers: u32,
    /// Tumbles across all reveals
    pub cascades: u32,
    /// Deepest cascade chain within one reveal
    pub max_cascade_depth: u32,
    pub highest_grid_multiplier: u32,
    /// Scatters on the settled base board
    pub base_scatter_count: u32,
    /// One scatter short of entry, the last scatter landing before the final reel
    pub near_miss: bool,
    pub feature_triggers: BTreeMap<FeatureKind, u32>,
    /// Winning cluster size → occurrences
    pub cluster_sizes: BTreeMap<u32, u32>,
    /// Symbol name → total paid
    pub wins_by_symbol: BTreeMap<String, f64>,
    pub events: Vec<SpinEvent>,
}

impl EpisodeResult {
    /// Total win rounded once to minor units
    pub fn payout_cents(&self) -> i64 {
        to_minor_units(self.total_win)
    }

    pub fn is_win(&self) -> bool {
        self.total_win > 0.0
    }

    pub fn gametype_win(&self, gametype: GameType) -> f64 {
        match gametype {
            GameType::Base => self.basegame_win,
            GameType::Free => self.freegame_win,
        }
    }
}
