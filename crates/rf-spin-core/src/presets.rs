//! Built-in game presets
//!
//! One preset per win model, each with its reel sets, feature tables and a
//! `base` bet mode whose distributions mirror a typical optimisation split
//! (wincap / freegame / zero-win / basegame). Reel strips are written once
//! and rotated per reel.

use std::collections::BTreeMap;

use crate::config::{
    BetMode, BonusTier, ByGameType, CapabilityConfig, ConditionSet, Distribution, FreespinTriggers,
    GameConfig, OverlayConfig,
};
use crate::error::EngineResult;
use crate::features::{
    AreaExplosionConfig, FeatureIntensity, FeatureKind, FeatureSet, GuillotineConfig, JamWeights,
    TransformationConfig, WildInjectionConfig,
};
use crate::multiplier::{GridPersistence, MultiplierGridConfig};
use crate::paytable::{PayEntry, Payline};
use crate::sampler::WeightedTable;
use crate::symbols::SymbolDef;
use crate::wins::{MultiplierCombine, WinModel};

/// Every preset, compiled or not
pub fn all_presets() -> EngineResult<Vec<GameConfig>> {
    Ok(vec![cluster_game()?, guillotine_game()?, scatter_pay_game()?, ways_game()?])
}

// ═══════════════════════════════════════════════════════════════════════════
// CLUSTER
// ═══════════════════════════════════════════════════════════════════════════

const CLUSTER_BASE: &str = "H1 L1 L2 H2 L3 L4 L1 H3 L2 S L3 H4 L4 L1 P L2 H1 L3 L4 H2 \
                            L1 L2 H3 L3 B L4 H4 L1 L2 T L3 H1 L4 L1 H2 L2 L3 H3 L4 H4";
const CLUSTER_FREE: &str = "H1 L1 P L2 H2 L3 L4 B H3 L2 S L3 H4 L4 L1 P L2 H1 L3 W \
                            H2 L1 L2 H3 L3 B L4 H4 L1 T L3 H1 L4 L1 H2 L2 T H3 L4 H4";

/// 7×7 tumbling cluster game with a doubling multiplier grid and
/// wild-injection, area-explosion and transformation triggers
pub fn cluster_game() -> EngineResult<GameConfig> {
    let mut symbols: Vec<SymbolDef> = ["H1", "H2", "H3", "H4", "L1", "L2", "L3", "L4"]
        .into_iter()
        .map(SymbolDef::regular)
        .collect();
    symbols.extend([
        SymbolDef::wild("W"),
        SymbolDef::scatter("S"),
        SymbolDef::feature("P", FeatureKind::WildInjection),
        SymbolDef::feature("B", FeatureKind::AreaExplosion),
        SymbolDef::feature("T", FeatureKind::Transformation),
    ]);

    let tiers = [(5, 6), (7, 9), (10, 14), (15, 49)];
    let pays: [(&str, [f64; 4]); 8] = [
        ("H1", [1.0, 2.5, 8.0, 40.0]),
        ("H2", [0.8, 2.0, 6.0, 30.0]),
        ("H3", [0.6, 1.5, 4.0, 20.0]),
        ("H4", [0.5, 1.2, 3.0, 15.0]),
        ("L1", [0.3, 0.8, 2.0, 8.0]),
        ("L2", [0.25, 0.6, 1.5, 6.0]),
        ("L3", [0.2, 0.5, 1.2, 5.0]),
        ("L4", [0.15, 0.4, 1.0, 4.0]),
    ];
    let paytable = pays
        .iter()
        .flat_map(|(symbol, row)| {
            tiers
                .iter()
                .zip(row)
                .map(move |(&(min, max), &pay)| PayEntry::range(*symbol, min, max, pay))
        })
        .collect();

    let mut reels = BTreeMap::new();
    reels.insert("BR0".to_string(), rotated_reels(CLUSTER_BASE, 7, 6));
    reels.insert("FR0".to_string(), rotated_reels(CLUSTER_FREE, 7, 6));

    let features = FeatureSet {
        wild_injection: Some(WildInjectionConfig {
            dud_chance: 0.4,
            min_wilds: 1,
            max_wilds: 3,
            wild: Some("W".to_string()),
        }),
        area_explosion: Some(AreaExplosionConfig {
            radius_weights: values(&[(1, 50.0), (2, 35.0), (3, 15.0)])?,
        }),
        transformation: Some(TransformationConfig {
            transformable: ["L1", "L2", "L3", "L4"].map(String::from).to_vec(),
            targets: names(&[("H1", 1.0), ("H2", 2.0), ("H3", 3.0), ("H4", 4.0)])?,
        }),
        guillotine: None,
    };

    let mut freespin_triggers = FreespinTriggers::default();
    freespin_triggers.basegame.extend([(4, 10), (5, 12), (6, 15)]);
    freespin_triggers.freegame.extend([(3, 3), (4, 5)]);

    let reel_weights = ByGameType::split(names(&[("BR0", 1.0)])?, names(&[("FR0", 1.0)])?);
    let free_entry = values(&[(4, 10.0), (5, 3.0), (6, 1.0)])?;
    let wincap = 5000.0;

    Ok(GameConfig {
        game_id: "cluster_7x7".to_string(),
        wincap,
        num_rows: vec![7; 7],
        symbols,
        win_model: WinModel::Cluster { combine: MultiplierCombine::MaxOf },
        paytable,
        reels,
        tumble: true,
        max_cascades: None,
        multiplier_grid: Some(MultiplierGridConfig::new(128, GridPersistence::ResetEveryReveal)),
        freespin_triggers,
        features,
        base_intensity: FeatureIntensity::default(),
        bonus_tiers: Vec::new(),
        global_multiplier: 1.0,
        max_force_attempts: 100,
        bet_modes: vec![standard_mode(reel_weights, free_entry, wincap, |c| c)],
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// GUILLOTINE
// ═══════════════════════════════════════════════════════════════════════════

const GUILLOTINE_BASE: &str = "H1 L1 L2 H2 L3 S L4 L1 H3 L2 L3 G L4 L1 H1 \
                               L2 L3 H2 L4 L1 W L2 H3 L3 L4 H1 L1 L2 L3 L4";
const GUILLOTINE_FREE: &str = "H1 L1 G L2 H2 L3 S L4 L1 H3 L2 W L3 G L4 \
                               L1 H1 L2 L3 H2 L4 L1 G L2 H3 L3 L4 H1 L1 L2";
const PAYLINES: [[usize; 5]; 14] = [
    [0, 0, 0, 0, 0],
    [1, 1, 1, 1, 1],
    [2, 2, 2, 2, 2],
    [3, 3, 3, 3, 3],
    [0, 1, 2, 1, 0],
    [3, 2, 1, 2, 3],
    [1, 0, 0, 0, 1],
    [2, 3, 3, 3, 2],
    [0, 1, 0, 1, 0],
    [3, 2, 3, 2, 3],
    [1, 2, 1, 2, 1],
    [2, 1, 2, 1, 2],
    [0, 0, 1, 2, 3],
    [3, 3, 2, 1, 0],
];

/// 5×4, 14-line game whose guillotine trigger turns the rest of its reel
/// into multiplier wilds; freegame tiers by entry scatter count
pub fn guillotine_game() -> EngineResult<GameConfig> {
    let mut symbols: Vec<SymbolDef> = ["H1", "H2", "H3", "L1", "L2", "L3", "L4"]
        .into_iter()
        .map(SymbolDef::regular)
        .collect();
    symbols.extend([
        SymbolDef::wild("W"),
        SymbolDef::scatter("S"),
        SymbolDef::feature("G", FeatureKind::Guillotine),
        SymbolDef::filler("X"),
    ]);

    let pays: [(&str, [f64; 3]); 7] = [
        ("H1", [0.5, 2.0, 10.0]),
        ("H2", [0.4, 1.5, 6.0]),
        ("H3", [0.3, 1.0, 4.0]),
        ("L1", [0.2, 0.5, 2.0]),
        ("L2", [0.15, 0.4, 1.5]),
        ("L3", [0.1, 0.3, 1.0]),
        ("L4", [0.1, 0.25, 0.8]),
    ];
    let paytable = line_pays(&pays);
    let paylines = PAYLINES
        .iter()
        .enumerate()
        .map(|(i, rows)| Payline::new(i as u16, rows.to_vec()))
        .collect();

    let mut reels = BTreeMap::new();
    reels.insert("BR0".to_string(), rotated_reels(GUILLOTINE_BASE, 5, 7));
    reels.insert("FR0".to_string(), rotated_reels(GUILLOTINE_FREE, 5, 7));
    // Capability: G permits the blade on that reel
    reels.insert("CAP".to_string(), rotated_reels("G G X G G X", 5, 1));
    // Overlay: G on the overlay strip lands a trigger on the primary board
    reels.insert("OVL".to_string(), rotated_reels("X X X X X X X X X G", 5, 3));

    let mut behead = BTreeMap::new();
    behead.insert("H1".to_string(), values(&[(2, 1.0), (3, 1.0)])?);
    behead.insert("H2".to_string(), values(&[(1, 2.0), (2, 1.0)])?);
    behead.insert("H3".to_string(), values(&[(1, 1.0)])?);
    let features = FeatureSet {
        guillotine: Some(GuillotineConfig {
            reel_multipliers: values(&[(2, 50.0), (3, 30.0), (5, 15.0), (10, 5.0)])?,
            behead,
            jam_weights: JamWeights { jam: 1.0, drop: 4.0 },
            filler: "X".to_string(),
            one_scatter_per_reel: true,
        }),
        ..FeatureSet::default()
    };

    let bonus_tiers = vec![
        BonusTier {
            name: "fs3".to_string(),
            min_triggers: 3,
            intensity: FeatureIntensity::default(),
            reel_weights: None,
        },
        BonusTier {
            name: "fs4".to_string(),
            min_triggers: 4,
            intensity: FeatureIntensity {
                jam_allowed: false,
                force_trigger_chance: 0.5,
                ..FeatureIntensity::default()
            },
            reel_weights: None,
        },
        BonusTier {
            name: "fs5".to_string(),
            min_triggers: 5,
            intensity: FeatureIntensity {
                jam_allowed: false,
                guaranteed_trigger: true,
                force_trigger_chance: 0.0,
                behead_combine: MultiplierCombine::Multiplicative,
            },
            reel_weights: None,
        },
    ];

    let mut freespin_triggers = FreespinTriggers::default();
    freespin_triggers.basegame.extend([(3, 8), (4, 10), (5, 12)]);
    freespin_triggers.freegame.extend([(3, 4)]);

    let reel_weights = ByGameType::split(names(&[("BR0", 1.0)])?, names(&[("FR0", 1.0)])?);
    let capability = ByGameType::both(CapabilityConfig {
        reels: names(&[("CAP", 1.0)])?,
        permit: "G".to_string(),
    });
    let overlay = ByGameType::both(OverlayConfig {
        reels: names(&[("OVL", 1.0)])?,
        sentinel: "G".to_string(),
        replacement: "G".to_string(),
    });
    let wild_values = ByGameType::split(
        values(&[(1, 90.0), (2, 10.0)])?,
        values(&[(2, 5.0), (3, 3.0), (5, 1.0)])?,
    );
    let free_entry = values(&[(3, 20.0), (4, 5.0), (5, 1.0)])?;
    let wincap = 5000.0;

    Ok(GameConfig {
        game_id: "guillotine_lines".to_string(),
        wincap,
        num_rows: vec![4; 5],
        symbols,
        win_model: WinModel::Lines { paylines, combine: MultiplierCombine::Multiplicative },
        paytable,
        reels,
        tumble: false,
        max_cascades: None,
        multiplier_grid: None,
        freespin_triggers,
        features,
        base_intensity: FeatureIntensity::default(),
        bonus_tiers,
        global_multiplier: 1.0,
        max_force_attempts: 100,
        bet_modes: vec![standard_mode(reel_weights, free_entry, wincap, |c| {
            c.with_capability(capability.clone())
                .with_overlay(overlay.clone())
                .with_mult_values(wild_values.clone())
        })],
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// SCATTER PAY
// ═══════════════════════════════════════════════════════════════════════════

const SCATTER_BASE: &str = "H1 L1 L2 H2 L3 L4 L5 H3 L1 L2 S L3 H4 L4 L5 \
                            L1 H1 L2 L3 H2 L4 L5 L1 H3 L2 L3 H4 L4 L5 L1";
const SCATTER_FREE: &str = "H1 H2 L1 H3 L2 H4 L3 S L4 H1 L5 H2 L1 H3 L2 \
                            H4 L3 L4 H1 L5 H2 L1 H3 L2 H4 L3 L4 L5 H1 L2";

/// 6×5 pay-anywhere tumble game; the grid keeps its multipliers through
/// the whole freegame
pub fn scatter_pay_game() -> EngineResult<GameConfig> {
    let mut symbols: Vec<SymbolDef> = ["H1", "H2", "H3", "H4", "L1", "L2", "L3", "L4", "L5"]
        .into_iter()
        .map(SymbolDef::regular)
        .collect();
    symbols.push(SymbolDef::scatter("S"));

    let tiers = [(8, 9), (10, 11), (12, 30)];
    let pays: [(&str, [f64; 3]); 9] = [
        ("H1", [10.0, 25.0, 50.0]),
        ("H2", [2.5, 10.0, 25.0]),
        ("H3", [2.0, 5.0, 15.0]),
        ("H4", [1.5, 2.0, 12.0]),
        ("L1", [1.0, 1.5, 10.0]),
        ("L2", [0.8, 1.2, 8.0]),
        ("L3", [0.5, 1.0, 5.0]),
        ("L4", [0.4, 0.9, 4.0]),
        ("L5", [0.25, 0.75, 2.0]),
    ];
    let paytable = pays
        .iter()
        .flat_map(|(symbol, row)| {
            tiers
                .iter()
                .zip(row)
                .map(move |(&(min, max), &pay)| PayEntry::range(*symbol, min, max, pay))
        })
        .collect();

    let mut reels = BTreeMap::new();
    reels.insert("BR0".to_string(), rotated_reels(SCATTER_BASE, 6, 5));
    reels.insert("FR0".to_string(), rotated_reels(SCATTER_FREE, 6, 5));

    let mut freespin_triggers = FreespinTriggers::default();
    freespin_triggers.basegame.extend([(4, 10), (5, 12), (6, 15)]);
    freespin_triggers.freegame.extend([(3, 5)]);

    let reel_weights = ByGameType::split(names(&[("BR0", 1.0)])?, names(&[("FR0", 1.0)])?);
    let free_entry = values(&[(4, 10.0), (5, 2.0), (6, 1.0)])?;
    let wincap = 5000.0;

    Ok(GameConfig {
        game_id: "scatter_pay_6x5".to_string(),
        wincap,
        num_rows: vec![5; 6],
        symbols,
        win_model: WinModel::ScatterPay { combine: MultiplierCombine::Additive },
        paytable,
        reels,
        tumble: true,
        max_cascades: None,
        multiplier_grid: Some(MultiplierGridConfig::new(
            1024,
            GridPersistence::PersistThroughFreegame,
        )),
        freespin_triggers,
        features: FeatureSet::default(),
        base_intensity: FeatureIntensity::default(),
        bonus_tiers: Vec::new(),
        global_multiplier: 1.0,
        max_force_attempts: 100,
        bet_modes: vec![standard_mode(reel_weights, free_entry, wincap, |c| c)],
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// WAYS
// ═══════════════════════════════════════════════════════════════════════════

const WAYS_BASE: &str = "H1 L1 L2 H2 L3 S L1 H3 L2 W L3 L1 H1 L2 L3 H2 L1 L2 H3 L3 L1 L2 W L3";
const WAYS_FREE: &str = "H1 W L2 H2 L3 S L1 H3 L2 W L3 L1 H1 L2 W H2 L1 L2 H3 L3 W L2 H1 L3";

/// 5×3, 243-ways game with multiplier wilds in the freegame
pub fn ways_game() -> EngineResult<GameConfig> {
    let mut symbols: Vec<SymbolDef> = ["H1", "H2", "H3", "L1", "L2", "L3"]
        .into_iter()
        .map(SymbolDef::regular)
        .collect();
    symbols.extend([SymbolDef::wild("W"), SymbolDef::scatter("S")]);

    let pays: [(&str, [f64; 3]); 6] = [
        ("H1", [0.5, 1.5, 5.0]),
        ("H2", [0.4, 1.0, 3.0]),
        ("H3", [0.3, 0.8, 2.0]),
        ("L1", [0.1, 0.3, 1.0]),
        ("L2", [0.1, 0.25, 0.8]),
        ("L3", [0.05, 0.2, 0.6]),
    ];
    let paytable = line_pays(&pays);

    let mut reels = BTreeMap::new();
    reels.insert("BR0".to_string(), rotated_reels(WAYS_BASE, 5, 5));
    reels.insert("FR0".to_string(), rotated_reels(WAYS_FREE, 5, 5));

    let mut freespin_triggers = FreespinTriggers::default();
    freespin_triggers.basegame.extend([(3, 10), (4, 12), (5, 15)]);
    freespin_triggers.freegame.extend([(3, 5)]);

    let reel_weights = ByGameType::split(names(&[("BR0", 1.0)])?, names(&[("FR0", 1.0)])?);
    let wild_values = ByGameType::split(
        values(&[(1, 1.0)])?,
        values(&[(2, 3.0), (3, 2.0), (5, 1.0)])?,
    );
    let free_entry = values(&[(3, 10.0), (4, 2.0), (5, 1.0)])?;
    let wincap = 2500.0;

    Ok(GameConfig {
        game_id: "ways_243".to_string(),
        wincap,
        num_rows: vec![3; 5],
        symbols,
        win_model: WinModel::Ways,
        paytable,
        reels,
        tumble: false,
        max_cascades: None,
        multiplier_grid: None,
        freespin_triggers,
        features: FeatureSet::default(),
        base_intensity: FeatureIntensity::default(),
        bonus_tiers: Vec::new(),
        global_multiplier: 1.0,
        max_force_attempts: 100,
        bet_modes: vec![standard_mode(reel_weights, free_entry, wincap, |c| {
            c.with_mult_values(wild_values.clone())
        })],
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

/// `base` bet mode: wincap, freegame, zero-win and basegame buckets
fn standard_mode(
    reel_weights: ByGameType<WeightedTable<String>>,
    free_entry: WeightedTable<u32>,
    wincap: f64,
    extend: impl Fn(ConditionSet) -> ConditionSet,
) -> BetMode {
    let base = |criteria: &str| extend(ConditionSet::new(criteria, reel_weights.clone()));
    let distributions = vec![
        Distribution {
            quota: 0.001,
            conditions: base("wincap")
                .with_forced_freegame(free_entry.clone())
                .with_forced_wincap()
                .with_win_criteria(wincap),
        },
        Distribution {
            quota: 0.1,
            conditions: base("freegame").with_forced_freegame(free_entry),
        },
        Distribution { quota: 0.4, conditions: base("0").with_win_criteria(0.0) },
        Distribution { quota: 0.499, conditions: base("basegame") },
    ];
    BetMode { name: "base".to_string(), cost: 1.0, distributions }
}

/// Exact 3/4/5-of-a-kind pays
fn line_pays(pays: &[(&str, [f64; 3])]) -> Vec<PayEntry> {
    pays.iter()
        .flat_map(|(symbol, row)| {
            (3..=5).zip(row).map(move |(count, &pay)| PayEntry::exact(*symbol, count, pay))
        })
        .collect()
}

/// One strip per reel, each the base strip rotated `shift` further
fn rotated_reels(strip: &str, reels: usize, shift: usize) -> Vec<Vec<String>> {
    let base: Vec<String> = strip.split_whitespace().map(str::to_string).collect();
    (0..reels)
        .map(|reel| {
            let mut strip = base.clone();
            if !strip.is_empty() {
                let by = (reel * shift) % strip.len();
                strip.rotate_left(by);
            }
            strip
        })
        .collect()
}

fn names(entries: &[(&str, f64)]) -> EngineResult<WeightedTable<String>> {
    WeightedTable::new(entries.iter().map(|(name, w)| (name.to_string(), *w)))
}

fn values(entries: &[(u32, f64)]) -> EngineResult<WeightedTable<u32>> {
    WeightedTable::new(entries.iter().copied())
}
