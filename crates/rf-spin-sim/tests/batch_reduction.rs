//! Batch Reduction Tests
//!
//! Tests cover:
//! - Thread-count independence of the reduced statistics
//! - Seed derivation and single-episode replay
//! - Degenerate episodes, aborts and fatal errors
//! - Bet-mode splitting by quota

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use rf_spin_core::{
    ConditionSet, FreespinTriggers, Game, GameConfig, PayEntry, SpinEngine, SpinError, SymbolDef,
    WeightedTable, WinModel, presets,
};
use rf_spin_sim::{
    BatchConfig, BatchControl, BatchStats, EpisodeStats, SimError, derive_seed, run_bet_mode,
    run_batch,
};

// ═══════════════════════════════════════════════════════════════════════════════
// TEST FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

fn cluster_engine() -> SpinEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    SpinEngine::new(Game::compile(presets::cluster_game().unwrap()).unwrap()).with_events(false)
}

/// 5×1 game over one strip per reel
fn line_of_five(reel: &[&str], tumble: bool) -> SpinEngine {
    let strip: Vec<String> = reel.iter().map(|s| s.to_string()).collect();
    let mut reels = BTreeMap::new();
    reels.insert("BR0".to_string(), vec![strip; 5]);
    let mut freespin_triggers = FreespinTriggers::default();
    freespin_triggers.basegame.insert(4, 10);
    let config = GameConfig {
        game_id: "line_of_five".to_string(),
        wincap: 5000.0,
        num_rows: vec![1; 5],
        symbols: vec![SymbolDef::regular("H1"), SymbolDef::regular("L2"), SymbolDef::scatter("S")],
        win_model: WinModel::Cluster { combine: Default::default() },
        paytable: vec![PayEntry::exact("H1", 5, 20.0)],
        reels,
        tumble,
        max_cascades: Some(4),
        multiplier_grid: None,
        freespin_triggers,
        features: Default::default(),
        base_intensity: Default::default(),
        bonus_tiers: Vec::new(),
        global_multiplier: 1.0,
        max_force_attempts: 10,
        bet_modes: Vec::new(),
    };
    SpinEngine::new(Game::compile(config).unwrap()).with_events(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// REDUCTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_stats_independent_of_thread_count() {
    let engine = cluster_engine();
    let conditions = engine.game().conditions("base", "basegame").unwrap().clone();
    let control = BatchControl::new();

    let single = run_batch(
        &engine,
        &conditions,
        &BatchConfig::new(200).with_base_seed(99).with_threads(1),
        &control,
    )
    .unwrap();
    let parallel = run_batch(
        &engine,
        &conditions,
        &BatchConfig::new(200).with_base_seed(99).with_threads(4),
        &control,
    )
    .unwrap();

    assert_eq!(single, parallel);
    assert_eq!(single.episodes, 200);
    assert_eq!(single.staked, 200 * 100);
    assert_eq!(single.scatter_counts.values().sum::<u64>(), 200);
}

#[test]
fn test_batch_matches_sequential_replay() {
    let engine = cluster_engine();
    let conditions = engine.game().conditions("base", "freegame").unwrap().clone();
    let config = BatchConfig::new(20).with_base_seed(1_000).with_threads(3);
    let batch = run_batch(&engine, &conditions, &config, &BatchControl::new()).unwrap();

    let mut replay = BatchStats::default();
    for index in 0..20 {
        let result = engine
            .run_episode(&conditions, derive_seed(config.base_seed, index))
            .unwrap();
        replay.record(&EpisodeStats::from_result(&result, 1.0));
    }
    assert_eq!(batch, replay);
    assert!(batch.freegame_triggers > 0);
    assert_relative_eq!(batch.rtp(), batch.base_rtp() + batch.free_rtp(), epsilon = 0.01);
}

#[test]
fn test_constant_board_rtp() {
    let engine = line_of_five(&["H1"], false);
    let conditions = ConditionSet::single_reel_set("basegame", "BR0").unwrap();
    let stats = run_batch(&engine, &conditions, &BatchConfig::new(50), &BatchControl::new()).unwrap();

    assert_eq!(stats.total_win, 50 * 2000);
    assert_relative_eq!(stats.rtp(), 20.0);
    assert_relative_eq!(stats.hit_rate(), 1.0);
    assert_eq!(stats.cluster_sizes.get(&5), Some(&50));
    assert_eq!(stats.wins_by_symbol.get("H1"), Some(&(50 * 2000)));
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_degenerate_episodes_counted_not_fatal() {
    let engine = line_of_five(&["L2"], false);
    let conditions = ConditionSet::single_reel_set("freegame", "BR0")
        .unwrap()
        .with_forced_freegame(WeightedTable::new(vec![(4u32, 1.0)]).unwrap());

    let stats = run_batch(&engine, &conditions, &BatchConfig::new(30), &BatchControl::new()).unwrap();
    assert_eq!(stats.degenerate, 30);
    assert_eq!(stats.episodes, 0);
    assert_eq!(stats.rtp(), 0.0);
}

#[test]
fn test_invariant_violation_aborts_batch() {
    let engine = line_of_five(&["H1"], true);
    let conditions = ConditionSet::single_reel_set("basegame", "BR0").unwrap();
    let control = BatchControl::new();

    let err = run_batch(&engine, &conditions, &BatchConfig::new(100), &control).unwrap_err();
    assert!(matches!(err, SimError::Engine(SpinError::InvariantViolation(_))));
    assert!(control.is_aborted());
}

#[test]
fn test_aborted_control_skips_everything() {
    let engine = cluster_engine();
    let conditions = engine.game().conditions("base", "basegame").unwrap().clone();
    let control = BatchControl::new();
    control.abort();

    let stats = run_batch(&engine, &conditions, &BatchConfig::new(40), &control).unwrap();
    assert_eq!(stats.skipped, 40);
    assert_eq!(stats.episodes, 0);
}

#[test]
fn test_empty_batch_rejected() {
    let engine = cluster_engine();
    let conditions = engine.game().conditions("base", "basegame").unwrap().clone();
    assert!(matches!(
        run_batch(&engine, &conditions, &BatchConfig::new(0), &BatchControl::new()),
        Err(SimError::InvalidBatch(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// BET MODES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_bet_mode_split_by_quota() {
    let engine = cluster_engine();
    let report = run_bet_mode(
        &engine,
        "base",
        &BatchConfig::new(1000).with_base_seed(5),
        &BatchControl::new(),
    )
    .unwrap();

    assert_eq!(report.mode, "base");
    let episodes = |criteria: &str| {
        let stats = &report.by_criteria[criteria];
        stats.episodes + stats.degenerate
    };
    assert_eq!(episodes("wincap"), 1);
    assert_eq!(episodes("freegame"), 100);
    assert_eq!(episodes("0"), 400);
    assert_eq!(episodes("basegame"), 499);

    let combined = report.combined();
    assert_eq!(combined.episodes + combined.degenerate, 1000);
    assert!(report.to_json().unwrap().contains("\"by_criteria\""));
}

#[test]
fn test_unknown_bet_mode() {
    let engine = cluster_engine();
    assert!(matches!(
        run_bet_mode(&engine, "bonus", &BatchConfig::new(10), &BatchControl::new()),
        Err(SimError::Engine(SpinError::Configuration(_)))
    ));
}
