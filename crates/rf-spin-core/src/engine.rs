//! Spin engine: one episode from the base reveal through every freespin
//!
//! ```text
//!   Draw ──► Evaluate ──win──► Cascade ──┐
//!    ▲          │  ▲                     │
//!    │        no win└──────────────────────┘
//!    │          ▼
//!    │     FeaturePass ──mutated──► Evaluate (settle)
//!    │          │                      │
//!    │          │        no win ◄──────┘ win → Cascade
//!    │          ▼          │
//!    └──── FreespinCheck ◄─┘
//!               │
//!               ▼
//!           Finalize ──► Done
//! ```
//!
//! The episode owns its board, grid and event book exclusively; the game is
//! shared read-only. All randomness comes from one ChaCha8 stream seeded per
//! episode, so a seed and a condition set reproduce an episode exactly.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::board::{Board, Position};
use crate::config::{BonusTier, ConditionSet, GameType};
use crate::error::{EngineResult, SpinError};
use crate::features::{FeatureContext, FeatureIntensity, FeatureOutcome, FeaturePhase, FeatureResolver};
use crate::game::Game;
use crate::multiplier::{GridPersistence, MultiplierGrid};
use crate::sampler::WeightedTable;
use crate::spin::{Book, EpisodeResult, SpinEvent, WinDetail};
use crate::symbols::SymbolKind;
use crate::wins::{EvalContext, Evaluation, WinKind, to_minor_units};

/// Tolerance when comparing running totals against the wincap
const WIN_EPSILON: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════

/// Runs episodes of one compiled game
#[derive(Debug, Clone)]
pub struct SpinEngine {
    game: Arc<Game>,
    record_events: bool,
}

impl SpinEngine {
    pub fn new(game: Game) -> Self {
        Self::shared(Arc::new(game))
    }

    /// Engine over a game shared with other engines or threads
    pub fn shared(game: Arc<Game>) -> Self {
        Self { game, record_events: true }
    }

    /// Disable the event stream (batch simulation)
    pub fn with_events(mut self, record: bool) -> Self {
        self.record_events = record;
        self
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Run one episode under `conditions` from `seed`
    pub fn run_episode(&self, conditions: &ConditionSet, seed: u64) -> EngineResult<EpisodeResult> {
        self.game.validate_conditions(conditions)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        SpinEpisode::new(&self.game, conditions, seed, self.record_events).run(&mut rng)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EPISODE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinState {
    Draw,
    Evaluate,
    Cascade,
    FeaturePass,
    FreespinCheck,
    Finalize,
    Done,
}

/// Transient state of one episode
pub struct SpinEpisode<'a> {
    game: &'a Game,
    conditions: &'a ConditionSet,
    state: SpinState,
    gametype: GameType,
    board: Option<Board>,
    grid: MultiplierGrid,
    intensity: &'a FeatureIntensity,
    tier: Option<&'a BonusTier>,
    book: Book,
    basegame_win: f64,
    freegame_win: f64,
    /// Paid so far in the current reveal
    reveal_win: f64,
    /// Cascades and feature passes in the current reveal
    cascade_depth: u32,
    /// The board is being re-evaluated after a feature pass
    settling_features: bool,
    freespins_total: u32,
    /// Counters and tallies, completed in `finish`
    result: EpisodeResult,
}

impl<'a> SpinEpisode<'a> {
    pub fn new(game: &'a Game, conditions: &'a ConditionSet, seed: u64, record_events: bool) -> Self {
        Self {
            game,
            conditions,
            state: SpinState::Draw,
            gametype: GameType::Base,
            board: None,
            grid: game.new_grid(),
            intensity: &game.config().base_intensity,
            tier: None,
            book: Book::new(record_events),
            basegame_win: 0.0,
            freegame_win: 0.0,
            reveal_win: 0.0,
            cascade_depth: 0,
            settling_features: false,
            freespins_total: 0,
            result: EpisodeResult {
                seed,
                criteria: conditions.criteria.clone(),
                ..EpisodeResult::default()
            },
        }
    }

    pub fn state(&self) -> SpinState {
        self.state
    }

    pub fn gametype(&self) -> GameType {
        self.gametype
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn grid(&self) -> &MultiplierGrid {
        &self.grid
    }

    /// Running base + free win
    pub fn running_total(&self) -> f64 {
        self.basegame_win + self.freegame_win
    }

    /// Advance one state
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> EngineResult<SpinState> {
        let next = match self.state {
            SpinState::Draw => self.draw(rng)?,
            SpinState::Evaluate => self.evaluate()?,
            SpinState::Cascade => self.cascade()?,
            SpinState::FeaturePass => self.feature_pass(rng)?,
            SpinState::FreespinCheck => self.freespin_check()?,
            SpinState::Finalize => self.finalize()?,
            SpinState::Done => SpinState::Done,
        };
        log::trace!("{:?} -> {next:?}", self.state);
        self.state = next;
        Ok(next)
    }

    /// Step until `Done` and hand back the result
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> EngineResult<EpisodeResult> {
        while self.state != SpinState::Done {
            self.step(rng)?;
        }
        Ok(self.finish())
    }

    fn finish(self) -> EpisodeResult {
        let mut result = self.result;
        result.events = self.book.into_events();
        result
    }

    // ─── states ────────────────────────────────────────────────────────────

    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> EngineResult<SpinState> {
        let game = self.game;
        let gt = self.gametype;
        self.reveal_win = 0.0;
        self.cascade_depth = 0;
        self.settling_features = false;
        if gt == GameType::Base || game.grid_persistence() == GridPersistence::ResetEveryReveal {
            self.grid.reset();
        }

        let weights = self.reel_weights();
        let forced = match (gt, self.conditions.force_freegame, &self.conditions.scatter_triggers) {
            (GameType::Base, true, Some(counts)) => game.scatter().map(|s| (s, *counts.sample(rng))),
            _ => None,
        };
        let mut board = match forced {
            Some((scatter, count)) => Board::draw_forced(
                game.reel_sets(),
                weights,
                game.num_rows(),
                scatter,
                count as usize,
                game.config().max_force_attempts,
                rng,
            )?,
            None => Board::draw(game.reel_sets(), weights, game.num_rows(), rng)?,
        };

        if let Some(overlay) = &self.conditions.overlay {
            let overlay = overlay.get(gt);
            let set = game.reel_sets().get(overlay.reels.sample(rng))?;
            let sentinel = game.symbols().id(&overlay.sentinel)?;
            let replacement = game.symbols().id(&overlay.replacement)?;
            board.apply_overlay(set, sentinel, replacement, rng)?;
        }
        if let Some(capability) = &self.conditions.capability {
            let capability = capability.get(gt);
            let set = game.reel_sets().get(capability.reels.sample(rng))?;
            board.apply_capability(set, game.symbols().id(&capability.permit)?, rng)?;
        }

        let prepared = match &game.features().guillotine {
            Some(guillotine) => guillotine.prepare_board(&mut board, self.intensity, rng)?,
            None => Vec::new(),
        };

        if let Some(values) = self.wild_multipliers() {
            for pos in board.positions_of_kind(game.symbols(), SymbolKind::Wild) {
                if let Some(cell) = board.get_mut(pos) {
                    if cell.multiplier.is_none() {
                        cell.multiplier = Some(*values.sample(rng));
                    }
                }
            }
        }

        self.book.record(|| SpinEvent::Reveal {
            gametype: gt,
            reel_set: board.reel_set().to_string(),
            stops: board.stops().to_vec(),
            board: board.snapshot(game.symbols()),
        });
        self.record_grid();
        for effect in prepared {
            self.book.record(|| SpinEvent::Feature { gametype: gt, effect });
        }

        if game.features().has_phase(FeaturePhase::OnDraw) {
            self.resolve_features(FeaturePhase::OnDraw, &mut board, rng)?;
        }

        self.board = Some(board);
        Ok(SpinState::Evaluate)
    }

    fn evaluate(&mut self) -> EngineResult<SpinState> {
        let game = self.game;
        let board = self.board.as_ref().ok_or_else(missing_board)?;
        let ctx = EvalContext {
            symbols: game.symbols(),
            paytable: game.paytable(),
            grid: &self.grid,
            global_multiplier: game.config().global_multiplier,
            wincap: game.wincap(),
        };
        let eval = game.config().win_model.evaluate(board, &ctx);
        if !eval.is_win() {
            // A settle without wins ends the reveal; features rescan only
            // after the cascades a winning settle starts
            if self.settling_features {
                self.settling_features = false;
                return Ok(SpinState::FreespinCheck);
            }
            return Ok(SpinState::FeaturePass);
        }
        self.settling_features = false;

        self.pay(&eval);

        if !self.grid.is_inert() {
            self.grid.apply_wins(&eval.wins);
            self.grid.check()?;
            self.result.highest_grid_multiplier =
                self.result.highest_grid_multiplier.max(self.grid.max_value());
            self.record_grid();
        }

        if self.result.wincap_triggered {
            return Ok(SpinState::Finalize);
        }
        if !game.config().tumble {
            return Ok(SpinState::FeaturePass);
        }

        let board = self.board.as_mut().ok_or_else(missing_board)?;
        for pos in eval.positions() {
            board.mark(pos);
        }
        Ok(SpinState::Cascade)
    }

    fn cascade(&mut self) -> EngineResult<SpinState> {
        self.bump_depth()?;
        self.tumble()?;
        Ok(SpinState::Evaluate)
    }

    fn feature_pass<R: Rng + ?Sized>(&mut self, rng: &mut R) -> EngineResult<SpinState> {
        if !self.game.features().has_phase(FeaturePhase::AfterSettle) {
            return Ok(SpinState::FreespinCheck);
        }

        let mut board = self.board.take().ok_or_else(missing_board)?;
        let outcome = self.resolve_features(FeaturePhase::AfterSettle, &mut board, rng);
        self.board = Some(board);
        if !outcome?.mutated {
            return Ok(SpinState::FreespinCheck);
        }

        // A feature pass counts toward the cascade bound
        self.bump_depth()?;
        self.settling_features = true;
        if self.board.as_ref().is_some_and(Board::has_marked) {
            self.tumble()?;
        }
        Ok(SpinState::Evaluate)
    }

    fn freespin_check(&mut self) -> EngineResult<SpinState> {
        let game = self.game;
        let gt = self.gametype;
        let reveal_win = self.reveal_win;
        self.book.record(|| SpinEvent::SpinWin { gametype: gt, amount: reveal_win });

        let board = self.board.as_ref().ok_or_else(missing_board)?;
        let positions = game.scatter().map(|s| board.positions_of(s)).unwrap_or_default();
        let scatters = positions.len() as u32;
        if gt == GameType::Base {
            self.result.base_scatter_count = scatters;
            self.result.near_miss = is_near_miss(game, board, &positions);
        }

        let award = if self.result.wincap_triggered {
            None
        } else {
            game.freespin_award(gt, scatters)
        };
        if let Some(awarded) = award {
            match gt {
                GameType::Base => self.enter_freegame(scatters, awarded, positions)?,
                GameType::Free => {
                    self.freespins_total += awarded;
                    self.result.retriggers += 1;
                    log::debug!("retrigger: {scatters} scatters, +{awarded} spins");
                    self.book.record(|| SpinEvent::FreespinTrigger {
                        gametype: gt,
                        positions,
                        scatters,
                        awarded,
                        tier: None,
                    });
                }
            }
        }

        Ok(self.next_freespin())
    }

    fn finalize(&mut self) -> EngineResult<SpinState> {
        let wincap = self.game.wincap();
        let total = self.running_total();
        if total > wincap + WIN_EPSILON {
            return Err(SpinError::invariant(format!(
                "episode total {total} exceeds wincap {wincap} (seed {})",
                self.result.seed
            )));
        }
        let total = total.min(wincap);

        if self.result.freegame_triggered {
            let played = self.result.freespins_played;
            let amount = self.freegame_win;
            self.book.record(|| SpinEvent::FreespinEnd { played, amount });
        }
        let (basegame, freegame) = (self.basegame_win, self.freegame_win);
        self.book.record(|| SpinEvent::FinalWin { amount: total, basegame, freegame });

        self.result.total_win = total;
        self.result.basegame_win = basegame;
        self.result.freegame_win = freegame;
        self.result.satisfied = self.is_satisfied(total);
        Ok(SpinState::Done)
    }

    // ─── helpers ───────────────────────────────────────────────────────────

    /// Record a pass's wins and add them to the running total
    fn pay(&mut self, eval: &Evaluation) {
        let gt = self.gametype;
        let symbols = self.game.symbols();
        self.book.record(|| SpinEvent::WinInfo {
            gametype: gt,
            total_win: eval.total_win,
            wins: eval.wins.iter().map(|w| WinDetail::from_record(w, symbols)).collect(),
        });
        for win in &eval.wins {
            *self
                .result
                .wins_by_symbol
                .entry(symbols.name(win.symbol).to_string())
                .or_default() += win.amount;
            if win.kind == WinKind::Cluster {
                *self.result.cluster_sizes.entry(win.count).or_default() += 1;
            }
        }

        self.add_win(eval.total_win);
        if self.game.config().tumble {
            let running = self.reveal_win;
            self.book.record(|| SpinEvent::TumbleWin { amount: running });
        }
    }

    /// Add to the running total, clamped so it never passes the wincap
    fn add_win(&mut self, amount: f64) {
        let wincap = self.game.wincap();
        let paid = amount.min((wincap - self.running_total()).max(0.0));
        match self.gametype {
            GameType::Base => self.basegame_win += paid,
            GameType::Free => self.freegame_win += paid,
        }
        self.reveal_win += paid;

        if !self.result.wincap_triggered && self.running_total() >= wincap - WIN_EPSILON {
            self.result.wincap_triggered = true;
            log::debug!("wincap {wincap}x reached in {}", self.gametype.as_str());
            self.book.record(|| SpinEvent::Wincap { amount: wincap });
        }
    }

    fn bump_depth(&mut self) -> EngineResult<()> {
        self.cascade_depth += 1;
        self.result.max_cascade_depth = self.result.max_cascade_depth.max(self.cascade_depth);
        if self.cascade_depth > self.game.max_cascades() {
            return Err(SpinError::invariant(format!(
                "cascade depth {} exceeded bound {} (seed {})",
                self.cascade_depth,
                self.game.max_cascades(),
                self.result.seed
            )));
        }
        Ok(())
    }

    fn tumble(&mut self) -> EngineResult<()> {
        let symbols = self.game.symbols();
        let board = self.board.as_mut().ok_or_else(missing_board)?;
        let outcome = board.tumble(self.game.reel_sets())?;
        if outcome.removed.is_empty() {
            return Err(SpinError::invariant("tumble removed no symbols"));
        }
        self.result.cascades += 1;
        log::trace!(
            "tumble {} removed {} cells",
            self.cascade_depth,
            outcome.removed.len()
        );
        self.book.record(|| SpinEvent::Tumble {
            removed: outcome.removed,
            board: board.snapshot(symbols),
        });
        Ok(())
    }

    fn resolve_features<R: Rng + ?Sized>(
        &mut self,
        phase: FeaturePhase,
        board: &mut Board,
        rng: &mut R,
    ) -> EngineResult<FeatureOutcome> {
        let game = self.game;
        let wild_multipliers = self.wild_multipliers();
        let mut ctx = FeatureContext {
            symbols: game.symbols(),
            board,
            grid: &mut self.grid,
            intensity: self.intensity,
            wild_multipliers,
        };
        let outcome = FeatureResolver::new(game.features()).resolve(phase, &mut ctx, rng)?;

        for (kind, count) in &outcome.triggers {
            *self.result.feature_triggers.entry(*kind).or_default() += count;
        }
        let gt = self.gametype;
        for effect in &outcome.effects {
            self.book.record(|| SpinEvent::Feature { gametype: gt, effect: effect.clone() });
        }
        if outcome.mutated {
            log::trace!("{phase:?} features: {} effects", outcome.effects.len());
            self.result.highest_grid_multiplier =
                self.result.highest_grid_multiplier.max(self.grid.max_value());
            self.record_grid();
        }
        Ok(outcome)
    }

    fn enter_freegame(&mut self, scatters: u32, awarded: u32, positions: Vec<Position>) -> EngineResult<()> {
        let game = self.game;
        let tier = match &self.conditions.bonus_tier {
            Some(name) => Some(game.tier(name)?),
            None => game.tier_for_count(scatters),
        };
        self.tier = tier;
        self.intensity = tier.map_or(&game.config().base_intensity, |t| &t.intensity);
        self.result.freegame_triggered = true;
        self.freespins_total = awarded;
        self.gametype = GameType::Free;

        let tier_name = tier.map(|t| t.name.clone());
        log::debug!("freegame triggered: {scatters} scatters, {awarded} spins, tier {tier_name:?}");
        self.book.record(|| SpinEvent::FreespinTrigger {
            gametype: GameType::Base,
            positions,
            scatters,
            awarded,
            tier: tier_name,
        });
        Ok(())
    }

    fn next_freespin(&mut self) -> SpinState {
        if self.gametype != GameType::Free
            || self.result.wincap_triggered
            || self.result.freespins_played >= self.freespins_total
        {
            return SpinState::Finalize;
        }
        self.result.freespins_played += 1;
        let (current, total) = (self.result.freespins_played, self.freespins_total);
        self.book.record(|| SpinEvent::FreespinUpdate { current, total });
        SpinState::Draw
    }

    fn record_grid(&mut self) {
        if self.grid.is_inert() {
            return;
        }
        let gt = self.gametype;
        let grid = &self.grid;
        self.book.record(|| SpinEvent::GridMultipliers { gametype: gt, grid: grid.cells().to_vec() });
    }

    /// Tier reel weights in freegame, otherwise the condition's
    fn reel_weights(&self) -> &'a WeightedTable<String> {
        let conditions: &'a ConditionSet = self.conditions;
        match (self.gametype, self.tier.and_then(|t| t.reel_weights.as_ref())) {
            (GameType::Free, Some(weights)) => weights,
            (gt, _) => conditions.reel_weights.get(gt),
        }
    }

    fn wild_multipliers(&self) -> Option<&'a WeightedTable<u32>> {
        let conditions: &'a ConditionSet = self.conditions;
        let gt = self.gametype;
        conditions.mult_values.as_ref().map(|m| m.get(gt))
    }

    fn is_satisfied(&self, total: f64) -> bool {
        let target_met = self
            .conditions
            .win_criteria
            .is_none_or(|target| to_minor_units(target) == to_minor_units(total));
        target_met
            && (!self.conditions.force_wincap || self.result.wincap_triggered)
            && (!self.conditions.force_freegame || self.result.freegame_triggered)
    }
}

/// One scatter short of entry with the last scatter before the final reel
fn is_near_miss(game: &Game, board: &Board, scatters: &[Position]) -> bool {
    let Some(min) = game.config().freespin_triggers.min_count(GameType::Base) else {
        return false;
    };
    scatters.len() as u32 + 1 == min
        && scatters
            .iter()
            .map(|p| p.reel)
            .max()
            .is_some_and(|last| last + 1 < board.num_reels())
}

fn missing_board() -> SpinError {
    SpinError::invariant("no board drawn for this reveal")
}
