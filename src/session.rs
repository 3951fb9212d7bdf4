//! Control Surface (`[ControlSurface]`): the engine's session-oriented API.
//!
//! Mirrors the teacher's `main.rs`/`gtp.rs` split conceptually (a thin
//! driver calling into engine internals) but replaces the GTP text
//! protocol parser with a plain Rust API, per the distilled spec's
//! "an external GTP shim invokes it" framing -- the shim itself is
//! explicitly out of scope; this struct is what it would call.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use log::info;

use crate::config::{ConfigError, EngineConfig, TimeMode};
use crate::features::FeatureState;
use crate::geometry::Point;
use crate::mcts::Mcts;
use crate::params::{ParamLoadError, SimParams, UctParams};
use crate::patterns::PatternState;
use crate::position::{MoveError, Position};
use crate::search::{SearchManager, SearchOutcome};
use crate::zobrist::ZobristTables;

/// `genmove`'s result: a played point, a pass, or a resignation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenmoveResult {
    Move(Point),
    Pass,
    Resign,
}

/// Everything `configure()` needs to (re)build from scratch: board state,
/// incremental pattern/feature trackers, the search tree, and the clock.
pub struct EngineSession {
    cfg: Arc<EngineConfig>,
    uct_params: Arc<UctParams>,
    sim_params: Arc<SimParams>,
    pos: Position,
    patterns: PatternState,
    features: FeatureState,
    mcts: Mcts,
    manager: SearchManager,
    stop: AtomicBool,
    moves_played: u32,
}

impl EngineSession {
    /// `configure(board_size, komi, superko)`: (re)initializes constants,
    /// board, and pattern masks, loading parameter tables from the
    /// directories named in `cfg` (fatal on missing/malformed files, per
    /// the error-handling policy -- no partial loading).
    pub fn configure(board_size: u8, komi: f32, positional_superko: bool) -> Result<Self, ParamLoadError> {
        let mut cfg = EngineConfig::new(board_size, komi).map_err(config_error_to_param_error)?;
        cfg.positional_superko = positional_superko;
        Self::configure_with(cfg)
    }

    fn configure_with(cfg: EngineConfig) -> Result<Self, ParamLoadError> {
        let uct_params = UctParams::load(&cfg.param_dir)?;
        let sim_params = SimParams::load(&cfg.sim_param_dir)?;
        let cfg = Arc::new(cfg);
        let zobrist = Arc::new(ZobristTables::new(&cfg, 0x9e3779b97f4a7c15));
        let uct_params = Arc::new(uct_params);
        let sim_params = Arc::new(sim_params);

        let mut pos = Position::new(Arc::clone(&cfg), zobrist);
        pos.initialize();
        let mut patterns = PatternState::new(pos.board.len());
        patterns.reset(&pos.geom, &pos.board);
        let features = FeatureState::new(pos.board.len());

        let mcts = Mcts::new(Arc::clone(&cfg), Arc::clone(&uct_params), Arc::clone(&sim_params));
        let manager = SearchManager::new((*cfg).clone());

        info!("configured: board_size={board_size}, komi={komi}");
        Ok(EngineSession {
            cfg,
            uct_params,
            sim_params,
            pos,
            patterns,
            features,
            mcts,
            manager,
            stop: AtomicBool::new(false),
            moves_played: 0,
        })
    }

    /// Same as [`Self::configure`] but loads parameter tables from explicit
    /// directories rather than `EngineConfig`'s defaults -- used by tests
    /// and by callers running outside the expected working directory.
    pub fn configure_with_param_dirs(
        board_size: u8,
        komi: f32,
        param_dir: &Path,
        sim_param_dir: &Path,
    ) -> Result<Self, ParamLoadError> {
        let mut cfg = EngineConfig::new(board_size, komi).map_err(config_error_to_param_error)?;
        cfg.param_dir = param_dir.to_path_buf();
        cfg.sim_param_dir = sim_param_dir.to_path_buf();
        Self::configure_with(cfg)
    }

    /// `set_time(main_seconds, byoyomi_seconds, byoyomi_stones)`.
    pub fn set_time(&mut self, main_seconds: f64, byoyomi_seconds: f64, byoyomi_stones: u32) {
        self.manager.set_time_mode(TimeMode::MainTimePlusByoyomi {
            main_seconds,
            byoyomi_seconds,
            byoyomi_stones,
        });
    }

    pub fn set_playouts(&mut self, n: u32) {
        self.manager.set_time_mode(TimeMode::ConstantPlayouts(n));
    }

    pub fn set_time_per_move(&mut self, seconds: f64) {
        self.manager.set_time_mode(TimeMode::ConstantTimePerMove(seconds));
    }

    /// `clear_board`: new game, all state reset except `EngineConfig`.
    pub fn clear_board(&mut self) {
        self.pos = Position::new(Arc::clone(&self.cfg), self.pos_zobrist());
        self.pos.initialize();
        self.patterns = PatternState::new(self.pos.board.len());
        self.patterns.reset(&self.pos.geom, &self.pos.board);
        self.features = FeatureState::new(self.pos.board.len());
        self.mcts = Mcts::new(Arc::clone(&self.cfg), Arc::clone(&self.uct_params), Arc::clone(&self.sim_params));
        self.manager.reset_clock();
        self.moves_played = 0;
        info!("board cleared");
    }

    fn pos_zobrist(&self) -> Arc<ZobristTables> {
        // `Position` doesn't expose its Zobrist table directly (it's a
        // private field used only for incremental hashing); `clear_board`
        // needs a fresh one anyway since the engine never mutates it in
        // place, so build one deterministically from the same config.
        Arc::new(ZobristTables::new(&self.cfg, 0x9e3779b97f4a7c15))
    }

    /// `play(color, coordinate|PASS)`: applies the move and refreshes
    /// incremental pattern/feature state; never mutates on error.
    pub fn play(&mut self, color: u8, point: Point) -> Result<(), MoveError> {
        self.pos.place_stone(point, color)?;
        for &(pt, old, new) in &self.pos.cell_changes {
            self.patterns.on_cell_change(&self.pos.geom, pt, old, new);
        }
        for &pt in &self.pos.update_this_move {
            self.features.clear_at(pt);
        }
        if point != crate::geometry::PASS {
            crate::features::check_features_around_last_move(&self.pos, &mut self.features);
            crate::features::check_capture_after_ko(&self.pos, &mut self.features);
            crate::features::check_remove_2_stones(&self.pos, &mut self.features);
        }
        self.mcts.retain_subtree(point);
        self.moves_played += 1;
        Ok(())
    }

    /// `genmove(color)`: run the search, pick a move, apply it.
    pub fn genmove(&mut self, color: u8) -> GenmoveResult {
        self.stop.store(false, std::sync::atomic::Ordering::Relaxed);
        // `to_move` tracks whoever's turn it actually is; a caller asking
        // for a color other than that is requesting an out-of-turn
        // decision, which is out of scope for this API (the search always
        // evaluates the position as it stands).
        debug_assert_eq!(color, self.pos.to_move);

        let outcome = self.manager.genmove(
            &mut self.mcts,
            &self.pos,
            &self.features,
            &self.patterns,
            &self.uct_params,
            &self.sim_params,
            self.moves_played,
            &self.stop,
        );

        match outcome {
            SearchOutcome::Resign => GenmoveResult::Resign,
            SearchOutcome::Move(point) => {
                self.play(color, point).expect("search only selects legal moves");
                if point == crate::geometry::PASS {
                    GenmoveResult::Pass
                } else {
                    GenmoveResult::Move(point)
                }
            }
        }
    }

    /// Cooperatively halt an in-progress `genmove` (e.g. pondering or a
    /// long time-controlled search) from another context. A no-op if no
    /// search is running.
    pub fn stop(&self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    /// `final_score`: Chinese area score minus komi, signed for black.
    pub fn final_score(&self) -> f32 {
        self.pos.calculate_score() as f32 - self.cfg.komi
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    pub fn to_move(&self) -> u8 {
        self.pos.to_move
    }
}

fn config_error_to_param_error(err: ConfigError) -> ParamLoadError {
    ParamLoadError::Io {
        path: std::path::PathBuf::from("<config>"),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
    }
}
