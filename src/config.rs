//! Engine-wide configuration.
//!
//! Every component takes an [`EngineConfig`] by reference (or a cheap clone)
//! rather than reading file-level constants, per the "from global mutable
//! state to explicit config" design note: board size, komi, time policy and
//! scoring weights are resolved once at `configure()` time and threaded
//! through afterwards. Only read-only derived tables (pattern bitsets,
//! Zobrist tables) are cached behind `OnceLock`s keyed off this config.

use thiserror::Error;

/// Smallest board this engine will play on.
pub const MIN_BOARD_SIZE: u8 = 5;
/// Largest board this engine will play on (spec non-goal: nothing beyond 19x19).
pub const MAX_BOARD_SIZE: u8 = 19;
/// Padding width around the playable grid (fixed; pattern update masks assume it).
pub const BORDER: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("board size {0} out of range [{MIN_BOARD_SIZE}, {MAX_BOARD_SIZE}]")]
    BadBoardSize(u8),
    #[error("komi {0} is not finite")]
    BadKomi(f32),
}

/// Which mode the [`crate::search::SearchManager`] should budget time in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeMode {
    /// Fixed number of playouts per move, no clock.
    ConstantPlayouts(u32),
    /// Fixed wall-clock budget per move.
    ConstantTimePerMove(f64),
    /// Single main-time budget shared across the whole game.
    MainTime(f64),
    /// Main time followed by Japanese byo-yomi.
    MainTimePlusByoyomi {
        main_seconds: f64,
        byoyomi_seconds: f64,
        byoyomi_stones: u32,
    },
}

impl Default for TimeMode {
    fn default() -> Self {
        TimeMode::ConstantPlayouts(1400)
    }
}

/// Immutable engine configuration, constructed once by `configure()`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub board_size: u8,
    pub komi: f32,
    pub positional_superko: bool,
    pub bent_four_correction: bool,
    pub resign_threshold: f64,
    pub time_mode: TimeMode,
    pub workers: usize,
    pub node_pool_capacity: usize,
    pub transposition_capacity: usize,
    pub param_dir: std::path::PathBuf,
    pub sim_param_dir: std::path::PathBuf,
}

impl EngineConfig {
    pub fn new(board_size: u8, komi: f32) -> Result<Self, ConfigError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&board_size) {
            return Err(ConfigError::BadBoardSize(board_size));
        }
        if !komi.is_finite() {
            return Err(ConfigError::BadKomi(komi));
        }
        Ok(EngineConfig {
            board_size,
            komi,
            positional_superko: false,
            bent_four_correction: false,
            resign_threshold: 0.2,
            time_mode: TimeMode::default(),
            workers: num_cpus::get().max(1),
            node_pool_capacity: default_node_pool_capacity(board_size),
            transposition_capacity: default_node_pool_capacity(board_size).next_power_of_two(),
            param_dir: std::path::PathBuf::from("uct_params"),
            sim_param_dir: std::path::PathBuf::from("sim_params"),
        })
    }

    /// Side length of the padded array (`S + 2*BORDER`).
    #[inline]
    pub fn stride(&self) -> usize {
        self.board_size as usize + 2 * BORDER
    }

    /// Number of cells in the padded array, including the sentinel row.
    #[inline]
    pub fn board_max(&self) -> usize {
        self.stride() * self.stride() + 1
    }

    /// Number of playable intersections (S^2).
    #[inline]
    pub fn intersections(&self) -> usize {
        self.board_size as usize * self.board_size as usize
    }

    /// Expansion-threshold visit count: board-size dependent per spec §4.G.
    pub fn expand_threshold(&self) -> u32 {
        match self.board_size {
            0..=10 => 40,
            11..=14 => 50,
            _ => 70,
        }
    }
}

fn default_node_pool_capacity(board_size: u8) -> usize {
    // Generous multiple of board area; bounds worst-case memory while
    // leaving headroom for deep reused trees.
    (board_size as usize * board_size as usize).saturating_mul(400).max(1 << 16)
}
