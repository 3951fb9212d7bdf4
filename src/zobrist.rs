//! Zobrist hash tables.
//!
//! The original engine keeps four running hashes per `game_info_t`:
//! `current_hash`, `previous1_hash`, `previous2_hash` (superko checks) and
//! `positional_hash` (ko-insensitive, used by the pattern/feature code) plus
//! a path-dependent `move_hash` folded from a second table keyed by move
//! index. We keep the same four-hash scheme but build the tables at runtime
//! (seeded, reproducible) instead of reading a shipped constant table, since
//! board size is now a runtime parameter.

use crate::config::EngineConfig;
use crate::geometry::{Point, BLACK, WHITE};

pub type Hash = u64;

/// Per-board-size random tables for incremental position/move hashing.
pub struct ZobristTables {
    /// `stone[color][point]`: xor'd in/out when a stone of `color` is placed/removed at `point`.
    stone: Vec<[Hash; 2]>,
    /// `ko[point]`: folded into `current_hash` while `point` is forbidden by ko.
    ko: Vec<Hash>,
    /// `black_to_move`: folded in/out on every turn change, so positions that
    /// differ only by whose turn it is never collide.
    pub black_to_move: Hash,
    /// `move_seq[ply % MOVE_SEQ_LEN][point][color]`: combined into the
    /// path-dependent move-sequence hash used as the transposition key.
    move_seq: Vec<[Hash; 2]>,
    move_seq_len: usize,
}

/// Number of distinct ply-parity slots mixed into the move-sequence hash.
/// The move-sequence hash is a rolling hash of (ply mod N, point, color)
/// triples rather than the full history, matching the original's practice of
/// hashing only recent move context into `move_hash` for transposition reuse.
const MOVE_SEQ_SLOTS: usize = 8;

impl ZobristTables {
    pub fn new(cfg: &EngineConfig, seed: u64) -> Self {
        let board_max = cfg.board_max();
        let mut rng = fastrand::Rng::with_seed(seed);
        let stone = (0..board_max).map(|_| [rng.u64(..), rng.u64(..)]).collect();
        let ko = (0..board_max).map(|_| rng.u64(..)).collect();
        let move_seq = (0..board_max * MOVE_SEQ_SLOTS)
            .map(|_| [rng.u64(..), rng.u64(..)])
            .collect();
        ZobristTables {
            stone,
            ko,
            black_to_move: rng.u64(..),
            move_seq,
            move_seq_len: MOVE_SEQ_SLOTS,
        }
    }

    #[inline]
    fn color_slot(color: u8) -> usize {
        debug_assert!(color == BLACK || color == WHITE);
        (color - 1) as usize
    }

    #[inline]
    pub fn stone_hash(&self, pt: Point, color: u8) -> Hash {
        self.stone[pt as usize][Self::color_slot(color)]
    }

    #[inline]
    pub fn ko_hash(&self, pt: Point) -> Hash {
        self.ko[pt as usize]
    }

    #[inline]
    pub fn move_seq_hash(&self, ply: u32, pt: Point, color: u8) -> Hash {
        let slot = ply as usize % self.move_seq_len;
        self.move_seq[slot * self.stone.len() + pt as usize][Self::color_slot(color)]
    }
}
