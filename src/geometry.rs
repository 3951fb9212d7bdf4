//! Padded-board coordinate arithmetic.
//!
//! Mirrors the teacher's `constants.rs` layout (a 1-D array padded on all
//! sides so neighbor lookups never need bounds checks) but computes the
//! stride from a runtime [`EngineConfig`] instead of a compile-time feature,
//! since the control surface's `configure(board_size, ...)` must be able to
//! pick 9, 13 or 19 at startup.

use crate::config::EngineConfig;

/// A single board intersection, index into the padded array.
pub type Point = u16;

pub const PASS: Point = 0;

/// Stone/cell colors. `opponent` is the classic XOR-3 trick: BLACK(1) ^ 3 =
/// WHITE(2), WHITE(2) ^ 3 = BLACK(1); only meaningful for BLACK/WHITE.
pub const EMPTY: u8 = 0;
pub const BLACK: u8 = 1;
pub const WHITE: u8 = 2;
pub const OFF_BOARD: u8 = 3;

#[inline]
pub fn opposite(color: u8) -> u8 {
    debug_assert!(color == BLACK || color == WHITE);
    color ^ 0x3
}

/// Neighbor direction order used throughout the pattern/feature code:
/// N, E, S, W, NE, SE, SW, NW.
#[derive(Clone, Copy)]
pub struct Geometry {
    pub board_size: usize,
    pub stride: usize,
    pub board_max: usize,
    pub start: Point,
    pub end: Point,
    pub delta: [i32; 8],
}

impl Geometry {
    pub fn new(cfg: &EngineConfig) -> Self {
        let board_size = cfg.board_size as usize;
        let stride = cfg.stride();
        let board_max = cfg.board_max();
        let s = stride as i32;
        Geometry {
            board_size,
            stride,
            board_max,
            start: crate::config::BORDER as Point,
            end: (stride - crate::config::BORDER - 1) as Point,
            delta: [-s, 1, s, -1, -s + 1, s + 1, s - 1, -s - 1],
        }
    }

    /// Index of the intersection at (row, col), both 1-indexed from the
    /// top-left playable corner.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> Point {
        (row * self.stride + col) as Point
    }

    #[inline]
    pub fn orthogonal_neighbors(&self, pt: Point) -> [Point; 4] {
        std::array::from_fn(|i| (pt as i32 + self.delta[i]) as Point)
    }

    #[inline]
    pub fn diagonal_neighbors(&self, pt: Point) -> [Point; 4] {
        std::array::from_fn(|i| (pt as i32 + self.delta[4 + i]) as Point)
    }

    #[inline]
    pub fn all_neighbors(&self, pt: Point) -> [Point; 8] {
        std::array::from_fn(|i| (pt as i32 + self.delta[i]) as Point)
    }

    /// Points at exact Manhattan (L1) distance `d` from `pt`, in a fixed
    /// angular order, used to build the ring-based MD-k patterns.
    pub fn ring(&self, pt: Point, d: i32) -> Vec<Point> {
        let s = self.stride as i32;
        let p = pt as i32;
        let mut out = Vec::with_capacity((4 * d) as usize);
        for dx in -d..=d {
            let dy = d - dx.abs();
            if dy == 0 {
                out.push(p + dx + 0 * s);
            } else {
                out.push(p + dx + dy * s);
                if dy != 0 {
                    out.push(p + dx - dy * s);
                }
            }
        }
        out.into_iter()
            .map(|x| x as Point)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distance from the nearest edge: 0 = first line, 1 = second line, etc.
    #[inline]
    pub fn line_height(&self, pt: Point) -> i32 {
        let row = pt as usize / self.stride;
        let col = pt as usize % self.stride;
        let b = crate::config::BORDER;
        let from_left = col as i32 - b as i32;
        let from_right = (self.board_size + b - 1) as i32 - col as i32;
        let from_top = row as i32 - b as i32;
        let from_bottom = (self.board_size + b - 1) as i32 - row as i32;
        from_left.min(from_right).min(from_top).min(from_bottom)
    }

    /// Parse a GTP-style coordinate ("D4", "pass") into a `Point`.
    pub fn parse_coord(&self, s: &str) -> Point {
        if s.eq_ignore_ascii_case("pass") {
            return PASS;
        }
        let bytes = s.as_bytes();
        if bytes.len() < 2 {
            return PASS;
        }
        let col_char = bytes[0].to_ascii_uppercase();
        let mut col = (col_char - b'A' + 1) as usize;
        if col_char > b'I' {
            col -= 1;
        }
        let row: usize = bytes[1..]
            .iter()
            .filter(|b| b.is_ascii_digit())
            .fold(0, |acc, &b| acc * 10 + (b - b'0') as usize);
        if row == 0 || row > self.board_size || col == 0 || col > self.board_size {
            return PASS;
        }
        self.at(self.board_size - row + crate::config::BORDER, col + crate::config::BORDER - 1)
    }

    /// Inverse of [`Self::parse_coord`].
    pub fn str_coord(&self, pt: Point) -> String {
        if pt == PASS {
            return "pass".into();
        }
        let b = crate::config::BORDER;
        let row = pt as usize / self.stride;
        let col = pt as usize % self.stride;
        let mut c = (b'A' + (col - b) as u8 - 1) as char;
        if c >= 'I' {
            c = ((c as u8) + 1) as char;
        }
        format!("{c}{}", self.board_size - (row - b))
    }

    /// True if `pt` lies in the playable (non-border) region.
    #[inline]
    pub fn on_board(&self, pt: Point) -> bool {
        let row = pt as usize / self.stride;
        let col = pt as usize % self.stride;
        let b = crate::config::BORDER;
        row >= b && row < b + self.board_size && col >= b && col < b + self.board_size
    }

    /// Iterate every playable intersection.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let b = crate::config::BORDER;
        (0..self.board_size).flat_map(move |r| {
            (0..self.board_size).map(move |c| self.at(r + b, c + b))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn geo(size: u8) -> Geometry {
        Geometry::new(&EngineConfig::new(size, 7.5).unwrap())
    }

    #[test]
    fn coord_roundtrip() {
        let g = geo(19);
        for pt in g.points() {
            let s = g.str_coord(pt);
            assert_eq!(g.parse_coord(&s), pt, "roundtrip failed for {s}");
        }
    }

    #[test]
    fn ring_sizes_match_manhattan_diamond() {
        let g = geo(19);
        let center = g.at(g.start as usize + 9, g.start as usize + 9);
        assert_eq!(g.ring(center, 1).len(), 4);
        assert_eq!(g.ring(center, 2).len(), 8);
        assert_eq!(g.ring(center, 3).len(), 12);
    }

    #[test]
    fn opposite_is_involution() {
        assert_eq!(opposite(opposite(BLACK)), BLACK);
        assert_eq!(opposite(BLACK), WHITE);
    }
}
