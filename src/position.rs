//! Go position representation and move execution (Board Engine).
//!
//! Unlike the teacher's relative `X`/`x` color-swap scheme, colors here are
//! absolute (`BLACK`/`WHITE`/`EMPTY`/`OFF_BOARD`, see `geometry.rs`) so the
//! position hash can be updated incrementally (XOR in/out a fixed
//! `(point, color)` bit) instead of recomputed by a full-board swap every
//! move. Strings are arena-indexed (`strings::StringPool`) rather than
//! discovered by flood fill on demand.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::geometry::{opposite, Geometry, Point, BLACK, EMPTY, OFF_BOARD, PASS, WHITE};
use crate::strings::{StringId, StringPool, NONE};
use crate::zobrist::{Hash, ZobristTables};

/// Result of attempting to play a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// Point is not empty.
    Occupied,
    /// Move violates the ko rule.
    Ko,
    /// Move would be suicide (no liberties after capture resolution).
    Suicide,
    /// Rejected by positional superko.
    Superko,
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            MoveError::Occupied => "point not empty",
            MoveError::Ko => "retakes ko",
            MoveError::Suicide => "suicide",
            MoveError::Superko => "repeats a prior position",
        };
        write!(f, "illegal move: {msg}")
    }
}

impl std::error::Error for MoveError {}

#[derive(Debug, Clone, Copy)]
pub struct MoveRecord {
    pub color: u8,
    pub pos: Point,
    pub hash: Hash,
}

/// A Go position (board state): board array, string pool, move history,
/// rolling Zobrist hashes. Mirrors the original's `game_info_t`.
#[derive(Clone)]
pub struct Position {
    cfg: Arc<EngineConfig>,
    pub geom: Geometry,
    zobrist: Arc<ZobristTables>,

    pub board: Vec<u8>,
    pub strings: StringPool,

    pub history: Vec<MoveRecord>,
    pub moves: u32,
    pub prisoners: [u32; 2],

    pub ko_pos: Point,
    pub ko_move: u32,

    pub current_hash: Hash,
    pub previous1_hash: Hash,
    pub previous2_hash: Hash,
    pub positional_hash: Hash,
    pub move_hash: Hash,

    pub pass_count: u32,
    pub to_move: u8,

    /// Stones captured by the most recent move, cleared at the start of
    /// each `place_stone` call.
    pub captured_this_move: Vec<Point>,
    /// Coordinates whose tactical features/patterns need refreshing after
    /// the most recent move.
    pub update_this_move: Vec<Point>,
    /// `(point, old_color, new_color)` for every cell that changed during
    /// the most recent move, in order; feeds `patterns::PatternState`'s
    /// incremental ring-code maintenance.
    pub cell_changes: Vec<(Point, u8, u8)>,

    superko_history: Option<HashSet<Hash>>,
}

impl Position {
    pub fn new(cfg: Arc<EngineConfig>, zobrist: Arc<ZobristTables>) -> Self {
        let geom = Geometry::new(&cfg);
        let board_max = geom.board_max;
        let board = vec![OFF_BOARD; board_max];
        let capacity = cfg.node_pool_capacity.min(1 << 20).max(64);
        let superko_history = if cfg.positional_superko {
            Some(HashSet::new())
        } else {
            None
        };
        let mut pos = Position {
            cfg,
            geom,
            zobrist,
            board,
            strings: StringPool::new(board_max, capacity),
            history: Vec::new(),
            moves: 0,
            prisoners: [0, 0],
            ko_pos: PASS,
            ko_move: 0,
            current_hash: 0,
            previous1_hash: 0,
            previous2_hash: 0,
            positional_hash: 0,
            move_hash: 0,
            pass_count: 0,
            to_move: BLACK,
            captured_this_move: Vec::new(),
            update_this_move: Vec::new(),
            cell_changes: Vec::new(),
            superko_history,
        };
        pos.initialize();
        pos
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    #[inline]
    pub fn color_at(&self, pt: Point) -> u8 {
        self.board[pt as usize]
    }

    /// Re-initialize to an empty board; clears records, keeps config/komi.
    pub fn initialize(&mut self) {
        for i in 0..self.board.len() {
            self.board[i] = OFF_BOARD;
        }
        for pt in self.geom.points() {
            self.board[pt as usize] = EMPTY;
        }
        self.strings.clear();
        self.history.clear();
        self.moves = 0;
        self.prisoners = [0, 0];
        self.ko_pos = PASS;
        self.ko_move = 0;
        self.current_hash = 0;
        self.previous1_hash = 0;
        self.previous2_hash = 0;
        self.positional_hash = 0;
        self.move_hash = 0;
        self.pass_count = 0;
        self.to_move = BLACK;
        self.captured_this_move.clear();
        self.update_this_move.clear();
        self.cell_changes.clear();
        if let Some(h) = &mut self.superko_history {
            h.clear();
            h.insert(0);
        }
    }

    #[inline]
    fn string_liberties(&self, id: StringId) -> usize {
        self.strings.liberty_count(id)
    }

    /// Would `color` playing at `point` be legal by the suicide rule alone?
    /// Returns (legal, enemy strings that would be captured).
    fn capture_analysis(&self, point: Point, color: u8) -> (bool, Vec<StringId>) {
        let opp = opposite(color);
        let mut legal = false;
        let mut captured_enemy_strings = Vec::new();
        for n in self.geom.orthogonal_neighbors(point) {
            let c = self.board[n as usize];
            if c == EMPTY {
                legal = true;
            } else if c == color {
                let id = self.strings.owner_of(n);
                if self.string_liberties(id) > 1 {
                    legal = true;
                }
            } else if c == opp {
                let id = self.strings.owner_of(n);
                if self.string_liberties(id) == 1 {
                    legal = true;
                    if !captured_enemy_strings.contains(&id) {
                        captured_enemy_strings.push(id);
                    }
                }
            }
        }
        (legal, captured_enemy_strings)
    }

    fn own_neighbor_strings(&self, point: Point, color: u8) -> Vec<StringId> {
        let mut ids = Vec::new();
        for n in self.geom.orthogonal_neighbors(point) {
            if self.board[n as usize] == color {
                let id = self.strings.owner_of(n);
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// `4.A is_legal`.
    pub fn is_legal(&self, point: Point, color: u8) -> bool {
        if point == PASS {
            return true;
        }
        if self.board[point as usize] != EMPTY {
            return false;
        }
        if point == self.ko_pos && self.moves == self.ko_move {
            return false;
        }
        let (legal, captured) = self.capture_analysis(point, color);
        if !legal {
            return false;
        }
        if let Some(history) = &self.superko_history {
            let hash = self.hypothetical_positional_hash(point, color, &captured);
            if history.contains(&hash) {
                return false;
            }
        }
        true
    }

    /// True if placing `color` at `point` is a simple eye for that color
    /// (all four orthogonal neighbors own-color-or-border, and the
    /// diagonal configuration doesn't classify as a false eye).
    fn is_simple_eye(&self, point: Point, color: u8) -> bool {
        for n in self.geom.orthogonal_neighbors(point) {
            let c = self.board[n as usize];
            if c != color && c != OFF_BOARD {
                return false;
            }
        }
        let diagonals = self.geom.diagonal_neighbors(point);
        let on_edge = diagonals.iter().any(|&d| self.board[d as usize] == OFF_BOARD);
        let opp = opposite(color);
        let enemy_diagonals = diagonals
            .iter()
            .filter(|&&d| self.board[d as usize] == opp)
            .count();
        let false_eye_threshold = if on_edge { 1 } else { 2 };
        if enemy_diagonals >= false_eye_threshold {
            return self.adjacent_strings_share_other_liberty(point, color);
        }
        true
    }

    fn adjacent_strings_share_other_liberty(&self, point: Point, color: u8) -> bool {
        let ids = self.own_neighbor_strings(point, color);
        if ids.len() < 2 {
            return false;
        }
        let mut common: Option<HashSet<Point>> = None;
        for id in ids {
            let libs: HashSet<Point> = self
                .strings
                .liberties(id)
                .iter()
                .copied()
                .filter(|&p| p != point)
                .collect();
            common = Some(match common {
                None => libs,
                Some(prev) => prev.intersection(&libs).copied().collect(),
            });
        }
        common.map(|s| !s.is_empty()).unwrap_or(false)
    }

    /// `4.A is_legal_not_eye`.
    pub fn is_legal_not_eye(&self, point: Point, color: u8) -> bool {
        if !self.is_legal(point, color) {
            return false;
        }
        if point == PASS {
            return true;
        }
        if !self.is_simple_eye(point, color) {
            return true;
        }
        // A simple eye is still playable if filling it would leave an
        // adjacent own string in atari (the eye is its last liberty).
        self.geom.orthogonal_neighbors(point).iter().any(|&n| {
            self.board[n as usize] == color && self.string_liberties(self.strings.owner_of(n)) == 1
        })
    }

    fn hypothetical_positional_hash(&self, point: Point, color: u8, captured: &[StringId]) -> Hash {
        let mut h = self.positional_hash ^ self.zobrist.stone_hash(point, color);
        for &id in captured {
            for &pt in &self.strings.stones(id) {
                h ^= self.zobrist.stone_hash(pt, opposite(color));
            }
        }
        h
    }

    /// `4.A place_stone`. Rejects the move with `MoveError` if illegal
    /// (never mutates state on rejection), matching §7's "illegal move
    /// requested" policy.
    pub fn place_stone(&mut self, point: Point, color: u8) -> Result<(), MoveError> {
        if point != PASS && !self.is_legal(point, color) {
            return Err(if point == self.ko_pos && self.moves == self.ko_move {
                MoveError::Ko
            } else if self.board[point as usize] != EMPTY {
                MoveError::Occupied
            } else if !self.capture_analysis(point, color).0 {
                // Suicide must be checked ahead of superko: a move with no
                // liberties after captures is illegal regardless of
                // superko, and reporting it as `Superko` would hide the
                // real reason even when positional superko is enabled.
                MoveError::Suicide
            } else {
                MoveError::Superko
            });
        }

        self.captured_this_move.clear();
        self.update_this_move.clear();
        self.cell_changes.clear();
        self.previous2_hash = self.previous1_hash;
        self.previous1_hash = self.current_hash;

        if point == PASS {
            self.pass_count += 1;
            self.current_hash ^= self.zobrist.black_to_move;
            self.move_hash ^= self.zobrist.move_seq_hash(self.moves, PASS, color);
            self.history.push(MoveRecord {
                color,
                pos: PASS,
                hash: self.current_hash,
            });
            self.moves += 1;
            self.to_move = opposite(color);
            return Ok(());
        }
        self.pass_count = 0;

        let own_neighbors = self.own_neighbor_strings(point, color);
        let (_, captured_enemy) = self.capture_analysis(point, color);

        for id in captured_enemy {
            self.string_remove(id, color);
        }

        self.board[point as usize] = color;
        self.cell_changes.push((point, EMPTY, color));
        for n in self.geom.all_neighbors(point) {
            if self.board[n as usize] != OFF_BOARD {
                self.update_this_move.push(n);
            }
        }
        self.update_this_move.push(point);

        let mut liberties = Vec::new();
        for n in self.geom.orthogonal_neighbors(point) {
            if self.board[n as usize] == EMPTY {
                liberties.push(n);
            }
        }
        for n in self.geom.orthogonal_neighbors(point) {
            let c = self.board[n as usize];
            if c == color || c == opposite(color) {
                let id = self.strings.owner_of(n);
                self.strings.remove_liberty(id, point);
            }
        }

        let mut ids = own_neighbors;
        ids.sort_unstable();
        ids.dedup();

        let new_id = match ids.len() {
            0 => {
                let id = self.strings.create(point, color, liberties);
                self.current_hash ^= self.zobrist.stone_hash(point, color);
                id
            }
            1 => {
                let id = ids[0];
                self.strings.add_stone(id, point, liberties);
                self.current_hash ^= self.zobrist.stone_hash(point, color);
                id
            }
            _ => {
                let base = ids[0];
                self.strings.add_stone(base, point, liberties);
                self.current_hash ^= self.zobrist.stone_hash(point, color);
                let mut merged = base;
                for &other in &ids[1..] {
                    merged = self.strings.merge(merged, other);
                }
                merged
            }
        };

        for n in self.geom.orthogonal_neighbors(point) {
            if self.board[n as usize] == opposite(color) {
                let enemy = self.strings.owner_of(n);
                self.strings.link_neighbors(new_id, enemy);
            }
        }

        let total_captured = self.captured_this_move.len();
        self.ko_pos = if total_captured == 1 && self.strings.liberty_count(new_id) == 1 {
            self.ko_move = self.moves + 1;
            self.strings.liberties(new_id)[0]
        } else {
            PASS
        };

        self.positional_hash = self.current_hash;
        if let Some(history) = &mut self.superko_history {
            history.insert(self.positional_hash);
        }
        self.move_hash ^= self.zobrist.move_seq_hash(self.moves, point, color);
        self.history.push(MoveRecord {
            color,
            pos: point,
            hash: self.current_hash,
        });
        self.moves += 1;
        self.to_move = opposite(color);
        Ok(())
    }

    /// `4.A string_remove`. Removes a captured string, reopening its
    /// points as liberties of every still-adjacent surviving string and
    /// crediting the captor's prisoner tally.
    fn string_remove(&mut self, id: StringId, captor_color: u8) {
        let victim_color = self.strings.color(id);
        let stones = self.strings.remove(id);
        for &pt in &stones {
            self.board[pt as usize] = EMPTY;
            self.cell_changes.push((pt, victim_color, EMPTY));
            self.current_hash ^= self.zobrist.stone_hash(pt, victim_color);
            self.captured_this_move.push(pt);
            self.update_this_move.push(pt);
            for n in self.geom.orthogonal_neighbors(pt) {
                let c = self.board[n as usize];
                if c != EMPTY && c != OFF_BOARD {
                    let nid = self.strings.owner_of(n);
                    self.strings.add_liberty(nid, pt);
                }
            }
        }
        let idx = if captor_color == BLACK { 0 } else { 1 };
        self.prisoners[idx] += stones.len() as u32;
    }

    /// `4.A calculate_score`: Chinese area scoring (stones + fully-enclosed
    /// single-color territory), returning black score minus white score
    /// (caller adds komi). When `bent_four_correction` is set, the corner
    /// groups `bent_four_in_the_corner_points` identifies are scored as
    /// captured before the area count runs.
    pub fn calculate_score(&self) -> i32 {
        if self.cfg.bent_four_correction {
            let mut effective = self.board.clone();
            for (pt, color) in self.bent_four_in_the_corner_points() {
                effective[pt as usize] = color;
            }
            self.calculate_score_over(&effective)
        } else {
            self.calculate_score_over(&self.board)
        }
    }

    fn calculate_score_over(&self, board: &[u8]) -> i32 {
        let mut visited = vec![false; board.len()];
        let mut black = 0i32;
        let mut white = 0i32;
        for pt in self.geom.points() {
            match board[pt as usize] {
                c if c == BLACK => black += 1,
                c if c == WHITE => white += 1,
                c if c == EMPTY => {
                    if visited[pt as usize] {
                        continue;
                    }
                    let (region, (saw_black, saw_white)) =
                        self.flood_empty_region(board, pt, &mut visited);
                    if saw_black && !saw_white {
                        black += region.len() as i32;
                    } else if saw_white && !saw_black {
                        white += region.len() as i32;
                    }
                }
                _ => {}
            }
        }
        black - white
    }

    /// The four literal board-corner intersections.
    fn corner_points(&self) -> [Point; 4] {
        let (s, e) = (self.geom.start as usize, self.geom.end as usize);
        [
            self.geom.at(s, s),
            self.geom.at(s, e),
            self.geom.at(e, s),
            self.geom.at(e, e),
        ]
    }

    /// Bent-four-in-the-corner detector, `GoBoard.cpp`'s
    /// `CheckBentFourInTheCorner`: a 3-stone string rooted in a board
    /// corner with exactly 2 liberties and exactly one neighboring enemy
    /// string is the small side of the shape; if that neighbor shares both
    /// of those liberties as its *only* liberties and is large enough to
    /// not be a trivial shape itself (`size > 6`), the whole corner is a
    /// won capturing race that area scoring alone can't see (the position
    /// is technically seki-shaped but one side is always capturable in ko).
    /// Returns `(point, color)` pairs -- the big string's stones plus its
    /// two liberties, attributed to the small string's color -- for the
    /// caller to paint onto a scoring-only copy of the board.
    fn bent_four_in_the_corner_points(&self) -> Vec<(Point, u8)> {
        let mut out = Vec::new();
        for corner in self.corner_points() {
            let id = self.strings.owner_of(corner);
            if id == NONE {
                continue;
            }
            if self.strings.size(id) != 3 || self.strings.liberty_count(id) != 2 {
                continue;
            }
            let neighbors = self.strings.neighbors(id);
            if neighbors.len() != 1 {
                continue;
            }
            let color = self.strings.color(id);
            let neighbor_id = neighbors[0];
            if self.strings.color(neighbor_id) == color {
                continue;
            }
            if self.strings.liberty_count(neighbor_id) != 2 || self.strings.size(neighbor_id) <= 6 {
                continue;
            }
            let corner_libs = self.strings.liberties(id);
            let neighbor_libs = self.strings.liberties(neighbor_id);
            let same_libs = corner_libs.len() == neighbor_libs.len()
                && corner_libs.iter().all(|p| neighbor_libs.contains(p));
            if !same_libs {
                continue;
            }
            for pt in self.strings.stones(neighbor_id) {
                out.push((pt, color));
            }
            for &pt in neighbor_libs {
                out.push((pt, color));
            }
        }
        out
    }

    fn flood_empty_region(
        &self,
        board: &[u8],
        start: Point,
        visited: &mut [bool],
    ) -> (Vec<Point>, (bool, bool)) {
        let mut stack = vec![start];
        let mut region = Vec::new();
        let mut saw_black = false;
        let mut saw_white = false;
        visited[start as usize] = true;
        while let Some(pt) = stack.pop() {
            region.push(pt);
            for n in self.geom.orthogonal_neighbors(pt) {
                match board[n as usize] {
                    c if c == EMPTY => {
                        if !visited[n as usize] {
                            visited[n as usize] = true;
                            stack.push(n);
                        }
                    }
                    c if c == BLACK => saw_black = true,
                    c if c == WHITE => saw_white = true,
                    _ => {}
                }
            }
        }
        (region, (saw_black, saw_white))
    }

    pub fn parse_coord(&self, s: &str) -> Point {
        self.geom.parse_coord(s)
    }

    pub fn str_coord(&self, pt: Point) -> String {
        self.geom.str_coord(pt)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.geom.board_size {
            for col in 0..self.geom.board_size {
                let pt = self.geom.at(row + crate::config::BORDER, col + crate::config::BORDER);
                let ch = match self.board[pt as usize] {
                    c if c == BLACK => 'X',
                    c if c == WHITE => 'O',
                    c if c == EMPTY => '.',
                    _ => ' ',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn fresh(size: u8) -> Position {
        let cfg = Arc::new(EngineConfig::new(size, 7.5).unwrap());
        let zobrist = Arc::new(ZobristTables::new(&cfg, 7));
        Position::new(cfg, zobrist)
    }

    #[test]
    fn empty_board_has_no_strings() {
        let pos = fresh(9);
        for pt in pos.geom.points() {
            assert_eq!(pos.strings.owner_of(pt), NONE);
        }
    }

    #[test]
    fn single_stone_is_legal_and_placeable() {
        let mut pos = fresh(9);
        let pt = pos.parse_coord("E5");
        assert!(pos.is_legal(pt, BLACK));
        pos.place_stone(pt, BLACK).unwrap();
        assert_eq!(pos.color_at(pt), BLACK);
        let id = pos.strings.owner_of(pt);
        assert_eq!(pos.strings.liberty_count(id), 4);
    }

    #[test]
    fn surrounding_and_capturing_a_stone_removes_it() {
        let mut pos = fresh(9);
        let center = pos.parse_coord("E5");
        pos.place_stone(center, WHITE).unwrap();
        for coord in ["E6", "D5", "F5"] {
            let pt = pos.parse_coord(coord);
            pos.place_stone(pt, BLACK).unwrap();
        }
        assert_eq!(pos.strings.liberty_count(pos.strings.owner_of(center)), 1);
        let last = pos.parse_coord("E4");
        pos.place_stone(last, BLACK).unwrap();
        assert_eq!(pos.color_at(center), EMPTY);
        assert_eq!(pos.prisoners[0], 1);
    }

    #[test]
    fn suicide_move_is_illegal() {
        let mut pos = fresh(9);
        for coord in ["D5", "E6", "F5", "E4"] {
            let pt = pos.parse_coord(coord);
            pos.place_stone(pt, BLACK).unwrap();
        }
        let center = pos.parse_coord("E5");
        assert!(!pos.is_legal(center, WHITE));
    }

    #[test]
    fn occupied_point_is_illegal() {
        let mut pos = fresh(9);
        let pt = pos.parse_coord("E5");
        pos.place_stone(pt, BLACK).unwrap();
        assert!(!pos.is_legal(pt, WHITE));
    }

    #[test]
    fn score_counts_stones_and_enclosed_territory() {
        let mut pos = fresh(9);
        for coord in ["A1", "A2", "B1"] {
            let pt = pos.parse_coord(coord);
            pos.place_stone(pt, BLACK).unwrap();
        }
        assert!(pos.calculate_score() > 0);
    }

    /// Builds the classic bent-four-in-the-corner shape: a 3-stone black
    /// bend at the corner down to 2 liberties, a 9-stone white block whose
    /// only liberties are those same 2 points, and enough extra black
    /// stones sealing every other white liberty to make that true.
    fn bent_four_position(size: u8, correction: bool) -> Position {
        let mut cfg = EngineConfig::new(size, 7.5).unwrap();
        cfg.bent_four_correction = correction;
        let cfg = Arc::new(cfg);
        let zobrist = Arc::new(ZobristTables::new(&cfg, 7));
        let mut pos = Position::new(cfg, zobrist);
        let b = pos.geom.start as usize;
        let at = |pos: &Position, r: usize, c: usize| pos.geom.at(b + r - 1, b + c - 1);

        for (r, c) in [(1, 1), (1, 2), (2, 1)] {
            let pt = at(&pos, r, c);
            pos.place_stone(pt, BLACK).unwrap();
        }
        for (r, c) in [
            (2, 2), (2, 3), (2, 4),
            (3, 2), (3, 3), (3, 4),
            (4, 2), (4, 3), (4, 4),
        ] {
            let pt = at(&pos, r, c);
            pos.place_stone(pt, WHITE).unwrap();
        }
        for (r, c) in [(1, 4), (4, 1), (2, 5), (3, 5), (4, 5), (5, 2), (5, 3), (5, 4)] {
            let pt = at(&pos, r, c);
            pos.place_stone(pt, BLACK).unwrap();
        }
        pos
    }

    #[test]
    fn bent_four_in_the_corner_is_detected_with_the_whole_white_block() {
        let pos = bent_four_position(9, true);
        let b = pos.geom.start as usize;
        let corner = pos.geom.at(b, b);
        let corner_id = pos.strings.owner_of(corner);
        assert_eq!(pos.strings.size(corner_id), 3);
        assert_eq!(pos.strings.liberty_count(corner_id), 2);

        let points = pos.bent_four_in_the_corner_points();
        assert!(points.iter().all(|&(_, color)| color == BLACK));
        // The white block's 9 stones plus its 2 shared liberties.
        assert_eq!(points.len(), 11);
    }

    #[test]
    fn bent_four_correction_only_applies_when_enabled() {
        let corrected = bent_four_position(9, true);
        let uncorrected = bent_four_position(9, false);
        assert!(corrected.calculate_score() > uncorrected.calculate_score());
    }

    #[test]
    fn pass_twice_increments_pass_count_and_flips_turn() {
        let mut pos = fresh(9);
        pos.place_stone(PASS, BLACK).unwrap();
        assert_eq!(pos.pass_count, 1);
        assert_eq!(pos.to_move, WHITE);
        pos.place_stone(PASS, WHITE).unwrap();
        assert_eq!(pos.pass_count, 2);
    }

    #[test]
    fn ko_point_is_illegal_immediately_after_capture() {
        let mut pos = fresh(9);
        let b = pos.geom.start as usize;
        let at = |pos: &Position, r: usize, c: usize| pos.geom.at(b + r - 1, b + c - 1);

        for (r, c, color) in [
            (1, 2, BLACK),
            (2, 1, BLACK),
            (3, 2, BLACK),
            (1, 3, WHITE),
            (2, 4, WHITE),
            (3, 3, WHITE),
            (2, 2, WHITE),
        ] {
            let pt = at(&pos, r, c);
            pos.place_stone(pt, color).unwrap();
        }

        let recapture = at(&pos, 2, 3);
        assert!(pos.is_legal(recapture, BLACK));
        pos.place_stone(recapture, BLACK).unwrap();

        let ko_point = at(&pos, 2, 2);
        assert_eq!(pos.color_at(ko_point), EMPTY);
        assert_eq!(pos.ko_pos, ko_point);
        assert!(!pos.is_legal(ko_point, WHITE));

        // After black plays elsewhere, white may retake.
        let elsewhere = at(&pos, 7, 7);
        pos.place_stone(elsewhere, BLACK).unwrap();
        assert!(pos.is_legal(ko_point, WHITE));
    }
}
