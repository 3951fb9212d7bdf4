//! Simulation Engine (Component E): one playout to a terminal position.
//!
//! Keeps the teacher's `mcplayout` shape -- loop until two consecutive
//! passes or a move-count ceiling, score the terminal position, flip the
//! result if the mover at the end differs in parity from the mover at the
//! start -- but replaces the teacher's priority-ordered capture/pattern/
//! random chooser with scored sampling over the lighter `SimParams` gamma
//! tables (first-order weights only, no latent-vector pairing), grounded in
//! `src/mcts/UctRating.cpp`'s `Gamma()` restricted to a playout's cheaper
//! feature set. Selection is row-then-column: sum weights per board row,
//! pick a row proportional to its sum, then a column within that row --
//! the same two-stage trick the original engine's playout rating uses to
//! avoid an O(board size) cumulative-sum walk in the common case.

use crate::features::{self, Family, FeatureState};
use crate::geometry::{Point, PASS};
use crate::params::SimParams;
use crate::patterns::PatternState;
use crate::position::Position;

/// Ceiling on playout length, proportional to board area (the original's
/// `MAX_GAME_LEN`-style cap, sized here per intersection count rather than
/// a fixed constant since board size is runtime-configurable).
fn move_ceiling(pos: &Position) -> u32 {
    (pos.geom.board_size as u32 * pos.geom.board_size as u32).saturating_mul(3)
}

/// First-order-only gamma for one candidate, from the simulation-time
/// tables (`SimParams`): product of every active tactical family's weight
/// and the matching Pat3 weight. Unlike the tree-search scorer (Component
/// D) there is no latent-vector pairing term -- the playout path is
/// intentionally cheaper per spec.
fn playout_gamma(sim: &SimParams, features: &FeatureState, patterns: &PatternState, point: Point) -> f64 {
    let mut gamma = 1.0;
    let mut apply = |table: &[f64], id: usize| {
        if id > 0 && id < table.len() {
            gamma *= table[id];
        }
    };
    apply(&sim.capture, features.get(point, Family::Capture) as usize);
    apply(&sim.save_extension, features.get(point, Family::SaveExtension) as usize);
    apply(&sim.atari, features.get(point, Family::Atari) as usize);
    apply(&sim.extension, features.get(point, Family::Extension) as usize);
    apply(&sim.dame, features.get(point, Family::Dame) as usize);
    apply(&sim.connect, features.get(point, Family::Connect) as usize);
    apply(&sim.throw_in, features.get(point, Family::ThrowIn) as usize);

    let pat3 = patterns.pat3_code(point) as usize;
    if pat3 < sim.pat3.len() {
        gamma *= sim.pat3[pat3];
    }
    gamma
}

/// One board row's legal candidates and their playout weights.
struct Row {
    points: Vec<Point>,
    weights: Vec<f64>,
    sum: f64,
}

/// Score every legal, non-self-eye-filling point for `color`, bucketed by
/// board row, ready for row-then-column sampling.
fn score_rows(
    pos: &Position,
    sim: &SimParams,
    features: &FeatureState,
    patterns: &PatternState,
    color: u8,
) -> Vec<Row> {
    let size = pos.geom.board_size as usize;
    let mut rows: Vec<Row> = (0..size)
        .map(|_| Row { points: Vec::new(), weights: Vec::new(), sum: 0.0 })
        .collect();
    for row in 0..size {
        for col in 0..size {
            let pt = pos.geom.at(row + crate::config::BORDER, col + crate::config::BORDER);
            if !pos.is_legal_not_eye(pt, color) {
                continue;
            }
            let w = playout_gamma(sim, features, patterns, pt);
            if w <= 0.0 {
                continue;
            }
            rows[row].points.push(pt);
            rows[row].weights.push(w);
            rows[row].sum += w;
        }
    }
    rows
}

/// Pick a row proportional to its total weight, then a column within that
/// row proportional to its individual weight. Returns `None` if every row
/// sum is zero (no legal scored candidate -- caller falls back to pass).
fn sample_rows(rows: &[Row], rng: &mut fastrand::Rng) -> Option<Point> {
    let total: f64 = rows.iter().map(|r| r.sum).sum();
    if total <= 0.0 {
        return None;
    }
    let mut r = rng.f64() * total;
    for row in rows {
        if r < row.sum {
            let mut c = r;
            for (i, &w) in row.weights.iter().enumerate() {
                if c < w || i == row.points.len() - 1 {
                    return Some(row.points[i]);
                }
                c -= w;
            }
            return row.points.last().copied();
        }
        r -= row.sum;
    }
    None
}

/// Refresh the incremental pattern/feature state for every cell touched by
/// the most recent move, mirroring `Position::cell_changes`'s bookkeeping
/// contract (pattern rings first, since feature tagging reads string
/// liberties that are already current by the time `place_stone` returns).
fn refresh_after_move(pos: &Position, patterns: &mut PatternState, features: &mut FeatureState) {
    for &(pt, old, new) in &pos.cell_changes {
        patterns.on_cell_change(&pos.geom, pt, old, new);
    }
    for &pt in &pos.update_this_move {
        features.clear_at(pt);
    }
    if pos.history.last().map(|r| r.pos) != Some(PASS) {
        features::check_features_around_last_move(pos, features);
        features::check_capture_after_ko(pos, features);
        features::check_remove_2_stones(pos, features);
    }
}

/// Run one playout from `pos` to a terminal position (two consecutive
/// passes or the move-count ceiling), scoring with Chinese area rules.
/// Mutates `pos`, `patterns`, and `features` in place -- callers that need
/// the starting position afterwards must pass in clones.
///
/// Returns the game result relative to the player to move when the
/// playout started: positive means that player won.
pub fn run_playout(
    pos: &mut Position,
    patterns: &mut PatternState,
    features: &mut FeatureState,
    sim: &SimParams,
    rng: &mut fastrand::Rng,
) -> f64 {
    let root_color = pos.to_move;
    let ceiling = pos.moves + move_ceiling(pos);
    let mut consecutive_passes = pos
        .history
        .iter()
        .rev()
        .take_while(|r| r.pos == PASS)
        .count() as u32;

    while consecutive_passes < 2 && pos.moves < ceiling {
        let to_move = pos.to_move;
        let rows = score_rows(pos, sim, features, patterns, to_move);
        let chosen = sample_rows(&rows, rng);
        let played = match chosen {
            Some(pt) => {
                if pos.place_stone(pt, to_move).is_ok() {
                    Some(pt)
                } else {
                    None
                }
            }
            None => None,
        };
        match played {
            Some(PASS) | None => {
                if played.is_none() {
                    pos.place_stone(PASS, to_move).expect("pass is always legal");
                }
                consecutive_passes += 1;
            }
            Some(_) => {
                consecutive_passes = 0;
                refresh_after_move(pos, patterns, features);
            }
        }
    }

    let black_minus_white = pos.calculate_score() as f64 - pos.config().komi as f64;
    if root_color == crate::geometry::BLACK {
        black_minus_white
    } else {
        -black_minus_white
    }
}
