//! Move Scorer (Component D): per-intersection priors from the loaded
//! Bradley-Terry/factorization-machine parameter tables.
//!
//! Grounded in `src/mcts/UctRating.cpp`'s `CalculateMoveScoreWithBTFM`:
//! collect every feature active at a candidate point (tactical family,
//! move-distance-from-recent-plies bucket, board-position symmetry class,
//! deepest-matching neighborhood pattern, ko-existence), then combine as
//! `gamma + theta` where `gamma` is the product of every active feature's
//! first-order weight `w` and `theta` is the product, over every pair of
//! active features, of their latent-vector dot product divided by
//! `FM_DIMENSION` -- a product of pairwise factors, not a sum of logs, to
//! match trained parameters exactly as required.

use crate::features::FeatureState;
use crate::geometry::{Geometry, Point, PASS};
use crate::params::{FmParam, UctParams, FM_DIMENSION, MOVE_DISTANCE_MAX};
use crate::patterns::PatternState;
use crate::position::Position;

const PASS_AFTER_MOVE: usize = 0;
const PASS_AFTER_PASS: usize = 1;

/// Fold `(dx, dy)` from board center into one of up to `POS_ID_MAX`
/// symmetry classes: the 8-fold dihedral orbit of a point is determined by
/// `(min(|dx|,|dy|), max(|dx|,|dy|))`, triangularly numbered.
fn position_symmetry_class(geom: &Geometry, pt: Point) -> usize {
    let half = (geom.board_size as i32 - 1) / 2;
    let row = pt as i32 / geom.stride as i32 - geom.start as i32;
    let col = pt as i32 % geom.stride as i32 - geom.start as i32;
    let dx = (col - half).abs();
    let dy = (row - half).abs();
    let lo = dx.min(dy);
    let hi = dx.max(dy);
    let class = (hi * (hi + 1)) / 2 + lo;
    (class as usize).min(crate::params::POS_ID_MAX - 1)
}

fn chebyshev_or_manhattan_distance(geom: &Geometry, a: Point, b: Point) -> i32 {
    let s = geom.stride as i32;
    let (a, b) = (a as i32, b as i32);
    let dr = (a / s - b / s).abs();
    let dc = (a % s - b % s).abs();
    dr + dc
}

/// Every feature active at `point`, as `(w, v)` pairs ready for the
/// `gamma`/`theta` product combination.
fn active_features(
    pos: &Position,
    params: &UctParams,
    features: &FeatureState,
    patterns: &PatternState,
    point: Point,
) -> Vec<FmParam> {
    let mut active = Vec::new();
    let geom = &pos.geom;
    let moves = pos.history.len();
    let prev = |k: usize| -> Point {
        if moves >= k {
            pos.history[moves - k].pos
        } else {
            PASS
        }
    };

    if point == PASS {
        let after_pass = moves >= 1 && prev(1) == PASS;
        let slot = if after_pass { PASS_AFTER_PASS } else { PASS_AFTER_MOVE };
        active.push(params.pass[slot]);
    } else {
        for (k, table) in params.move_distance.iter().enumerate() {
            let pm = prev(k + 1);
            if pm == PASS {
                continue;
            }
            let mut dis = chebyshev_or_manhattan_distance(geom, point, pm) as usize;
            if dis >= MOVE_DISTANCE_MAX - 1 {
                dis = MOVE_DISTANCE_MAX - 1;
            }
            active.push(table[dis]);
        }

        use crate::features::Family;
        let push_family = |active: &mut Vec<FmParam>, family: Family, table: &[FmParam]| {
            let id = features.get(point, family) as usize;
            if id > 0 && id < table.len() {
                active.push(table[id]);
            }
        };
        push_family(&mut active, Family::Capture, &params.capture);
        push_family(&mut active, Family::SaveExtension, &params.save_extension);
        push_family(&mut active, Family::Atari, &params.atari);
        push_family(&mut active, Family::Extension, &params.extension);
        push_family(&mut active, Family::Dame, &params.dame);
        push_family(&mut active, Family::Connect, &params.connect);
        push_family(&mut active, Family::ThrowIn, &params.throw_in);

        active.push(params.pos_id[position_symmetry_class(geom, point)]);

        let md5 = patterns.hash_canonical(point, 5);
        let md4 = patterns.hash_canonical(point, 4);
        let md3 = patterns.hash_canonical(point, 3);
        let md2 = patterns.md_canonical(point, 2) as u32;
        if let Some(&p) = params.md5.get(&md5) {
            active.push(p);
        } else if let Some(&p) = params.md4.get(&md4) {
            active.push(p);
        } else if let Some(&p) = params.md3.get(&md3) {
            active.push(p);
        } else if let Some(&p) = params.md2.get(&md2) {
            active.push(p);
        } else {
            let pat3 = patterns.pat3_code(point) as usize;
            active.push(params.pat3[pat3]);
        }
    }

    if pos.ko_pos != PASS && pos.ko_move == pos.moves {
        active.push(params.ko_exist);
    }

    active
}

fn gamma(active: &[FmParam]) -> f64 {
    active.iter().fold(1.0, |acc, p| acc * p.w)
}

fn theta(active: &[FmParam]) -> f64 {
    if active.len() < 2 {
        return 0.0;
    }
    let inv = 1.0 / FM_DIMENSION as f64;
    let mut product = 1.0;
    for i in 0..active.len() - 1 {
        for j in i + 1..active.len() {
            let dot: f64 = (0..FM_DIMENSION).map(|k| active[i].v[k] * active[j].v[k]).sum();
            product *= dot * inv;
        }
    }
    product
}

/// Move score at `point`: `gamma_product + pairwise_factor_product`.
pub fn score_move(
    pos: &Position,
    params: &UctParams,
    features: &FeatureState,
    patterns: &PatternState,
    point: Point,
) -> f64 {
    let active = active_features(pos, params, features, patterns, point);
    gamma(&active) + theta(&active)
}

/// Score every legal, non-self-eye-filling candidate plus PASS, used as
/// MCTS child priors (normalized by the caller into a probability simplex).
pub fn score_all_candidates(
    pos: &Position,
    params: &UctParams,
    features: &FeatureState,
    patterns: &PatternState,
    color: u8,
) -> Vec<(Point, f64)> {
    let mut scores = Vec::new();
    for pt in pos.geom.points() {
        if pos.is_legal_not_eye(pt, color) {
            scores.push((pt, score_move(pos, params, features, patterns, pt)));
        }
    }
    scores.push((PASS, score_move(pos, params, features, patterns, PASS)));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::geometry::BLACK;
    use crate::zobrist::ZobristTables;
    use std::sync::Arc;

    fn flat_params() -> UctParams {
        let flat = FmParam { w: 2.0, v: [1.0; FM_DIMENSION] };
        UctParams {
            pass: vec![flat; crate::params::PASS_MAX],
            ko_exist: flat,
            capture: vec![flat; 8],
            save_extension: vec![flat; 2],
            atari: vec![flat; 2],
            extension: vec![flat; 4],
            dame: vec![flat; 2],
            connect: vec![flat; 2],
            throw_in: vec![flat; 2],
            pos_id: vec![flat; crate::params::POS_ID_MAX],
            move_distance: [
                vec![flat; MOVE_DISTANCE_MAX * 4],
                vec![flat; MOVE_DISTANCE_MAX * 4],
                vec![flat; MOVE_DISTANCE_MAX * 4],
                vec![flat; MOVE_DISTANCE_MAX * 4],
            ],
            pat3: vec![flat; crate::patterns::PAT3_MAX],
            md2: std::collections::HashMap::new(),
            md3: std::collections::HashMap::new(),
            md4: std::collections::HashMap::new(),
            md5: std::collections::HashMap::new(),
        }
    }

    #[test]
    fn gamma_is_product_of_weights() {
        let active = vec![
            FmParam { w: 2.0, v: [1.0; FM_DIMENSION] },
            FmParam { w: 3.0, v: [1.0; FM_DIMENSION] },
        ];
        assert_eq!(gamma(&active), 6.0);
    }

    #[test]
    fn theta_is_zero_for_single_feature() {
        let active = vec![FmParam { w: 2.0, v: [1.0; FM_DIMENSION] }];
        assert_eq!(theta(&active), 0.0);
    }

    #[test]
    fn score_move_on_empty_board_is_finite_and_positive() {
        let cfg = Arc::new(EngineConfig::new(9, 7.5).unwrap());
        let zobrist = Arc::new(ZobristTables::new(&cfg, 1));
        let pos = Position::new(cfg, zobrist);
        let params = flat_params();
        let features = FeatureState::new(pos.board.len());
        let mut patterns = PatternState::new(pos.board.len());
        patterns.reset(&pos.geom, &pos.board);
        let pt = pos.parse_coord("E5");
        let s = score_move(&pos, &params, &features, &patterns, pt);
        assert!(s.is_finite());
        assert!(s > 0.0);
        let _ = BLACK;
    }
}
