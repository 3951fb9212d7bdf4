//! Integration tests for igo.
//!
//! These exercise cross-module behavior (board legality, capture, ko,
//! feature tagging, pattern incrementality, scoring, playout, and the
//! MCTS search loop) through the public API, the way the teacher's own
//! integration suite drove `Position`/`TreeNode` end to end.

use std::collections::HashMap;
use std::sync::Arc;

use igo::config::EngineConfig;
use igo::features::{self, FeatureState};
use igo::geometry::{BLACK, OFF_BOARD, PASS, WHITE};
use igo::mcts::Mcts;
use igo::params::{FmParam, SimParams, UctParams};
use igo::patterns::PatternState;
use igo::playout;
use igo::position::{MoveError, Position};
use igo::scorer;
use igo::zobrist::ZobristTables;

fn new_position(board_size: u8) -> Position {
    let cfg = Arc::new(EngineConfig::new(board_size, 7.5).unwrap());
    let zobrist = Arc::new(ZobristTables::new(&cfg, 1));
    Position::new(cfg, zobrist)
}

fn play(pos: &mut Position, color: u8, coord: &str) {
    let pt = pos.parse_coord(coord);
    pos.place_stone(pt, color).unwrap_or_else(|e| panic!("expected {coord} to be legal: {e}"));
}

fn flat_fm(n: usize) -> Vec<FmParam> {
    vec![FmParam { w: 1.0, v: [0.1; igo::params::FM_DIMENSION] }; n]
}

/// Flat, uninformative weights -- every table present but every score
/// identical, so these tests exercise control flow rather than chase a
/// particular trained move.
fn flat_uct_params() -> UctParams {
    UctParams {
        pass: flat_fm(igo::params::PASS_MAX),
        ko_exist: FmParam { w: 1.0, v: [0.1; igo::params::FM_DIMENSION] },
        capture: flat_fm(8),
        save_extension: flat_fm(2),
        atari: flat_fm(2),
        extension: flat_fm(4),
        dame: flat_fm(2),
        connect: flat_fm(2),
        throw_in: flat_fm(2),
        pos_id: flat_fm(igo::params::POS_ID_MAX),
        move_distance: [
            flat_fm(igo::params::MOVE_DISTANCE_MAX * 4),
            flat_fm(igo::params::MOVE_DISTANCE_MAX * 4),
            flat_fm(igo::params::MOVE_DISTANCE_MAX * 4),
            flat_fm(igo::params::MOVE_DISTANCE_MAX * 4),
        ],
        pat3: flat_fm(igo::patterns::PAT3_MAX),
        md2: HashMap::new(),
        md3: HashMap::new(),
        md4: HashMap::new(),
        md5: HashMap::new(),
    }
}

fn flat_sim_params() -> SimParams {
    SimParams {
        pass: vec![1.0; igo::params::PASS_MAX],
        ko_exist: 1.0,
        capture: vec![1.0; 8],
        save_extension: vec![1.0; 2],
        atari: vec![1.0; 2],
        extension: vec![1.0; 4],
        dame: vec![1.0; 2],
        connect: vec![1.0; 2],
        throw_in: vec![1.0; 2],
        pat3: vec![1.0; igo::patterns::PAT3_MAX],
    }
}

// =============================================================================
// Coordinate parsing
// =============================================================================

#[test]
fn parse_coord_skips_the_letter_i() {
    let pos = new_position(9);
    let h5 = pos.parse_coord("H5");
    let j5 = pos.parse_coord("J5");
    assert_eq!(j5 - h5, 1, "J should be the column immediately after H");
}

#[test]
fn str_coord_roundtrips_through_parse_coord() {
    let pos = new_position(9);
    for coord in ["A1", "D4", "G7", "H9", "J1"] {
        let pt = pos.parse_coord(coord);
        let s = pos.str_coord(pt);
        assert_eq!(pos.parse_coord(&s), pt, "roundtrip failed for {coord}");
    }
}

#[test]
fn pass_parses_to_the_pass_sentinel() {
    let pos = new_position(9);
    assert_eq!(pos.parse_coord("PASS"), PASS);
}

// =============================================================================
// Basic legality and board state
// =============================================================================

#[test]
fn new_position_starts_with_black_to_move_and_an_empty_board() {
    let pos = new_position(9);
    assert_eq!(pos.to_move, BLACK);
    assert_eq!(pos.moves, 0);
    for pt in pos.geom.points() {
        assert_eq!(pos.color_at(pt), igo::geometry::EMPTY);
    }
}

#[test]
fn placing_a_stone_advances_the_move_count_and_turn() {
    let mut pos = new_position(9);
    let d4 = pos.parse_coord("D4");
    pos.place_stone(d4, BLACK).unwrap();
    assert_eq!(pos.moves, 1);
    assert_eq!(pos.to_move, WHITE);
    assert_eq!(pos.color_at(d4), BLACK);
}

#[test]
fn playing_on_an_occupied_point_is_illegal() {
    let mut pos = new_position(9);
    let d4 = pos.parse_coord("D4");
    pos.place_stone(d4, BLACK).unwrap();
    let err = pos.place_stone(d4, WHITE).unwrap_err();
    assert_eq!(err, MoveError::Occupied);
}

#[test]
fn off_board_points_are_never_legal() {
    let pos = new_position(9);
    // Index 0 is inside the border padding for every board size.
    assert!(!pos.is_legal(0, BLACK));
    assert_eq!(pos.color_at(0), OFF_BOARD);
}

// =============================================================================
// Capture
// =============================================================================

#[test]
fn capturing_a_single_stone_empties_its_point() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "C4");
    play(&mut pos, WHITE, "D4");
    play(&mut pos, BLACK, "E4");
    play(&mut pos, WHITE, "H8");
    play(&mut pos, BLACK, "D3");
    play(&mut pos, WHITE, "H9");
    play(&mut pos, BLACK, "D5");

    let d4 = pos.parse_coord("D4");
    assert_eq!(pos.color_at(d4), igo::geometry::EMPTY, "D4 should be captured");
}

#[test]
fn capturing_a_two_stone_group_empties_both_points() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "C4");
    play(&mut pos, WHITE, "D4");
    play(&mut pos, BLACK, "C5");
    play(&mut pos, WHITE, "D5");
    play(&mut pos, BLACK, "E4");
    play(&mut pos, WHITE, "H8");
    play(&mut pos, BLACK, "E5");
    play(&mut pos, WHITE, "H9");
    play(&mut pos, BLACK, "D3");
    play(&mut pos, WHITE, "J8");
    play(&mut pos, BLACK, "D6");

    assert_eq!(pos.color_at(pos.parse_coord("D4")), igo::geometry::EMPTY);
    assert_eq!(pos.color_at(pos.parse_coord("D5")), igo::geometry::EMPTY);
}

// =============================================================================
// Suicide
// =============================================================================

#[test]
fn suicide_is_illegal() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "A2");
    play(&mut pos, WHITE, "H8");
    play(&mut pos, BLACK, "B1");

    let a1 = pos.parse_coord("A1");
    let err = pos.place_stone(a1, WHITE).unwrap_err();
    assert_eq!(err, MoveError::Suicide);
}

#[test]
fn playing_into_a_captured_spot_is_legal() {
    // Black surrounds a two-stone White group at A1/A2; the final capturing
    // move (B2) is legal because it removes the White group rather than
    // leaving the placed Black stone with no liberties of its own.
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "B1");
    play(&mut pos, WHITE, "A2");
    play(&mut pos, BLACK, "A3");
    play(&mut pos, WHITE, "A1");
    play(&mut pos, BLACK, "B2");
    assert_eq!(pos.color_at(pos.parse_coord("A1")), igo::geometry::EMPTY);
    assert_eq!(pos.color_at(pos.parse_coord("A2")), igo::geometry::EMPTY);
}

// =============================================================================
// Ko
// =============================================================================

#[test]
fn retaking_a_corner_ko_immediately_is_illegal() {
    // Minimal corner ko: White A2 is down to its one liberty (A1); Black's
    // capturing stone at A1 ends up isolated (White occupies its other
    // neighbor, B1, so it doesn't merge into a larger group) with exactly
    // one liberty of its own (the just-vacated A2) -- the textbook
    // "capturing stone also has one liberty" ko condition.
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "A3");
    play(&mut pos, WHITE, "B1");
    play(&mut pos, BLACK, "B2");
    play(&mut pos, WHITE, "A2");
    play(&mut pos, BLACK, "A1");
    assert_eq!(pos.color_at(pos.parse_coord("A2")), igo::geometry::EMPTY);

    let a2 = pos.parse_coord("A2");
    let err = pos.place_stone(a2, WHITE).unwrap_err();
    assert_eq!(err, MoveError::Ko);
}

// =============================================================================
// Feature tagging
// =============================================================================

#[test]
fn filling_ones_own_true_eye_is_legal_but_excluded_from_non_eye_candidates() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "A2");
    play(&mut pos, WHITE, "H8");
    play(&mut pos, BLACK, "B2");
    play(&mut pos, WHITE, "H9");
    play(&mut pos, BLACK, "B1");

    // A1 is Black's true eye: legal for Black to fill (no rule against
    // it), but `is_legal_not_eye` prunes it from move generation since
    // filling your own eye is (almost) never a good move.
    let a1 = pos.parse_coord("A1");
    assert!(pos.is_legal(a1, BLACK));
    assert!(!pos.is_legal_not_eye(a1, BLACK));
}

#[test]
fn a_corner_stone_with_one_liberty_is_read_as_a_working_ladder() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "A1");
    play(&mut pos, WHITE, "A2");

    let a1 = pos.parse_coord("A1");
    let id = pos.strings.owner_of(a1);
    assert_ne!(id, igo::strings::NONE);
    let caught = features::read_ladder_capture(&pos, id, WHITE, 6);
    assert!(caught, "a lone corner stone in atari should be ladder-caught");
}

// =============================================================================
// Pattern incrementality
// =============================================================================

#[test]
fn incremental_updates_agree_with_a_full_reset() {
    let mut pos = new_position(9);

    let mut incremental = PatternState::new(pos.board.len());
    incremental.reset(&pos.geom, &pos.board);

    play(&mut pos, BLACK, "D4");
    incremental.on_cell_change(&pos.geom, pos.parse_coord("D4"), igo::geometry::EMPTY, BLACK);
    play(&mut pos, WHITE, "D5");
    incremental.on_cell_change(&pos.geom, pos.parse_coord("D5"), igo::geometry::EMPTY, WHITE);

    let mut from_scratch = PatternState::new(pos.board.len());
    from_scratch.reset(&pos.geom, &pos.board);

    let d4 = pos.parse_coord("D4");
    assert_eq!(incremental.pat3_code(d4), from_scratch.pat3_code(d4));
    assert_eq!(incremental.md5(d4), from_scratch.md5(d4));
}

// =============================================================================
// Scoring / priors
// =============================================================================

#[test]
fn score_all_candidates_always_includes_pass() {
    let pos = new_position(9);
    let params = flat_uct_params();
    let features = FeatureState::new(pos.board.len());
    let patterns = PatternState::new(pos.board.len());

    let scored = scorer::score_all_candidates(&pos, &params, &features, &patterns, BLACK);
    assert!(scored.iter().any(|&(pt, _)| pt == PASS));
}

#[test]
fn score_all_candidates_on_an_empty_board_covers_every_intersection() {
    let pos = new_position(9);
    let params = flat_uct_params();
    let features = FeatureState::new(pos.board.len());
    let patterns = PatternState::new(pos.board.len());

    let scored = scorer::score_all_candidates(&pos, &params, &features, &patterns, BLACK);
    // 81 intersections + PASS on an empty 9x9 board.
    assert_eq!(scored.len(), 82);
}

// =============================================================================
// Playout
// =============================================================================

#[test]
fn a_playout_terminates_and_advances_the_move_count() {
    let mut pos = new_position(9);
    let mut patterns = PatternState::new(pos.board.len());
    patterns.reset(&pos.geom, &pos.board);
    let mut features = FeatureState::new(pos.board.len());
    let sim = flat_sim_params();
    let mut rng = fastrand::Rng::with_seed(1);

    let _result = playout::run_playout(&mut pos, &mut patterns, &mut features, &sim, &mut rng);
    assert!(pos.moves > 0, "a playout should play at least one move");
}

// =============================================================================
// MCTS search loop
// =============================================================================

#[test]
fn expanding_the_root_creates_a_pass_child_and_some_iterations_accumulate_visits() {
    let cfg = Arc::new(EngineConfig::new(9, 7.5).unwrap());
    let uct = Arc::new(flat_uct_params());
    let sim = Arc::new(flat_sim_params());
    let pos = new_position(9);
    let mut patterns = PatternState::new(pos.board.len());
    patterns.reset(&pos.geom, &pos.board);
    let features = FeatureState::new(pos.board.len());

    let mut mcts = Mcts::new(cfg, uct, sim);
    let root = mcts.expand_root(&pos, &features, &patterns);
    assert!(mcts.pool().with_node(root, |node| node.children.iter().any(|c| c.point == PASS)));

    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..24 {
        mcts.run_iteration(&pos, &features, &patterns, &mut rng);
    }
    let result = mcts.select_move();
    assert!(result.visits > 0, "selected move should have accumulated visits");
}
