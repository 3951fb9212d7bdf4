//! Ladder reading and pattern-canonicalization tests.
//!
//! These correspond to the two concerns the teacher's own regression data
//! covered (ladder escapes/breakers, rotation/flip-invariant large pattern
//! matching), re-expressed against the arena-based `features`/`patterns`
//! modules instead of a `fix_atari`/`match_pat` debug-command surface.

use std::sync::Arc;

use igo::config::EngineConfig;
use igo::features;
use igo::geometry::{BLACK, WHITE};
use igo::patterns::{canonicalize, hash_code128, PatternState};
use igo::position::Position;
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

// =============================================================================
// Ladder reading (fix_atari.tst 210/220/230 equivalents)
// =============================================================================

#[test]
fn a_stone_in_the_corner_with_one_liberty_is_caught_by_the_ladder() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "A1");
    play(&mut pos, WHITE, "A2");

    let a1 = pos.parse_coord("A1");
    let id = pos.strings.owner_of(a1);
    assert!(features::read_ladder_capture(&pos, id, WHITE, 6));
}

#[test]
fn a_one_liberty_group_in_the_open_escapes_cleanly_to_three_liberties() {
    // E5 is down to a single liberty (E4), but E4 itself opens onto three
    // empty points (D4, F4, E3) rather than the corner's two -- a one-ply
    // extension there is not a ladder, so the group should not be reported
    // as caught.
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "E5");
    play(&mut pos, WHITE, "D5");
    play(&mut pos, BLACK, "H8");
    play(&mut pos, WHITE, "F5");
    play(&mut pos, BLACK, "H9");
    play(&mut pos, WHITE, "E6");

    let e5 = pos.parse_coord("E5");
    let id = pos.strings.owner_of(e5);
    assert_eq!(pos.strings.liberty_count(id), 1);
    assert!(!features::read_ladder_capture(&pos, id, WHITE, 6));
}

#[test]
fn an_enemy_stone_on_the_escape_square_s_neighbor_restores_the_ladder() {
    // Same position as above, but White also occupies D4, cutting the
    // escape point's open neighbors back down to two (F4, E3) -- now the
    // one-ply extension does look like a ladder.
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "E5");
    play(&mut pos, WHITE, "D5");
    play(&mut pos, BLACK, "H8");
    play(&mut pos, WHITE, "F5");
    play(&mut pos, BLACK, "H9");
    play(&mut pos, WHITE, "E6");
    play(&mut pos, BLACK, "J8");
    play(&mut pos, WHITE, "D4");

    let e5 = pos.parse_coord("E5");
    let id = pos.strings.owner_of(e5);
    assert!(features::read_ladder_capture(&pos, id, WHITE, 6));
}

#[test]
fn a_group_with_two_liberties_is_not_reported_as_ladder_caught() {
    // `read_ladder_capture` only evaluates strings already in atari (one
    // liberty); a healthier group should never be reported as caught.
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "D4");
    play(&mut pos, WHITE, "H8");

    let d4 = pos.parse_coord("D4");
    let id = pos.strings.owner_of(d4);
    assert_eq!(pos.strings.liberty_count(id), 4);
    assert!(!features::read_ladder_capture(&pos, id, WHITE, 6));
}

#[test]
fn max_depth_zero_never_reports_a_catch() {
    let mut pos = new_position(9);
    play(&mut pos, BLACK, "A1");
    play(&mut pos, WHITE, "A2");

    let a1 = pos.parse_coord("A1");
    let id = pos.strings.owner_of(a1);
    assert!(!features::read_ladder_capture(&pos, id, WHITE, 0));
}

// =============================================================================
// Pattern canonicalization (large_pat.tst rotation/flip equivalents)
// =============================================================================

#[test]
fn pat3_code_is_identical_under_90_degree_rotation_of_the_same_shape() {
    // Same local shape (one friendly stone north, one enemy stone east),
    // built twice on an empty board, rotated 90 degrees between the two
    // placements; their *canonical* MD2 codes must agree even though the
    // raw orientation-sensitive codes need not.
    let mut a = new_position(9);
    play(&mut a, BLACK, "E5");
    play(&mut a, WHITE, "F5");
    play(&mut a, BLACK, "H8"); // keep turn order tidy; irrelevant to the shape

    let mut b = new_position(9);
    play(&mut b, BLACK, "E5");
    play(&mut b, WHITE, "E4"); // the same two-stone shape, rotated 90 degrees
    play(&mut b, BLACK, "H8");

    let mut pat_a = PatternState::new(a.board.len());
    pat_a.reset(&a.geom, &a.board);
    let mut pat_b = PatternState::new(b.board.len());
    pat_b.reset(&b.geom, &b.board);

    let e5_a = a.parse_coord("E5");
    let e5_b = b.parse_coord("E5");
    assert_eq!(pat_a.md_canonical(e5_a, 2), pat_b.md_canonical(e5_b, 2));
}

#[test]
fn canonicalize_is_idempotent() {
    let code: u128 = 0xabcdef1234567890;
    let once = canonicalize(code, 24);
    let twice = canonicalize(once, 24);
    assert_eq!(once, twice);
}

#[test]
fn canonicalize_picks_the_minimum_over_all_16_symmetries() {
    let code: u128 = 0x00_00_00_00_00_12_34_56;
    let canonical = canonicalize(code, 12);
    assert!(canonical <= code);
}

#[test]
fn hash_code128_is_deterministic_and_distinguishes_distinct_codes() {
    let a = hash_code128(0x1234);
    let b = hash_code128(0x1234);
    let c = hash_code128(0x5678);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn incremental_pattern_updates_match_a_full_reset_after_several_moves() {
    let mut pos = new_position(9);
    let mut incremental = PatternState::new(pos.board.len());
    incremental.reset(&pos.geom, &pos.board);

    let moves = [(BLACK, "D4"), (WHITE, "D5"), (BLACK, "E4"), (WHITE, "E5")];
    for &(color, coord) in &moves {
        let pt = pos.parse_coord(coord);
        let before = pos.color_at(pt);
        pos.place_stone(pt, color).unwrap();
        incremental.on_cell_change(&pos.geom, pt, before, color);
    }

    let mut from_scratch = PatternState::new(pos.board.len());
    from_scratch.reset(&pos.geom, &pos.board);

    for pt in pos.geom.points() {
        assert_eq!(
            incremental.md5(pt),
            from_scratch.md5(pt),
            "pattern code diverged at point {pt}"
        );
    }
}
