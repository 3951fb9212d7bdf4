//! Search Manager (Component H): wall-clock budgeting and the top-level
//! iterate-until-done loop around [`crate::mcts::Mcts`].
//!
//! The teacher's `tree_search`/`tree_search_with_display` in the old
//! `mcts.rs` ran a fixed playout count with no clock at all. This module
//! adds the time-control policy the original engine's `include/mcts/
//! UctSearch.hpp` computes (`CalculateNextTime`/`ExtendTime`): four
//! [`crate::config::TimeMode`]s, a per-move budget formula, post-move
//! remaining-time bookkeeping, win-probability-triggered budget shortening,
//! a byo-yomi floor, and the extend-if-still-undecided rule.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::{EngineConfig, TimeMode};
use crate::features::FeatureState;
use crate::geometry::Point;
use crate::mcts::Mcts;
use crate::params::{SimParams, UctParams};
use crate::patterns::PatternState;
use crate::position::Position;

/// Board-size-specific divisor terms for the main-time allocation formula
/// `remaining / (c + max(0, maxply - moves_played))`. Chosen so a 19x19
/// game budgets roughly its move count in increments and a 9x9 game spends
/// proportionally less of its clock per move early on; tightened here as an
/// explicit policy choice (an Open Question the distilled spec left as
/// "board-size-specific" without naming exact constants).
fn time_allocation_constants(board_size: u8) -> (f64, u32) {
    match board_size {
        0..=9 => (7.0, 60),
        10..=13 => (10.0, 110),
        _ => (20.0, 240),
    }
}

/// Shorten the next move's budget once the root looks decided, per
/// `UctSearch.hpp`'s `ExtendTime` counterpart for the opposite direction
/// (stop early rather than extend).
fn win_probability_time_factor(win_rate: f64) -> f64 {
    if win_rate > 0.95 {
        0.25
    } else if win_rate > 0.9 {
        0.5
    } else {
        1.0
    }
}

/// Extend the search past its nominal budget when the top two root children
/// are still close and the position isn't yet clearly won, per spec's
/// post-hoc extension policy (1.0 -> 1.5 -> 2.0 multiplier).
fn should_extend(mcts: &Mcts, moves_played: u32, board_size: u8) -> bool {
    let maxply_bound = 3 * board_size as u32 - 17;
    if moves_played <= maxply_bound {
        return false;
    }
    if mcts.root_win_rate() >= 0.8 {
        return false;
    }
    match mcts.top_two_visit_gap() {
        Some((best, second)) if best > 0 => (best - second) as f64 <= 0.2 * best as f64,
        _ => false,
    }
}

/// The converse of [`should_extend`]: stop the search early once the leading
/// root child's visit count is so far ahead of the runner-up that no amount
/// of the remaining playout budget could possibly change the winner, per
/// `UctSearch.hpp`'s early-cutoff counterpart to `ExtendTime`.
fn search_decided(mcts: &Mcts, remaining_budget: u32) -> bool {
    match mcts.top_two_visit_gap() {
        Some((best, second)) if best > second => (best - second) as u32 > remaining_budget,
        _ => false,
    }
}

/// Outcome of one `genmove`-style search: the chosen point, or a resignation.
pub enum SearchOutcome {
    Move(Point),
    Resign,
}

/// Owns the per-game clock state and drives [`Mcts`] to a move decision.
pub struct SearchManager {
    cfg: EngineConfig,
    remaining_main: f64,
    stones_left_in_period: u32,
}

impl SearchManager {
    pub fn new(cfg: EngineConfig) -> Self {
        let remaining_main = match cfg.time_mode {
            TimeMode::MainTime(s) => s,
            TimeMode::MainTimePlusByoyomi { main_seconds, .. } => main_seconds,
            _ => 0.0,
        };
        let stones_left_in_period = match cfg.time_mode {
            TimeMode::MainTimePlusByoyomi { byoyomi_stones, .. } => byoyomi_stones,
            _ => 0,
        };
        SearchManager { cfg, remaining_main, stones_left_in_period }
    }

    /// The wall-clock budget for the *next* move, before any win-probability
    /// shortening (which needs the previous search's outcome and so is
    /// applied by the caller via [`Self::shorten_for_win_probability`]).
    fn nominal_budget(&self, moves_played: u32) -> Option<Duration> {
        match self.cfg.time_mode {
            TimeMode::ConstantPlayouts(_) => None,
            TimeMode::ConstantTimePerMove(s) => Some(Duration::from_secs_f64(s)),
            TimeMode::MainTime(_) => {
                let (c, maxply) = time_allocation_constants(self.cfg.board_size);
                let denom = c + (maxply.saturating_sub(moves_played)) as f64;
                Some(Duration::from_secs_f64((self.remaining_main / denom).max(0.05)))
            }
            TimeMode::MainTimePlusByoyomi { byoyomi_seconds, .. } => {
                if self.remaining_main > 0.0 {
                    let (c, maxply) = time_allocation_constants(self.cfg.board_size);
                    let denom = c + (maxply.saturating_sub(moves_played)) as f64;
                    let main_share = (self.remaining_main / denom).max(0.0);
                    Some(Duration::from_secs_f64(main_share.max(0.85 * byoyomi_seconds)))
                } else {
                    Some(Duration::from_secs_f64(0.85 * byoyomi_seconds))
                }
            }
        }
    }

    /// After a move completes, debit the clock by the actual elapsed time
    /// (time-controlled modes only; constant-playouts/constant-time modes
    /// have no main-time pool to debit).
    fn debit(&mut self, elapsed: Duration) {
        match self.cfg.time_mode {
            TimeMode::MainTime(_) | TimeMode::MainTimePlusByoyomi { .. } => {
                self.remaining_main = (self.remaining_main - elapsed.as_secs_f64()).max(0.0);
                if self.stones_left_in_period > 0 {
                    self.stones_left_in_period -= 1;
                }
            }
            _ => {}
        }
    }

    /// Run the search and return the chosen move, applying the resulting
    /// budget bookkeeping. `playout_budget` overrides the playout count for
    /// `ConstantPlayouts` mode; ignored otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn genmove(
        &mut self,
        mcts: &mut Mcts,
        pos: &Position,
        features: &FeatureState,
        patterns: &PatternState,
        _uct_params: &UctParams,
        _sim_params: &SimParams,
        moves_played: u32,
        stop: &std::sync::atomic::AtomicBool,
    ) -> SearchOutcome {
        let start = Instant::now();
        mcts.expand_root(pos, features, patterns);

        let budget = self.nominal_budget(moves_played);
        let playout_cap = match self.cfg.time_mode {
            TimeMode::ConstantPlayouts(n) => Some(n),
            _ => None,
        };

        // One `run_parallel` call per batch spreads that batch's iterations
        // over `cfg.workers` OS threads; the batch size keeps the
        // stop/capacity/time/decided checks below responsive rather than
        // running the whole budget in one uninterruptible call.
        let workers = self.cfg.workers.max(1);
        let batch_size = workers as u32;

        let mut iterations: u32 = 0;
        let mut extended = false;
        loop {
            if stop.load(std::sync::atomic::Ordering::Relaxed) {
                debug!("search stopped cooperatively after {iterations} iterations");
                break;
            }
            if mcts.remaining_capacity() == 0 {
                info!("node store exhausted after {iterations} iterations, stopping search");
                break;
            }
            let batch = match playout_cap {
                Some(cap) => batch_size.min(cap.saturating_sub(iterations)),
                None => batch_size,
            };
            if batch == 0 {
                break;
            }
            mcts.run_parallel(pos, features, patterns, batch, workers, stop);
            iterations += batch;

            if let Some(cap) = playout_cap {
                if iterations >= cap {
                    break;
                }
                if search_decided(mcts, cap.saturating_sub(iterations)) {
                    debug!("stopping early after {iterations} iterations: outcome decided");
                    break;
                }
                continue;
            }

            if let Some(limit) = budget {
                let factor = win_probability_time_factor(mcts.root_win_rate());
                let effective = limit.mul_f64(factor);
                let elapsed = start.elapsed();
                if elapsed < effective {
                    let remaining_secs = (effective - elapsed).as_secs_f64();
                    let rate = iterations as f64 / elapsed.as_secs_f64().max(1e-6);
                    let remaining_budget = (rate * remaining_secs) as u32;
                    if search_decided(mcts, remaining_budget) {
                        debug!("stopping early after {iterations} iterations: outcome decided");
                        break;
                    }
                    continue;
                }
                if !extended && should_extend(mcts, moves_played, self.cfg.board_size) {
                    extended = true;
                    debug!("extending search: top two children still close");
                    continue;
                }
                break;
            }
        }

        let elapsed = start.elapsed();
        self.debit(elapsed);

        let result = mcts.select_move();
        info!(
            "genmove: {} iterations, {:.2}s, visits={}, win_rate={:.3}, resign={}",
            iterations,
            elapsed.as_secs_f64(),
            result.visits,
            result.win_rate,
            result.resign
        );
        if result.resign {
            SearchOutcome::Resign
        } else {
            SearchOutcome::Move(result.best)
        }
    }

    /// Reconfigure the clock for a new game without losing the engine's
    /// overall `EngineConfig`.
    pub fn reset_clock(&mut self) {
        self.remaining_main = match self.cfg.time_mode {
            TimeMode::MainTime(s) => s,
            TimeMode::MainTimePlusByoyomi { main_seconds, .. } => main_seconds,
            _ => 0.0,
        };
        self.stones_left_in_period = match self.cfg.time_mode {
            TimeMode::MainTimePlusByoyomi { byoyomi_stones, .. } => byoyomi_stones,
            _ => 0,
        };
    }

    pub fn set_time_mode(&mut self, mode: TimeMode) {
        self.cfg.time_mode = mode;
        self.reset_clock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_probability_shortens_the_budget() {
        assert_eq!(win_probability_time_factor(0.5), 1.0);
        assert_eq!(win_probability_time_factor(0.92), 0.5);
        assert_eq!(win_probability_time_factor(0.97), 0.25);
    }

    #[test]
    fn constant_playouts_mode_has_no_nominal_time_budget() {
        let cfg = EngineConfig::new(9, 7.5).unwrap();
        let manager = SearchManager::new(cfg);
        assert!(manager.nominal_budget(0).is_none());
    }

    #[test]
    fn main_time_budget_shrinks_as_moves_progress() {
        let mut cfg = EngineConfig::new(19, 7.5).unwrap();
        cfg.time_mode = TimeMode::MainTime(600.0);
        let manager = SearchManager::new(cfg);
        let early = manager.nominal_budget(0).unwrap();
        let late = manager.nominal_budget(200).unwrap();
        assert!(late <= early);
    }

    #[test]
    fn byoyomi_floor_applies_once_main_time_is_spent() {
        let mut cfg = EngineConfig::new(19, 7.5).unwrap();
        cfg.time_mode = TimeMode::MainTimePlusByoyomi {
            main_seconds: 0.0,
            byoyomi_seconds: 30.0,
            byoyomi_stones: 1,
        };
        let manager = SearchManager::new(cfg);
        let budget = manager.nominal_budget(10).unwrap();
        assert!((budget.as_secs_f64() - 25.5).abs() < 1e-6);
    }
}
