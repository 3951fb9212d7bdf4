//! MCTS Core (Component G): UCT node store, selection, progressive
//! widening, expansion, descent, and backpropagation.
//!
//! The teacher's `TreeNode` owns its position and its children directly in
//! a recursive `Vec<TreeNode>` tree, rebuilt from scratch every move. That
//! doesn't support the transposition-backed subtree reuse this spec wants,
//! so nodes here live in a flat arena (`NodePool`) addressed by index, keyed
//! into `transposition::TranspositionTable` by the position's `move_hash`,
//! `to_move` and `moves` -- the same "index instead of owned recursion"
//! shift `strings.rs` already made for strings. Selection/backprop keep the
//! teacher's `most_urgent`/`tree_descend`/`tree_update` shape; the urgency
//! formula itself is rewritten to the UCB1-Tuned + prior-bonus form named
//! in `include/mcts/UctSearch.hpp`'s `CalculateUCBValue`.
//!
//! `Position` shares its config/Zobrist tables via `Arc` so a root position
//! can be read from every worker thread at once. `run_parallel` spreads
//! `workers` OS threads (`EngineConfig::workers`, sized from `num_cpus` by
//! default) over the same node arena and transposition table:
//! `UctSearch.cpp`'s `ParallelUctSearch` shape, with `std::thread::scope`
//! standing in for the original's raw pthreads. Every node is behind its
//! own `parking_lot::Mutex` (locked for the span of one widen/select/bump
//! step, then released before the thread descends further) and the
//! transposition table behind a single shared lock -- the "per-node mutex,
//! global expansion mutex" pairing `UctSearch.hpp` documents, not a
//! redesign of it. `Child::virtual_loss` is incremented while a thread
//! holds a child's parent lock and decremented the same way during
//! backpropagation, so it is genuinely visible to every other thread
//! racing to select a child at that node meanwhile.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::features::{self, FeatureState, SelfAtariClass};
use crate::geometry::{opposite, Point, BLACK, PASS};
use crate::params::{SimParams, UctParams};
use crate::patterns::PatternState;
use crate::playout;
use crate::position::Position;
use crate::scorer;
use crate::transposition::TranspositionTable;

/// Progressive-widening growth rate (`pw[k] = 40 * r^k`, clamped at
/// construction time up to a generous depth since board size bounds the
/// number of legal children anyway).
const PW_BASE: f64 = 40.0;
const PW_RATIO: f64 = 1.8;
const PW_RESORT_INTERVAL: u32 = 128;

/// UCB1-Tuned variance clamp.
const VARIANCE_CLAMP: f64 = 0.25;
/// Prior-bonus weight and equivalence parameter (`W`, `K` in spec §4.G).
const PRIOR_WEIGHT: f64 = 0.20;
const PRIOR_EQUIVALENCE: f64 = 1000.0;
/// First-play urgency for an unvisited child, plus tiny jitter for stable
/// tie-breaks between otherwise-identical FPU values.
const FPU_BASE: f64 = 5.0;

/// One child edge of a [`Node`]: a candidate move plus its running
/// statistics (`child_node_t` in the original).
#[derive(Debug, Clone)]
pub struct Child {
    pub point: Point,
    pub prior: f64,
    pub visits: u32,
    pub wins: f64,
    pub virtual_loss: i32,
    /// Index into the node pool, or `None` if not yet expanded.
    pub child: Option<u32>,
    /// Progressive-widening eligibility: only `pw`/`open` children are
    /// selectable (spec §4.G's "Only children with `pw` or `open` set").
    pub open: bool,
    /// Refreshed on root reuse: true if this point is currently
    /// ladder-capturable, used to zero stale visit/win counts.
    pub ladder: bool,
    /// Set while one thread is building this child's node, so a second
    /// thread that reaches the same unexpanded child meanwhile falls back
    /// to a plain simulation instead of racing to allocate a duplicate.
    pub expanding: bool,
}

impl Child {
    fn new(point: Point, prior: f64) -> Self {
        Child {
            point,
            prior,
            visits: 0,
            wins: 0.0,
            virtual_loss: 0,
            child: None,
            open: false,
            ladder: false,
            expanding: false,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.wins / self.visits as f64
        }
    }
}

/// One MCTS tree node (`uct_node_t`): the player to move, every legal
/// child edge, progressive-widening state, and an ownership accumulator
/// for the cleanup-endgame export.
pub struct Node {
    pub to_move: u8,
    pub children: Vec<Child>,
    pub pw_width: u32,
    pub visits: u32,
    /// Per-point running black-ownership average across every terminal
    /// position reached through this node (`owner[]` in the original).
    pub owner_sum: Vec<f32>,
    pub owner_count: u32,
    /// Per-point terminal-occupancy counts broken out by color, plus how
    /// often the occupant matched that terminal's actual winner --
    /// `statistic[pos].colors[]` in the original. Feeds `criticality_bonus`
    /// alongside `owner_sum`, which only carries the black-minus-white
    /// difference and can't recover the two fractions separately.
    pub black_sum: Vec<f32>,
    pub white_sum: Vec<f32>,
    pub winner_sum: Vec<f32>,
    /// Points the feature extractor judged to be in seki -- neither color
    /// should fill these during widening/priors.
    pub seki: Vec<Point>,
}

impl Node {
    fn pw_threshold(&self, width: u32) -> f64 {
        PW_BASE * PW_RATIO.powi(width as i32)
    }

    /// Inert filler value for slots not yet allocated -- overwritten whole
    /// by `NodePool::alloc`, so its field contents never matter.
    fn placeholder() -> Node {
        Node {
            to_move: BLACK,
            children: Vec::new(),
            pw_width: 0,
            visits: 0,
            owner_sum: Vec::new(),
            owner_count: 0,
            black_sum: Vec::new(),
            white_sum: Vec::new(),
            winner_sum: Vec::new(),
            seki: Vec::new(),
        }
    }
}

/// Flat arena of [`Node`]s, addressed by index (`uct_node_t[UCT_HASH_SIZE]`
/// in the original, here sized to `EngineConfig::node_pool_capacity`).
/// Every slot is preallocated behind its own lock so worker threads can
/// read/write distinct nodes fully concurrently; `next` hands out slot
/// indices lock-free.
pub struct NodePool {
    nodes: Vec<Mutex<Node>>,
    next: AtomicUsize,
    capacity: usize,
}

impl NodePool {
    fn new(capacity: usize) -> Self {
        let nodes = (0..capacity).map(|_| Mutex::new(Node::placeholder())).collect();
        NodePool { nodes, next: AtomicUsize::new(0), capacity }
    }

    /// Claim the next free slot and install `node` there. Threads racing
    /// this only contend on the atomic counter, never on each other's
    /// slots.
    fn alloc(&self, node: Node) -> Option<u32> {
        let idx = self.next.fetch_add(1, Ordering::SeqCst);
        if idx >= self.capacity {
            return None;
        }
        *self.nodes[idx].lock() = node;
        Some(idx as u32)
    }

    pub fn with_node<R>(&self, idx: u32, f: impl FnOnce(&Node) -> R) -> R {
        let guard = self.nodes[idx as usize].lock();
        f(&guard)
    }

    fn with_node_mut<R>(&self, idx: u32, f: impl FnOnce(&mut Node) -> R) -> R {
        let mut guard = self.nodes[idx as usize].lock();
        f(&mut guard)
    }

    fn clear(&self) {
        for slot in &self.nodes {
            *slot.lock() = Node::placeholder();
        }
        self.next.store(0, Ordering::SeqCst);
    }

    pub fn remaining_capacity(&self) -> usize {
        let used = self.next.load(Ordering::SeqCst).min(self.capacity);
        self.capacity.saturating_sub(used)
    }
}

/// Result of a finished (or budget-exhausted) search, handed back to the
/// control surface for move selection and ownership export.
pub struct SearchResult {
    pub best: Point,
    pub resign: bool,
    pub visits: u32,
    pub win_rate: f64,
    /// Per-point black-ownership probability, indexed like `Position::board`.
    pub ownership: Vec<f32>,
}

/// Owns the node arena, transposition table and per-search scratch state.
/// `table` is a single shared lock rather than one-per-slot since it's
/// touched only at root expansion and node expansion, far less often than
/// the per-node locks taken on every descent step.
pub struct Mcts {
    cfg: Arc<EngineConfig>,
    params: Arc<UctParams>,
    sim_params: Arc<SimParams>,
    pool: NodePool,
    table: Mutex<TranspositionTable>,
    root: Option<u32>,
}

impl Mcts {
    pub fn new(cfg: Arc<EngineConfig>, params: Arc<UctParams>, sim_params: Arc<SimParams>) -> Self {
        let pool = NodePool::new(cfg.node_pool_capacity);
        let table = Mutex::new(TranspositionTable::new(cfg.transposition_capacity));
        Mcts { cfg, params, sim_params, pool, table, root: None }
    }

    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    /// `Expand root`: reuse the stored node for `pos` if the transposition
    /// table still has it, otherwise clear everything and build fresh
    /// children. Always ensures a PASS child plus one per legal,
    /// non-self-eye, non-"unmeaningful" intersection.
    pub fn expand_root(
        &mut self,
        pos: &Position,
        features: &FeatureState,
        patterns: &PatternState,
    ) -> u32 {
        if let Some(idx) = self.table.lock().find(pos.move_hash, pos.to_move, pos.moves) {
            self.refresh_reused_root(idx, pos);
            self.root = Some(idx);
            return idx;
        }

        self.pool.clear();
        self.table.lock().clear();
        let node = self.build_node(pos, features, patterns);
        let idx = self.pool.alloc(node).expect("freshly cleared pool has capacity for one node");
        self.table.lock().insert(pos.move_hash, pos.to_move, pos.moves, idx);
        self.root = Some(idx);
        idx
    }

    /// Recompute ladder flags on every reused child and zero the visit/win
    /// counts of any that newly became ladder-capturable (their priors are
    /// now stale -- a move that looked safe may have just become a ladder).
    fn refresh_reused_root(&mut self, idx: u32, pos: &Position) {
        self.pool.with_node_mut(idx, |node| {
            for child in &mut node.children {
                if child.point == PASS {
                    continue;
                }
                let id = pos.strings.owner_of(child.point);
                let now_ladder = id != crate::strings::NONE
                    && features::read_ladder_capture(pos, id, opposite(pos.color_at(child.point)), 6);
                if now_ladder && !child.ladder {
                    child.visits = 0;
                    child.wins = 0.0;
                }
                child.ladder = now_ladder;
            }
            // Reconcile the widening counter with however many children
            // this reused node already has open (opening the top prior
            // always happens at construction; widen() only ever adds from
            // there).
            let already_open = node.children.iter().filter(|c| c.open).count() as u32;
            node.pw_width = already_open.saturating_sub(1);
        });
    }

    fn build_node(&self, pos: &Position, features: &FeatureState, patterns: &PatternState) -> Node {
        let scored = scorer::score_all_candidates(pos, &self.params, features, patterns, pos.to_move);
        let total: f64 = scored.iter().map(|(_, s)| s.max(0.0)).sum();
        let candidate_count = scored.len().max(1);
        let mut children = Vec::with_capacity(scored.len());
        for (pt, score) in scored {
            if pt != PASS {
                if let SelfAtariClass::Large =
                    features::check_self_atari(pos, pt, pos.to_move)
                {
                    continue;
                }
            }
            let prior = if total > 0.0 { score.max(0.0) / total } else { 1.0 / candidate_count as f64 };
            children.push(Child::new(pt, prior));
        }
        let seki = features::detect_seki(pos);
        // Open the single best-priored child immediately so a node is
        // selectable before its first visit -- progressive widening only
        // governs when the *second* and later children open.
        if let Some(best) = children
            .iter_mut()
            .max_by(|a, b| a.prior.partial_cmp(&b.prior).unwrap_or(std::cmp::Ordering::Equal))
        {
            best.open = true;
        }
        Node {
            to_move: pos.to_move,
            children,
            pw_width: 0,
            visits: 0,
            owner_sum: vec![0.0; pos.board.len()],
            owner_count: 0,
            black_sum: vec![0.0; pos.board.len()],
            white_sum: vec![0.0; pos.board.len()],
            winner_sum: vec![0.0; pos.board.len()],
            seki,
        }
    }

    /// `value(c) = exploitation + exploration + prior_bonus`, UCB1-Tuned
    /// exploitation with a variance clamp, FPU for never-visited children.
    fn child_value(parent_visits: u32, child: &Child, rng: &mut fastrand::Rng) -> f64 {
        if child.visits == 0 {
            return FPU_BASE + rng.f64() * 1e-6;
        }
        let n = child.visits as f64 + child.virtual_loss as f64;
        let w = child.win_rate();
        let variance = (w * (1.0 - w)).min(VARIANCE_CLAMP);
        let exploration_term = ((parent_visits.max(1) as f64).ln() / n).sqrt();
        let exploitation = w + (variance + exploration_term).sqrt() * exploration_term;
        let prior_bonus =
            PRIOR_WEIGHT * (PRIOR_EQUIVALENCE / (PRIOR_EQUIVALENCE + parent_visits as f64)).sqrt() * child.prior;
        exploitation + exploration_term + prior_bonus
    }

    /// Run `iterations` total playouts spread over `workers` OS threads,
    /// each independently descending the shared arena and stopping early
    /// if `stop` is set (checked between iterations, matching the
    /// original's polling of `global_search_stop`). `workers == 0` or
    /// `1` still runs correctly -- the scope spawns exactly `workers.max(1)`
    /// threads and divides the iteration budget between them.
    pub fn run_parallel(
        &self,
        root_pos: &Position,
        features_template: &FeatureState,
        patterns_template: &PatternState,
        iterations: u32,
        workers: usize,
        stop: &AtomicBool,
    ) {
        let workers = workers.max(1);
        let base = iterations / workers as u32;
        let extra = iterations % workers as u32;
        std::thread::scope(|scope| {
            for w in 0..workers {
                let share = base + if (w as u32) < extra { 1 } else { 0 };
                if share == 0 {
                    continue;
                }
                scope.spawn(move || {
                    let mut rng = fastrand::Rng::with_seed(root_pos.move_hash ^ (w as u64).wrapping_mul(0x9E3779B97F4A7C15));
                    for _ in 0..share {
                        if stop.load(Ordering::Relaxed) {
                            return;
                        }
                        self.run_iteration(root_pos, features_template, patterns_template, &mut rng);
                    }
                });
            }
        });
    }

    /// Select the highest-value eligible (`open`) child index.
    fn select_child_in(node: &Node, rng: &mut fastrand::Rng) -> usize {
        let mut best = 0usize;
        let mut best_value = f64::NEG_INFINITY;
        for (i, child) in node.children.iter().enumerate() {
            if !child.open {
                continue;
            }
            let value = Self::child_value(node.visits, child, rng);
            if value > best_value {
                best_value = value;
                best = i;
            }
        }
        best
    }

    /// Open the next-highest-priored unmarked child whenever total visits
    /// cross `pw[width]`; every `PW_RESORT_INTERVAL` visits, re-rank by
    /// `prior * owner_bonus * criticality_bonus` and re-open the top set.
    fn widen_node(node: &mut Node) {
        if node.children.iter().all(|c| c.open) {
            return;
        }
        if (node.visits as f64) > node.pw_threshold(node.pw_width) {
            if node.visits % PW_RESORT_INTERVAL == 0 {
                let owner_sum = node.owner_sum.clone();
                let owner_count = node.owner_count.max(1) as f32;
                let black_sum = node.black_sum.clone();
                let white_sum = node.white_sum.clone();
                let winner_sum = node.winner_sum.clone();
                let to_move = node.to_move;
                let win_rate = node_win_rate(node);
                node.children.sort_by(|a, b| {
                    let score_a = a.prior
                        * ownership_bonus(&owner_sum, owner_count, a.point) as f64
                        * criticality_bonus(
                            &black_sum, &white_sum, &winner_sum, owner_count, to_move, win_rate, a.point,
                        ) as f64;
                    let score_b = b.prior
                        * ownership_bonus(&owner_sum, owner_count, b.point) as f64
                        * criticality_bonus(
                            &black_sum, &white_sum, &winner_sum, owner_count, to_move, win_rate, b.point,
                        ) as f64;
                    score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            let expected_open = node.pw_width as usize + 1;
            let opened = node.children.iter().filter(|c| c.open).count();
            if opened <= expected_open {
                if let Some(next) = node
                    .children
                    .iter_mut()
                    .filter(|c| !c.open)
                    .max_by(|a, b| a.prior.partial_cmp(&b.prior).unwrap_or(std::cmp::Ordering::Equal))
                {
                    next.open = true;
                }
            }
            node.pw_width += 1;
        }
    }

    /// One full iteration: clone the root position, descend by selection
    /// (adding virtual loss under the node's own lock), expand the first
    /// unexpanded-but-ready child (claimed via `Child::expanding` so two
    /// threads racing the same child don't both allocate), run a
    /// simulation from the resulting leaf, and back the result up. Takes
    /// `&self` -- every thread in `run_parallel` calls this concurrently
    /// against the same arena, with no two threads ever holding the same
    /// node's lock at once.
    pub fn run_iteration(
        &self,
        root_pos: &Position,
        features_template: &FeatureState,
        patterns_template: &PatternState,
        rng: &mut fastrand::Rng,
    ) {
        let Some(root_idx) = self.root else { return };
        let mut pos = root_pos.clone();
        let mut features = clone_feature_state(&pos, features_template);
        let mut patterns = clone_pattern_state(&pos, patterns_template);

        let mut path: Vec<(u32, usize)> = Vec::new();
        let mut node_idx = root_idx;

        let leaf_value = loop {
            let (child_idx, point, mover, already_expanded) = self.pool.with_node_mut(node_idx, |node| {
                Self::widen_node(node);
                let child_idx = Self::select_child_in(node, rng);
                let child = &mut node.children[child_idx];
                child.virtual_loss += 1;
                (child_idx, child.point, node.to_move, child.child)
            });
            path.push((node_idx, child_idx));

            if pos.place_stone(point, mover).is_err() {
                // Illegal replay off a stale transposition entry: treat as
                // a terminal loss-free simulation rather than panic.
                break playout_from(&mut pos, &mut patterns, &mut features, &self.sim_params, rng);
            }
            refresh_incremental_state(&pos, &mut patterns, &mut features);

            let visits_after = self.pool.with_node_mut(node_idx, |node| {
                let child = &mut node.children[child_idx];
                child.visits += 1;
                child.visits
            });

            if let Some(next_idx) = already_expanded {
                node_idx = next_idx;
                continue;
            }

            let double_pass =
                pos.history.len() >= 2 && pos.history[pos.history.len() - 1].pos == PASS
                    && pos.history[pos.history.len() - 2].pos == PASS;
            let threshold = if double_pass { u32::MAX } else { self.cfg.expand_threshold() };
            if visits_after < threshold {
                break playout_from(&mut pos, &mut patterns, &mut features, &self.sim_params, rng);
            }

            // Claim the expansion: only the thread that flips `expanding`
            // from false to true builds and allocates the child node. A
            // thread that loses the race (or finds the child already
            // expanded by the time it gets here) falls back to a plain
            // simulation instead of racing to allocate a duplicate.
            let claimed = self.pool.with_node_mut(node_idx, |node| {
                let child = &mut node.children[child_idx];
                if child.child.is_some() || child.expanding {
                    false
                } else {
                    child.expanding = true;
                    true
                }
            });
            if !claimed {
                break playout_from(&mut pos, &mut patterns, &mut features, &self.sim_params, rng);
            }

            let new_node = self.build_node(&pos, &features, &patterns);
            match self.pool.alloc(new_node) {
                Some(new_idx) => {
                    self.table.lock().insert(pos.move_hash, pos.to_move, pos.moves, new_idx);
                    self.pool.with_node_mut(node_idx, |node| {
                        let child = &mut node.children[child_idx];
                        child.child = Some(new_idx);
                        child.expanding = false;
                    });
                    break playout_from(&mut pos, &mut patterns, &mut features, &self.sim_params, rng);
                }
                None => {
                    self.pool.with_node_mut(node_idx, |node| node.children[child_idx].expanding = false);
                    // Node-store exhaustion: play a simulation only, per
                    // spec's failure semantics.
                    break playout_from(&mut pos, &mut patterns, &mut features, &self.sim_params, rng);
                }
            }
        };

        self.backpropagate(&path, leaf_value, &pos);
    }

    /// Each ancestor records one visit and a win from the perspective of
    /// the player to move *at that node*, flipping sign on alternation
    /// since `leaf_value` is already relative to the simulation's root
    /// color, and subtracts the virtual loss added on the way down.
    fn backpropagate(&self, path: &[(u32, usize)], leaf_value: f64, terminal: &Position) {
        for &(node_idx, child_idx) in path.iter().rev() {
            self.pool.with_node_mut(node_idx, |node| {
                let mover = node.to_move;
                let signed = if mover == BLACK { leaf_value } else { -leaf_value };
                let won = if signed > 0.0 { 1.0 } else { 0.0 };
                node.visits += 1;
                let child = &mut node.children[child_idx];
                child.wins += won;
                child.virtual_loss -= 1;
                accumulate_ownership(node, terminal, mover, won > 0.0);
            });
        }
    }

    /// Best root child by visit count; `resign` if its win rate falls
    /// below the configured threshold.
    pub fn select_move(&self) -> SearchResult {
        let idx = self.root.expect("search must run before move selection");
        self.pool.with_node(idx, |node| {
            let best = node
                .children
                .iter()
                .max_by_key(|c| c.visits)
                .expect("root always has at least a PASS child");
            let ownership = node
                .owner_sum
                .iter()
                .map(|&s| if node.owner_count > 0 { s / node.owner_count as f32 } else { 0.5 })
                .collect();
            SearchResult {
                best: best.point,
                resign: best.win_rate() < self.cfg.resign_threshold,
                visits: best.visits,
                win_rate: best.win_rate(),
                ownership,
            }
        })
    }

    /// Visit gap between the best and second-best root child, used by
    /// `search.rs`'s interruption criterion.
    pub fn top_two_visit_gap(&self) -> Option<(u32, u32)> {
        let idx = self.root?;
        self.pool.with_node(idx, |node| {
            let mut visits: Vec<u32> = node.children.iter().map(|c| c.visits).collect();
            visits.sort_unstable_by(|a, b| b.cmp(a));
            Some((*visits.first()?, *visits.get(1).unwrap_or(&0)))
        })
    }

    pub fn root_win_rate(&self) -> f64 {
        self.root
            .map(|idx| {
                self.pool.with_node(idx, |node| {
                    node.children.iter().max_by_key(|c| c.visits).map(|c| c.win_rate()).unwrap_or(0.5)
                })
            })
            .unwrap_or(0.5)
    }

    pub fn remaining_capacity(&self) -> usize {
        self.pool.remaining_capacity()
    }

    /// Restrict the transposition table to the subtree reachable from the
    /// node the engine is about to commit to as the new root, reclaiming
    /// capacity from every abandoned sibling (§4.F subtree reuse).
    pub fn retain_subtree(&mut self, committed_child_point: Point) {
        let Some(idx) = self.root else { return };
        let new_root = self.pool.with_node(idx, |node| {
            node.children.iter().find(|c| c.point == committed_child_point).and_then(|c| c.child)
        });
        let Some(new_root) = new_root else {
            self.table.lock().clear();
            self.root = None;
            return;
        };
        let mut keep = HashSet::new();
        self.collect_subtree(new_root, &mut keep);
        self.table.lock().retain_nodes(&keep);
        self.root = Some(new_root);
    }

    fn collect_subtree(&self, idx: u32, keep: &mut HashSet<u32>) {
        if !keep.insert(idx) {
            return;
        }
        let children: Vec<Option<u32>> = self.pool.with_node(idx, |node| node.children.iter().map(|c| c.child).collect());
        for next in children.into_iter().flatten() {
            self.collect_subtree(next, keep);
        }
    }
}

fn ownership_bonus(owner_sum: &[f32], owner_count: f32, point: Point) -> f32 {
    let p = point as usize;
    if p >= owner_sum.len() {
        return 1.0;
    }
    let avg = (owner_sum[p] / owner_count).abs();
    1.0 + avg
}

/// `CalculateCriticality`: how much a cell's final owner tracks the game's
/// actual winner, beyond what its raw black/white occupancy rate alone would
/// predict. A cell that's black in every terminal *and* black wins every
/// time the node's mover is black carries no extra information (tmp ~= 0);
/// a cell that flips to whichever color wins, independent of overall
/// ownership rate, is "critical" (tmp > 0) and worth widening into sooner.
fn criticality_bonus(
    black_sum: &[f32],
    white_sum: &[f32],
    winner_sum: &[f32],
    owner_count: f32,
    to_move: u8,
    win_rate: f32,
    point: Point,
) -> f32 {
    let p = point as usize;
    if p >= black_sum.len() {
        return 1.0;
    }
    let lose_rate = 1.0 - win_rate;
    let matched_winner = winner_sum[p] / owner_count;
    let black_frac = black_sum[p] / owner_count;
    let white_frac = white_sum[p] / owner_count;
    let (self_frac, other_frac) = if to_move == crate::geometry::BLACK {
        (black_frac, white_frac)
    } else {
        (white_frac, black_frac)
    };
    let tmp = matched_winner - (self_frac * win_rate + other_frac * lose_rate);
    1.0 + tmp.max(0.0)
}

fn node_win_rate(node: &Node) -> f32 {
    if node.visits == 0 {
        return 0.5;
    }
    let wins: f64 = node.children.iter().map(|c| c.wins).sum();
    (wins / node.visits as f64) as f32
}

/// Per-cell ownership contribution of one terminal position: +1 for black
/// stones/territory, -1 for white, 0 for neutral dame, averaged over every
/// playout that passes through this node. Also tallies the raw per-color
/// occupancy and whether the occupant matched the simulation's actual
/// winner (`Statistic` in the original), feeding `criticality_bonus`.
fn accumulate_ownership(node: &mut Node, terminal: &Position, mover: u8, mover_won: bool) {
    node.owner_count += 1;
    let winner_color = if mover_won { mover } else { crate::geometry::opposite(mover) };
    for pt in terminal.geom.points() {
        let c = terminal.color_at(pt);
        let contribution = if c == crate::geometry::BLACK {
            1.0
        } else if c == crate::geometry::WHITE {
            -1.0
        } else {
            0.0
        };
        node.owner_sum[pt as usize] += contribution;
        if c == crate::geometry::BLACK {
            node.black_sum[pt as usize] += 1.0;
        } else if c == crate::geometry::WHITE {
            node.white_sum[pt as usize] += 1.0;
        }
        if c == winner_color {
            node.winner_sum[pt as usize] += 1.0;
        }
    }
}

fn playout_from(
    pos: &mut Position,
    patterns: &mut PatternState,
    features: &mut FeatureState,
    sim: &SimParams,
    rng: &mut fastrand::Rng,
) -> f64 {
    playout::run_playout(pos, patterns, features, sim, rng)
}

fn refresh_incremental_state(pos: &Position, patterns: &mut PatternState, features: &mut FeatureState) {
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

/// `FeatureState` isn't `Clone` -- its tags accumulate incrementally over a
/// whole game's history rather than being derivable from the board alone,
/// so there's no cheap way to fork the root's exact tag set for a private
/// descent copy. Each iteration instead starts from a blank tag set and
/// lets `refresh_incremental_state` retag what the descent itself touches,
/// the same simplification `playout.rs`'s own tests already make.
fn clone_feature_state(pos: &Position, _template: &FeatureState) -> FeatureState {
    FeatureState::new(pos.board.len())
}

/// `PatternState`, unlike `FeatureState`, is a pure function of the board
/// contents, so it can be rebuilt exactly via `reset` rather than merely
/// approximated.
fn clone_pattern_state(pos: &Position, _template: &PatternState) -> PatternState {
    let mut patterns = PatternState::new(pos.board.len());
    patterns.reset(&pos.geom, &pos.board);
    patterns
}
