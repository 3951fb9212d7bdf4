//! Transposition Store (Component F): fixed-capacity, open-addressed node
//! table keyed by the path-dependent `move_hash`, enabling subtree reuse
//! between engine moves without unbounded tree growth.
//!
//! The teacher's MCTS tree (`mcts.rs`, now superseded) owns its nodes
//! directly in a `Vec<TreeNode>` tree with no hashing -- every move threw
//! the whole tree away. Grounded instead in `include/mcts/UctNode.hpp`'s
//! `uct_hash_table_t` (`UctHash.cpp`'s `FindSameHashIndex`/
//! `SearchEmptyIndex`/`DeleteOldHash`): a flat array of slots probed
//! linearly from `hash % capacity`, each tagged with the hash, the color to
//! move and the move count so a hash collision across unrelated positions
//! can't be mistaken for a transposition.

use crate::zobrist::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Empty,
    Occupied,
    Tombstone,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    state: SlotState,
    hash: Hash,
    color: u8,
    moves: u32,
    node: u32,
}

/// Open-addressed table mapping `(move_hash, color, moves)` to a node index
/// in the caller's node pool (`mcts::NodePool`). Capacity is fixed at
/// construction and must be a power of two for the mask-based probe step.
pub struct TranspositionTable {
    slots: Vec<Slot>,
    mask: usize,
    len: usize,
}

impl TranspositionTable {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(16);
        TranspositionTable {
            slots: vec![
                Slot { state: SlotState::Empty, hash: 0, color: 0, moves: 0, node: 0 };
                capacity
            ],
            mask: capacity - 1,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn start(&self, hash: Hash) -> usize {
        (hash as usize) & self.mask
    }

    fn matches(slot: &Slot, hash: Hash, color: u8, moves: u32) -> bool {
        slot.state == SlotState::Occupied && slot.hash == hash && slot.color == color && slot.moves == moves
    }

    /// `find(hash, color, moves)`: the occupied, matching slot's node index,
    /// or `None`. Probing stops at the first `Empty` slot (a `Tombstone`
    /// means "keep looking", since the matching entry may have been
    /// reinserted after probing past this point).
    pub fn find(&self, hash: Hash, color: u8, moves: u32) -> Option<u32> {
        let mut i = self.start(hash);
        for _ in 0..self.slots.len() {
            match self.slots[i].state {
                SlotState::Empty => return None,
                SlotState::Occupied if Self::matches(&self.slots[i], hash, color, moves) => {
                    return Some(self.slots[i].node)
                }
                _ => {}
            }
            i = (i + 1) & self.mask;
        }
        None
    }

    /// `reserve_empty(hash, color, moves)`: the first empty-or-tombstone
    /// slot on the probe chain, for inserting `node`. Overwrites an
    /// existing matching entry in place rather than duplicating it.
    pub fn insert(&mut self, hash: Hash, color: u8, moves: u32, node: u32) {
        let mut i = self.start(hash);
        loop {
            match self.slots[i].state {
                SlotState::Empty | SlotState::Tombstone => {
                    self.slots[i] = Slot { state: SlotState::Occupied, hash, color, moves, node };
                    self.len += 1;
                    return;
                }
                SlotState::Occupied if Self::matches(&self.slots[i], hash, color, moves) => {
                    self.slots[i].node = node;
                    return;
                }
                _ => {}
            }
            i = (i + 1) & self.mask;
        }
    }

    /// Clear every slot (used when a reused root can't be found, matching
    /// the original's `DeleteOldHash` full-table fallback).
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.state = SlotState::Empty;
        }
        self.len = 0;
    }

    /// Subtree reuse: keep only the slots whose node index is in `keep`
    /// (the transitive children of the new root). Dropped slots become
    /// `Tombstone`, not `Empty` -- `find` stops at the first `Empty` slot,
    /// so resetting a mid-chain slot outright would strand any surviving
    /// entry whose probe chain passes through it.
    pub fn retain_nodes(&mut self, keep: &std::collections::HashSet<u32>) {
        let mut len = 0;
        for slot in &mut self.slots {
            if slot.state == SlotState::Occupied {
                if keep.contains(&slot.node) {
                    len += 1;
                } else {
                    slot.state = SlotState::Tombstone;
                }
            }
        }
        self.len = len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find_round_trips() {
        let mut table = TranspositionTable::new(16);
        table.insert(0xABCD, 1, 7, 42);
        assert_eq!(table.find(0xABCD, 1, 7), Some(42));
    }

    #[test]
    fn color_and_move_count_disambiguate_collisions() {
        let mut table = TranspositionTable::new(16);
        table.insert(5, 1, 1, 10);
        assert_eq!(table.find(5, 2, 1), None);
        assert_eq!(table.find(5, 1, 2), None);
        assert_eq!(table.find(5, 1, 1), Some(10));
    }

    #[test]
    fn probe_chain_survives_collision() {
        let mut table = TranspositionTable::new(4);
        // Both hashes land on slot 0 of a 4-slot table.
        table.insert(0, 1, 0, 100);
        table.insert(4, 1, 0, 200);
        assert_eq!(table.find(0, 1, 0), Some(100));
        assert_eq!(table.find(4, 1, 0), Some(200));
    }

    #[test]
    fn retain_nodes_drops_everything_else() {
        let mut table = TranspositionTable::new(16);
        table.insert(1, 1, 0, 10);
        table.insert(2, 1, 0, 20);
        table.insert(3, 1, 0, 30);
        let keep: std::collections::HashSet<u32> = [10, 30].into_iter().collect();
        table.retain_nodes(&keep);
        assert_eq!(table.len(), 2);
        assert_eq!(table.find(1, 1, 0), Some(10));
        assert_eq!(table.find(2, 1, 0), None);
        assert_eq!(table.find(3, 1, 0), Some(30));
    }

    #[test]
    fn retain_nodes_tombstones_dont_break_probe_chains_past_them() {
        let mut table = TranspositionTable::new(4);
        // Both hashes land on slot 0 of a 4-slot table; 200 probes past 100.
        table.insert(0, 1, 0, 100);
        table.insert(4, 1, 0, 200);
        let keep: std::collections::HashSet<u32> = [200].into_iter().collect();
        table.retain_nodes(&keep);
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(4, 1, 0), Some(200));
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut table = TranspositionTable::new(16);
        table.insert(1, 1, 0, 10);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.find(1, 1, 0), None);
    }
}
