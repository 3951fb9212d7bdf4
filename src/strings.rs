//! Arena-indexed string (connected-group) storage.
//!
//! The original engine's `string_t`/`game_info_t` (`BoardData.hpp`) stores
//! strings in a fixed `string[MAX_STRING]` array addressed by small integer
//! ids, with a `string_id[]`/`string_next[]` pair of parallel arrays giving
//! each stone's owning string and a singly-linked intra-string stone list.
//! We keep that arena-of-indices shape (an id is cheap to copy, store in an
//! MCTS child, and compare) but make it a `Vec` with a free-list instead of
//! a fixed C array, since `MAX_STRING` now depends on the runtime board size
//! (`EngineConfig::node_pool_capacity`-style sizing, see `config.rs`).

use crate::geometry::Point;

/// Index into a [`StringPool`]. `NONE` mirrors the original's unused-slot
/// convention (`string[id].flag == false`) without needing an `Option` at
/// every call site in the hot capture path.
pub type StringId = u16;
pub const NONE: StringId = StringId::MAX;

#[derive(Debug, Clone)]
struct StringData {
    color: u8,
    /// Head of the intrusive stone linked list (`next[]`-chained).
    head: Point,
    /// Smallest coordinate ever held by this string; used as the stable
    /// tie-break key for move ordering and debug display, tracked
    /// separately from `head` so the chain never needs resplicing.
    origin: Point,
    size: u32,
    liberties: Vec<Point>,
    /// Enemy strings adjacent to this one, each listed once.
    neighbors: Vec<StringId>,
}

/// Owns every live string plus the per-point intrusive linked list of stones
/// belonging to each string (`next[pt]` chains to the next stone, `NONE`-
/// terminated, mirroring `string_next[]`).
pub struct StringPool {
    slots: Vec<Option<StringData>>,
    free: Vec<StringId>,
    /// `owner[pt]`: which string a stone at `pt` belongs to, or `NONE`.
    owner: Vec<StringId>,
    /// `next[pt]`: next stone in the same string's linked list, or `NONE`.
    next: Vec<Point>,
}

impl StringPool {
    pub fn new(board_max: usize, capacity: usize) -> Self {
        StringPool {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            owner: vec![NONE; board_max],
            next: vec![NONE; board_max],
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.owner.iter_mut().for_each(|o| *o = NONE);
        self.next.iter_mut().for_each(|n| *n = NONE);
    }

    #[inline]
    pub fn owner_of(&self, pt: Point) -> StringId {
        self.owner[pt as usize]
    }

    fn alloc(&mut self, data: StringData) -> StringId {
        if let Some(id) = self.free.pop() {
            self.slots[id as usize] = Some(data);
            id
        } else {
            let id = self.slots.len() as StringId;
            self.slots.push(Some(data));
            id
        }
    }

    fn get(&self, id: StringId) -> &StringData {
        self.slots[id as usize].as_ref().expect("dangling StringId")
    }

    fn get_mut(&mut self, id: StringId) -> &mut StringData {
        self.slots[id as usize].as_mut().expect("dangling StringId")
    }

    pub fn color(&self, id: StringId) -> u8 {
        self.get(id).color
    }

    pub fn size(&self, id: StringId) -> u32 {
        self.get(id).size
    }

    pub fn origin(&self, id: StringId) -> Point {
        self.get(id).origin
    }

    pub fn liberty_count(&self, id: StringId) -> usize {
        self.get(id).liberties.len()
    }

    pub fn liberties(&self, id: StringId) -> &[Point] {
        &self.get(id).liberties
    }

    pub fn neighbors(&self, id: StringId) -> &[StringId] {
        &self.get(id).neighbors
    }

    pub fn in_atari(&self, id: StringId) -> bool {
        self.liberty_count(id) == 1
    }

    /// Every stone belonging to `id`, in linked order (not coordinate order).
    pub fn stones(&self, id: StringId) -> Vec<Point> {
        let mut out = Vec::with_capacity(self.get(id).size as usize);
        let mut pt = self.get(id).head;
        while pt != NONE {
            out.push(pt);
            pt = self.next[pt as usize];
        }
        out
    }

    /// Start a brand-new single-stone string (`MakeString`).
    pub fn create(&mut self, pt: Point, color: u8, liberties: Vec<Point>) -> StringId {
        let id = self.alloc(StringData {
            color,
            head: pt,
            origin: pt,
            size: 1,
            liberties,
            neighbors: Vec::new(),
        });
        self.owner[pt as usize] = id;
        self.next[pt as usize] = NONE;
        id
    }

    /// Add one stone already known to be adjacent to `id` (`AddStone`).
    /// `new_liberties` are the stone's empty neighbors not already liberties
    /// of the string.
    pub fn add_stone(
        &mut self,
        id: StringId,
        pt: Point,
        new_liberties: impl IntoIterator<Item = Point>,
    ) {
        self.owner[pt as usize] = id;
        let data = self.get_mut(id);
        self.next[pt as usize] = data.head;
        data.head = pt;
        data.size += 1;
        if pt < data.origin {
            data.origin = pt;
        }
        for lib in new_liberties {
            if !data.liberties.contains(&lib) {
                data.liberties.push(lib);
            }
        }
    }

    /// Record that `id` and `other` are adjacent enemy strings, each exactly
    /// once (`ConnectString`'s neighbor bookkeeping half).
    pub fn link_neighbors(&mut self, id: StringId, other: StringId) {
        if !self.get(id).neighbors.contains(&other) {
            self.get_mut(id).neighbors.push(other);
        }
        if !self.get(other).neighbors.contains(&id) {
            self.get_mut(other).neighbors.push(id);
        }
    }

    pub fn remove_liberty(&mut self, id: StringId, pt: Point) {
        self.get_mut(id).liberties.retain(|&l| l != pt);
    }

    pub fn add_liberty(&mut self, id: StringId, pt: Point) {
        let libs = &mut self.get_mut(id).liberties;
        if !libs.contains(&pt) {
            libs.push(pt);
        }
    }

    /// Merge `absorbed` into `into` after a connecting move; frees the
    /// absorbed slot. Returns the surviving id (`ConnectString`).
    pub fn merge(&mut self, into: StringId, absorbed: StringId) -> StringId {
        if into == absorbed {
            return into;
        }
        let (absorbed_color, absorbed_head, absorbed_size, absorbed_libs, absorbed_neighbors, absorbed_origin) = {
            let d = self.get(absorbed);
            (d.color, d.head, d.size, d.liberties.clone(), d.neighbors.clone(), d.origin)
        };
        debug_assert_eq!(absorbed_color, self.get(into).color);

        for lib in absorbed_libs {
            self.add_liberty(into, lib);
        }
        for n in absorbed_neighbors {
            if n != into {
                self.link_neighbors(into, n);
            }
            self.get_mut(n).neighbors.retain(|&x| x != absorbed);
        }

        // Relink every absorbed stone to point at `into`, then splice the
        // absorbed chain in front of `into`'s existing chain.
        let mut pt = absorbed_head;
        while pt != NONE {
            self.owner[pt as usize] = into;
            pt = self.next[pt as usize];
        }
        let mut tail = absorbed_head;
        while self.next[tail as usize] != NONE {
            tail = self.next[tail as usize];
        }
        let into_head = self.get(into).head;
        self.next[tail as usize] = into_head;

        let data = self.get_mut(into);
        data.head = absorbed_head;
        data.size += absorbed_size;
        data.origin = data.origin.min(absorbed_origin);

        self.free_slot(absorbed);
        into
    }

    /// Remove a captured string from the board entirely, returning its
    /// stones so the caller can clear the board array and re-open
    /// liberties in neighboring strings (`RemoveString`).
    pub fn remove(&mut self, id: StringId) -> Vec<Point> {
        let stones = self.stones(id);
        for &pt in &stones {
            self.owner[pt as usize] = NONE;
            self.next[pt as usize] = NONE;
        }
        let neighbors = self.get(id).neighbors.clone();
        for n in neighbors {
            self.get_mut(n).neighbors.retain(|&x| x != id);
        }
        self.free_slot(id);
        stones
    }

    fn free_slot(&mut self, id: StringId) {
        self.slots[id as usize] = None;
        self.free.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_single_stone_string() {
        let mut pool = StringPool::new(64, 16);
        let id = pool.create(10, 1, vec![9, 11, 19, 1]);
        assert_eq!(pool.size(id), 1);
        assert_eq!(pool.liberty_count(id), 4);
        assert_eq!(pool.stones(id), vec![10]);
    }

    #[test]
    fn add_stone_grows_chain_and_liberties() {
        let mut pool = StringPool::new(64, 16);
        let id = pool.create(10, 1, vec![9, 11]);
        pool.add_stone(id, 19, [18, 20, 28]);
        assert_eq!(pool.size(id), 2);
        let mut stones = pool.stones(id);
        stones.sort();
        assert_eq!(stones, vec![10, 19]);
        assert_eq!(pool.origin(id), 10);
        assert!(pool.liberties(id).contains(&28));
    }

    #[test]
    fn merge_combines_size_and_liberties() {
        let mut pool = StringPool::new(64, 16);
        let a = pool.create(10, 1, vec![9, 11]);
        let b = pool.create(30, 1, vec![29, 31]);
        let merged = pool.merge(a, b);
        assert_eq!(pool.size(merged), 2);
        assert_eq!(pool.liberty_count(merged), 4);
        let mut stones = pool.stones(merged);
        stones.sort();
        assert_eq!(stones, vec![10, 30]);
        assert_eq!(pool.origin(merged), 10);
    }

    #[test]
    fn remove_clears_ownership() {
        let mut pool = StringPool::new(64, 16);
        let id = pool.create(10, 1, vec![9, 11]);
        let stones = pool.remove(id);
        assert_eq!(stones, vec![10]);
        assert_eq!(pool.owner_of(10), NONE);
    }

    #[test]
    fn neighbor_links_are_symmetric() {
        let mut pool = StringPool::new(64, 16);
        let a = pool.create(10, 1, vec![9]);
        let b = pool.create(11, 2, vec![12]);
        pool.link_neighbors(a, b);
        assert!(pool.neighbors(a).contains(&b));
        assert!(pool.neighbors(b).contains(&a));
    }
}
