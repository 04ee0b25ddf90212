//! The line (super-block) index: free list, full list, and the min-`vpc`
//! victim priority queue.
//!
//! A line is, at every moment, in exactly one of four containers: owned by
//! a write pointer as its `curline`, sitting in the free list, sitting in
//! the full list, or sitting in the victim priority queue (I3). The PQ is a
//! binary heap keyed by `vpc` ascending, with each line carrying its own
//! heap slot index (`pos`) so that `change_priority` is an O(log n)
//! decrease/increase-key instead of a linear search — the same
//! index-back-pointer trick an intrusive free list uses to find its
//! neighbors without a separate lookup structure.

#![warn(missing_docs)]

use std::collections::VecDeque;

use thiserror::Error;

/// Identifies a line by its block index, shared across every channel/LUN/plane.
pub type LineId = u32;

/// Hot/cold wear-leveling pool tag (C10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pool {
    /// Frequently erased lines.
    #[default]
    Hot,
    /// Rarely erased lines.
    Cold,
}

/// A line's bookkeeping: valid/invalid page counts, erase telemetry, pool
/// tag, and the translation flag set when a frontier opens it for
/// translation-page traffic.
#[derive(Debug, Clone)]
pub struct Line {
    id: LineId,
    vpc: u32,
    ipc: u32,
    erase_cnt: u64,
    eec: u64,
    pool: Pool,
    translation: bool,
    /// 1-based index into the victim heap array; `0` means "not in the PQ".
    pos: usize,
}

impl Line {
    fn new(id: LineId) -> Self {
        Self {
            id,
            vpc: 0,
            ipc: 0,
            erase_cnt: 0,
            eec: 0,
            pool: Pool::Hot,
            translation: false,
            pos: 0,
        }
    }

    /// The line's id (its block index).
    #[must_use]
    pub const fn id(&self) -> LineId {
        self.id
    }

    /// Current valid-page count.
    #[must_use]
    pub const fn vpc(&self) -> u32 {
        self.vpc
    }

    /// Current invalid-page count.
    #[must_use]
    pub const fn ipc(&self) -> u32 {
        self.ipc
    }

    /// Lifetime erase count.
    #[must_use]
    pub const fn erase_cnt(&self) -> u64 {
        self.erase_cnt
    }

    /// Effective erase count — reset on a pool transition, used by wear leveling.
    #[must_use]
    pub const fn eec(&self) -> u64 {
        self.eec
    }

    /// Current wear-leveling pool.
    #[must_use]
    pub const fn pool(&self) -> Pool {
        self.pool
    }

    /// Whether this line is dedicated to translation-page traffic.
    #[must_use]
    pub const fn is_translation(&self) -> bool {
        self.translation
    }

    /// True while this line sits in the victim priority queue.
    #[must_use]
    pub const fn in_victim_pq(&self) -> bool {
        self.pos != 0
    }
}

/// Errors raised by the line manager.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// The free list is empty; a write-pointer rollover or CMT eviction
    /// cannot allocate a fresh line.
    #[error("no free line available")]
    NoFreeLine,
}

/// Free list, full list, and victim priority queue over every line.
#[derive(Debug, Clone)]
pub struct LineManager {
    lines: Vec<Line>,
    free_list: VecDeque<LineId>,
    full_list: Vec<LineId>,
    /// Min-heap array of line ids, keyed by `vpc` ascending.
    victim_heap: Vec<LineId>,
}

impl LineManager {
    /// Builds a manager with `tt_lines` fresh lines, all in the free list.
    #[must_use]
    pub fn new(tt_lines: u32) -> Self {
        let lines = (0..tt_lines).map(Line::new).collect();
        let free_list = (0..tt_lines).collect();
        Self {
            lines,
            free_list,
            full_list: Vec::new(),
            victim_heap: Vec::new(),
        }
    }

    /// Number of lines currently in the free list.
    #[must_use]
    pub fn free_line_cnt(&self) -> usize {
        self.free_list.len()
    }

    /// Number of lines currently in the victim PQ.
    #[must_use]
    pub fn victim_line_cnt(&self) -> usize {
        self.victim_heap.len()
    }

    /// Number of lines currently in the full list.
    #[must_use]
    pub fn full_line_cnt(&self) -> usize {
        self.full_list.len()
    }

    /// Borrows a line by id.
    #[must_use]
    pub fn line(&self, id: LineId) -> &Line {
        &self.lines[id as usize]
    }

    /// Removes the head of the free list.
    ///
    /// # Errors
    /// [`LineError::NoFreeLine`] if the free list is empty.
    pub fn get_next_free_line(&mut self) -> Result<LineId, LineError> {
        self.free_list.pop_front().ok_or(LineError::NoFreeLine)
    }

    /// Moves a fully written line (`vpc == pgs_per_line`, no overwrites) to
    /// the full list.
    pub fn insert_full(&mut self, id: LineId) {
        debug_assert!(!self.lines[id as usize].in_victim_pq());
        self.full_list.push(id);
    }

    /// Removes `id` from the full list, e.g. because an overwrite just
    /// invalidated one of its pages and it must move to the victim PQ.
    pub fn remove_full(&mut self, id: LineId) {
        if let Some(pos) = self.full_list.iter().position(|&x| x == id) {
            self.full_list.swap_remove(pos);
        }
    }

    /// Inserts `id` into the victim PQ, keyed by its current `vpc`.
    pub fn insert_victim(&mut self, id: LineId) {
        debug_assert!(!self.lines[id as usize].in_victim_pq());
        self.victim_heap.push(id);
        let pos = self.victim_heap.len();
        self.lines[id as usize].pos = pos;
        self.sift_up(pos);
    }

    /// Peeks the min-`vpc` line without removing it.
    #[must_use]
    pub fn peek_victim(&self) -> Option<LineId> {
        self.victim_heap.first().copied()
    }

    /// Removes and returns the min-`vpc` line.
    pub fn pop_victim(&mut self) -> Option<LineId> {
        if self.victim_heap.is_empty() {
            return None;
        }
        let top = self.victim_heap[0];
        self.swap_remove_heap(0);
        self.lines[top as usize].pos = 0;
        Some(top)
    }

    /// Updates a line's `vpc` while it sits in the victim PQ, restoring the
    /// heap invariant in O(log n) via its stored slot (`pos`). A no-op if
    /// the line is not currently in the PQ.
    pub fn change_victim_priority(&mut self, id: LineId, new_vpc: u32) {
        self.lines[id as usize].vpc = new_vpc;
        let pos = self.lines[id as usize].pos;
        if pos == 0 {
            return;
        }
        // Either direction may be needed: vpc can move up (overwrite
        // un-invalidates nothing, so only down in practice, but a generic
        // decrease/increase-key keeps the heap correct regardless).
        if !self.sift_up(pos) {
            self.sift_down(pos);
        }
    }

    /// Directly sets `vpc`/`ipc` for a line outside the PQ (e.g. while it's
    /// a write pointer's `curline`).
    pub fn set_counts(&mut self, id: LineId, vpc: u32, ipc: u32) {
        let line = &mut self.lines[id as usize];
        line.vpc = vpc;
        line.ipc = ipc;
    }

    /// Increments `ipc` and decrements `vpc` for `id`; if the line is
    /// currently in the victim PQ its priority is restored in place,
    /// otherwise the counters are simply updated (mirrors the original's
    /// `pos != 0` branch in `mark_page_invalid`).
    pub fn invalidate_one(&mut self, id: LineId) {
        let (vpc, in_pq) = {
            let line = &mut self.lines[id as usize];
            line.ipc += 1;
            line.vpc -= 1;
            (line.vpc, line.in_victim_pq())
        };
        if in_pq {
            self.change_victim_priority(id, vpc);
        }
    }

    /// Increments `vpc` for `id` (a page in this line just became valid).
    pub fn validate_one(&mut self, id: LineId) {
        self.lines[id as usize].vpc += 1;
    }

    /// Marks `translation` for `id` — a frontier opened it for
    /// translation-page traffic.
    pub fn set_translation(&mut self, id: LineId, translation: bool) {
        self.lines[id as usize].translation = translation;
    }

    /// Resets a line's counters, bumps its erase telemetry, and returns it
    /// to the free list — the final step of GC/erase.
    pub fn mark_line_free(&mut self, id: LineId) {
        let line = &mut self.lines[id as usize];
        debug_assert_eq!(line.vpc, 0, "line {id} erased with live valid pages");
        line.vpc = 0;
        line.ipc = 0;
        line.erase_cnt += 1;
        line.eec += 1;
        line.translation = false;
        self.free_list.push_back(id);
        log::debug!("line {id} erased and returned to the free list");
    }

    /// Sets a line's pool tag directly (wear leveling).
    pub fn set_pool(&mut self, id: LineId, pool: Pool) {
        self.lines[id as usize].pool = pool;
    }

    /// Resets a line's effective erase count (pool transition).
    pub fn reset_eec(&mut self, id: LineId) {
        self.lines[id as usize].eec = 0;
    }

    /// Iterates every line.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Total number of lines.
    #[must_use]
    pub fn tt_lines(&self) -> usize {
        self.lines.len()
    }

    // --- heap internals -------------------------------------------------

    fn sift_up(&mut self, mut pos: usize) -> bool {
        let mut moved = false;
        while pos > 1 {
            let parent = pos / 2;
            if self.vpc_at(parent) <= self.vpc_at(pos) {
                break;
            }
            self.swap_heap(parent, pos);
            pos = parent;
            moved = true;
        }
        moved
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.victim_heap.len();
        loop {
            let left = pos * 2;
            let right = left + 1;
            let mut smallest = pos;
            if left <= len && self.vpc_at(left) < self.vpc_at(smallest) {
                smallest = left;
            }
            if right <= len && self.vpc_at(right) < self.vpc_at(smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap_heap(pos, smallest);
            pos = smallest;
        }
    }

    fn vpc_at(&self, pos: usize) -> u32 {
        self.lines[self.victim_heap[pos - 1] as usize].vpc
    }

    fn swap_heap(&mut self, a: usize, b: usize) {
        self.victim_heap.swap(a - 1, b - 1);
        self.lines[self.victim_heap[a - 1] as usize].pos = a;
        self.lines[self.victim_heap[b - 1] as usize].pos = b;
    }

    fn swap_remove_heap(&mut self, zero_based: usize) {
        let last = self.victim_heap.len() - 1;
        self.victim_heap.swap(zero_based, last);
        self.victim_heap.pop();
        if zero_based < last {
            self.lines[self.victim_heap[zero_based] as usize].pos = zero_based + 1;
            self.sift_down(zero_based + 1);
        }
    }
}
