//! Cached Mapping Table (CMT) — C7.
//!
//! A bounded LRU cache of translation-page L2P arrays, the working set the
//! translator keeps resident in DRAM so most lookups never touch NAND. Every
//! entry carries a dirty bit: a clean entry's on-flash translation page is
//! already current and can simply be dropped on eviction, but a dirty
//! entry's L2P has been mutated since it was faulted in and must be written
//! back to a fresh translation page first (I5).
//!
//! Capacity (`tt_tpgs`) is enforced by the caller, not by the underlying
//! cache: eviction of a dirty victim requires allocating a translation PPA
//! and updating the GTD/RMAP *before* the slot is reused, so the cache here
//! is [`lru::LruCache::unbounded`] and [`Cmt::evict_lru`] is called
//! explicitly rather than happening as a side effect of insertion.

#![warn(missing_docs)]

use dftl_geometry::Ppa;
use lru::LruCache;

/// One resident translation page's L2P array and dirty bit.
#[derive(Debug, Clone)]
pub struct CmtEntry {
    vpn: u64,
    l2p: Vec<Ppa>,
    dirty: bool,
}

impl CmtEntry {
    /// Builds a fresh, clean entry for `vpn` from an already-materialized L2P
    /// array (a copy of the on-flash translation page, or a fresh
    /// all-[`Ppa::UNMAPPED`] array on a cold miss).
    #[must_use]
    pub const fn new(vpn: u64, l2p: Vec<Ppa>) -> Self {
        Self {
            vpn,
            l2p,
            dirty: false,
        }
    }

    /// The translation-page index this entry caches.
    #[must_use]
    pub const fn vpn(&self) -> u64 {
        self.vpn
    }

    /// Borrows the cached L2P array.
    #[must_use]
    pub fn l2p(&self) -> &[Ppa] {
        &self.l2p
    }

    /// Mutably borrows the cached L2P array.
    pub fn l2p_mut(&mut self) -> &mut [Ppa] {
        &mut self.l2p
    }

    /// Whether this entry has been mutated since it was faulted in or last
    /// written back.
    #[must_use]
    pub const fn dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the entry dirty (a write just touched one of its L2P slots).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the dirty bit (its L2P was just written back to NAND).
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Consumes the entry, taking ownership of its L2P array — used to move
    /// a dirty victim's payload into a freshly allocated translation page
    /// without ever holding two live copies.
    #[must_use]
    pub fn into_l2p(self) -> Vec<Ppa> {
        self.l2p
    }
}

/// CMT hit/miss telemetry, mirroring the original's `struct cmt` counters and
/// surfaced through the `PrintCmt` admin command.
///
/// `read_miss_cnt`/`write_miss_cnt` are tracked for parity with the original
/// layout but are never incremented by this design either — the original
/// never distinguished a CMT miss by read-vs-write at the increment site,
/// so both fields stay at zero the same way they do upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CmtStats {
    /// Lookups that found the vpn resident.
    pub hit_cnt: u64,
    /// Lookups that did not find the vpn resident (cold or flash-resident).
    pub miss_cnt: u64,
    /// Reserved for parity with the original; never incremented.
    pub read_miss_cnt: u64,
    /// Reserved for parity with the original; never incremented.
    pub write_miss_cnt: u64,
    /// Misses where no translation page existed for the vpn at all.
    pub cold_miss_cnt: u64,
    /// Dirty evictions that required a translation-page write-back.
    pub flush_cnt: u64,
}

/// The bounded LRU cache of resident translation pages.
#[derive(Debug)]
pub struct Cmt {
    capacity: usize,
    cache: LruCache<u64, CmtEntry>,
    stats: CmtStats,
}

impl Cmt {
    /// Builds an empty CMT with room for `capacity` resident translation pages.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity: capacity as usize,
            cache: LruCache::unbounded(),
            stats: CmtStats::default(),
        }
    }

    /// Configured capacity (`cmt.tt_tpgs`).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently resident.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True if no entries are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// True if inserting another entry requires an eviction first (I5).
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cache.len() >= self.capacity
    }

    /// Current hit/miss telemetry.
    #[must_use]
    pub fn stats(&self) -> CmtStats {
        self.stats
    }

    /// Non-promoting lookup: does `vpn` have a resident entry? Used by GC,
    /// which checks CMT residency without disturbing LRU order (the
    /// original's `cmt_check` is a plain linear search, not a touch).
    #[must_use]
    pub fn peek(&self, vpn: u64) -> Option<&CmtEntry> {
        self.cache.peek(&vpn)
    }

    /// Non-promoting mutable lookup, for GC materializing a relocated page
    /// into an already-resident entry's L2P.
    pub fn peek_mut(&mut self, vpn: u64) -> Option<&mut CmtEntry> {
        self.cache.peek_mut(&vpn)
    }

    /// Looks up `vpn`, promoting it to the LRU head on a hit — the
    /// translator's hit path (`list_move` to the front in the original).
    pub fn touch(&mut self, vpn: u64) -> Option<&CmtEntry> {
        self.cache.get(&vpn)
    }

    /// Same as [`Self::touch`] but mutable.
    pub fn touch_mut(&mut self, vpn: u64) -> Option<&mut CmtEntry> {
        self.cache.get_mut(&vpn)
    }

    /// Inserts a freshly faulted-in entry at the LRU head.
    ///
    /// The caller must ensure `!is_full()` beforehand, evicting via
    /// [`Self::evict_lru`] first if needed — capacity here is a caller
    /// discipline, not an automatic side effect of insertion, because a
    /// dirty eviction must allocate a translation PPA and update the
    /// GTD/RMAP before the slot is reused.
    pub fn insert(&mut self, entry: CmtEntry) {
        self.cache.put(entry.vpn, entry);
    }

    /// Evicts and returns the LRU-tail entry.
    pub fn evict_lru(&mut self) -> Option<CmtEntry> {
        self.cache.pop_lru().map(|(_, entry)| entry)
    }

    /// Records a CMT hit.
    pub fn record_hit(&mut self) {
        self.stats.hit_cnt += 1;
    }

    /// Records a CMT miss (resident elsewhere or not at all).
    pub fn record_miss(&mut self) {
        self.stats.miss_cnt += 1;
    }

    /// Records a cold miss (no translation page existed for the vpn yet).
    pub fn record_cold_miss(&mut self) {
        self.stats.cold_miss_cnt += 1;
    }

    /// Records a dirty-eviction write-back.
    pub fn record_flush(&mut self) {
        self.stats.flush_cnt += 1;
    }

    /// Iterates resident entries, most-recently-used first (`PrintCmt`
    /// verbose dump).
    pub fn iter(&self) -> impl Iterator<Item = &CmtEntry> {
        self.cache.iter().map(|(_, entry)| entry)
    }
}
