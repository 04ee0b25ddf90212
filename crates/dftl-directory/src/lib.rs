//! Reverse map (RMAP) and Global Translation Directory (GTD) — C5/C6.
//!
//! Both are flat, directly indexed tables, the same style the teacher's
//! page-table code uses for its own directory structures: no hashing, no
//! tree — the index *is* the key.

#![warn(missing_docs)]

use dftl_geometry::{Geometry, Ppa};

/// Sentinel for "this physical page currently holds nothing owned by an LPN".
pub const INVALID_LPN: u64 = u64::MAX;

/// `physical_page_index -> LPN` (or [`INVALID_LPN`]).
#[derive(Debug, Clone)]
pub struct Rmap {
    entries: Vec<u64>,
}

impl Rmap {
    /// Builds an all-[`INVALID_LPN`] reverse map sized to `geometry.tt_pgs()`.
    #[must_use]
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            entries: vec![INVALID_LPN; geometry.tt_pgs() as usize],
        }
    }

    /// Reads the LPN owning physical page `pgidx`.
    #[must_use]
    pub fn get(&self, pgidx: u64) -> u64 {
        self.entries[pgidx as usize]
    }

    /// Records that physical page `pgidx` now belongs to `lpn`.
    pub fn set(&mut self, pgidx: u64, lpn: u64) {
        self.entries[pgidx as usize] = lpn;
    }

    /// Clears the owner of physical page `pgidx` (it was just invalidated).
    pub fn clear(&mut self, pgidx: u64) {
        self.entries[pgidx as usize] = INVALID_LPN;
    }
}

/// `vpn -> ppa_of_translation_page`.
#[derive(Debug, Clone)]
pub struct Gtd {
    entries: Vec<Ppa>,
}

impl Gtd {
    /// Builds an all-[`Ppa::UNMAPPED`] directory sized to `geometry.tt_tpgs()`.
    #[must_use]
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            entries: vec![Ppa::UNMAPPED; geometry.tt_tpgs() as usize],
        }
    }

    /// Looks up the translation page currently holding `vpn`'s L2P array.
    #[must_use]
    pub fn get(&self, vpn: u64) -> Ppa {
        self.entries[vpn as usize]
    }

    /// Records that `vpn`'s L2P array now lives at `ppa`.
    pub fn set(&mut self, vpn: u64, ppa: Ppa) {
        self.entries[vpn as usize] = ppa;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_geometry() -> Geometry {
        Geometry::new(1, 1, 1, 8, 16, 4, 512, 4096, 8).unwrap()
    }

    #[test]
    fn rmap_starts_all_invalid() {
        let g = seed_geometry();
        let rmap = Rmap::new(&g);
        assert_eq!(rmap.get(0), INVALID_LPN);
    }

    #[test]
    fn rmap_set_then_clear() {
        let g = seed_geometry();
        let mut rmap = Rmap::new(&g);
        rmap.set(3, 42);
        assert_eq!(rmap.get(3), 42);
        rmap.clear(3);
        assert_eq!(rmap.get(3), INVALID_LPN);
    }

    #[test]
    fn gtd_starts_all_unmapped() {
        let g = seed_geometry();
        let gtd = Gtd::new(&g);
        assert!(gtd.get(0).is_unmapped());
    }

    #[test]
    fn gtd_set_then_get() {
        let g = seed_geometry();
        let mut gtd = Gtd::new(&g);
        let ppa = Ppa::from_parts(0, 0, 0, 2, 5);
        gtd.set(0, ppa);
        assert_eq!(gtd.get(0), ppa);
    }
}
