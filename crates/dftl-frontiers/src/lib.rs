//! The five append-only write-pointer frontiers and their shared advance rule.
//!
//! Every frontier strides over channels then LUNs within its current line
//! (plane is always 0 — nothing in this design uses more than one plane per
//! LUN). When a line fills, [`advance_write_pointer`] closes it into either
//! the full list or the victim PQ, depending on whether overwrites already
//! invalidated some of its pages, and opens a fresh line from the free list.

#![warn(missing_docs)]

use dftl_geometry::{Geometry, Ppa};
use dftl_lines::{LineError, LineId, LineManager};

/// Which traffic class a frontier serves.
///
/// A closed enum in place of the source's integer `io_type` tag, so callers
/// cannot request an undefined frontier (`SPEC_FULL.md` §3, design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierKind {
    /// Host writes.
    UserData,
    /// GC relocation of data pages.
    GcData,
    /// Demand-paged translation-page creation and CMT eviction writeback.
    Translation,
    /// GC relocation of translation pages.
    TranslationGc,
    /// Wear-leveling cold-data migration copies.
    Wl,
}

impl FrontierKind {
    /// Whether lines opened by this frontier should be tagged `translation`.
    #[must_use]
    pub const fn opens_translation_lines(self) -> bool {
        matches!(self, Self::Translation | Self::TranslationGc)
    }
}

/// The next `(ch, lun, pg)` to emit within `curline` for one traffic class.
#[derive(Debug, Clone, Copy)]
pub struct WritePointer {
    kind: FrontierKind,
    curline: LineId,
    ch: u32,
    lun: u32,
    pg: u32,
    pl: u32,
}

impl WritePointer {
    /// Opens a fresh write pointer of `kind`, drawing its first line from the
    /// free list.
    ///
    /// # Errors
    /// [`LineError::NoFreeLine`] if the free list is empty.
    pub fn open(kind: FrontierKind, lines: &mut LineManager) -> Result<Self, LineError> {
        let curline = lines.get_next_free_line()?;
        if kind.opens_translation_lines() {
            lines.set_translation(curline, true);
        }
        Ok(Self {
            kind,
            curline,
            ch: 0,
            lun: 0,
            pg: 0,
            pl: 0,
        })
    }

    /// The frontier's traffic class.
    #[must_use]
    pub const fn kind(self) -> FrontierKind {
        self.kind
    }

    /// The line this frontier is currently writing into.
    #[must_use]
    pub const fn curline(self) -> LineId {
        self.curline
    }

    /// The PPA the next write will land on. Allocation never advances the
    /// pointer by itself — call [`advance_write_pointer`] after each write.
    #[must_use]
    pub const fn get_new_page(self) -> Ppa {
        Ppa::from_parts(self.ch, self.lun, self.pl, self.curline, self.pg)
    }

    /// True if `pg` is the last page of its wordline — the caller should
    /// schedule a oneshot `NAND_WRITE` rather than a `NAND_NOP` for this page.
    #[must_use]
    pub fn is_wordline_boundary(self, geometry: &Geometry) -> bool {
        (self.pg + 1) % geometry.pgs_per_oneshotpg() == 0
    }
}

/// Advances `wp` by one page, closing and reopening its line on rollover.
///
/// Implements the five-step rule from `SPEC_FULL.md` §3 / the original
/// `advance_write_pointer`: bump `pg`; on a wordline boundary roll into the
/// next channel; on exhausting channels roll into the next LUN; on
/// exhausting LUNs the line is fully written — file it as Full (if no
/// overwrite ever touched it) or as a victim (otherwise), then draw a fresh
/// line from the free list.
///
/// # Errors
/// [`LineError::NoFreeLine`] if the line just closed and the free list is empty.
pub fn advance_write_pointer(
    wp: &mut WritePointer,
    geometry: &Geometry,
    lines: &mut LineManager,
) -> Result<(), LineError> {
    wp.pg += 1;
    if wp.pg % geometry.pgs_per_oneshotpg() != 0 {
        return Ok(());
    }

    wp.pg -= geometry.pgs_per_oneshotpg();
    wp.ch += 1;
    if wp.ch < geometry.nchs() {
        return Ok(());
    }

    wp.ch = 0;
    wp.lun += 1;
    if wp.lun < geometry.luns_per_ch() {
        return Ok(());
    }

    wp.lun = 0;
    wp.pg += geometry.pgs_per_oneshotpg();
    if wp.pg < geometry.pgs_per_blk() {
        return Ok(());
    }

    let closed = wp.curline;
    if u64::from(lines.line(closed).vpc()) == geometry.pgs_per_line() {
        lines.insert_full(closed);
    } else {
        lines.insert_victim(closed);
    }
    log::debug!(
        "frontier {:?} closed line {closed} (vpc={})",
        wp.kind,
        lines.line(closed).vpc()
    );

    let fresh = lines.get_next_free_line()?;
    if wp.kind.opens_translation_lines() {
        lines.set_translation(fresh, true);
    }
    wp.curline = fresh;
    wp.pg = 0;
    wp.ch = 0;
    wp.lun = 0;
    wp.pl = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_geometry() -> Geometry {
        Geometry::new(1, 1, 1, 8, 16, 4, 512, 4096, 8).unwrap()
    }

    #[test]
    fn stays_within_line_until_exhausted() {
        let g = seed_geometry();
        let mut lm = LineManager::new(g.tt_lines());
        let mut wp = WritePointer::open(FrontierKind::UserData, &mut lm).unwrap();
        let first_line = wp.curline();

        for _ in 0..g.pgs_per_line() {
            lm.validate_one(wp.curline());
            advance_write_pointer(&mut wp, &g, &mut lm).unwrap();
        }

        assert_ne!(wp.curline(), first_line);
        assert_eq!(lm.full_line_cnt(), 1);
        assert_eq!(lm.victim_line_cnt(), 0);
    }

    #[test]
    fn partially_invalidated_line_becomes_victim_on_close() {
        let g = seed_geometry();
        let mut lm = LineManager::new(g.tt_lines());
        let mut wp = WritePointer::open(FrontierKind::UserData, &mut lm).unwrap();
        let first_line = wp.curline();

        for i in 0..g.pgs_per_line() {
            lm.validate_one(wp.curline());
            if i == 0 {
                lm.invalidate_one(wp.curline());
            }
            advance_write_pointer(&mut wp, &g, &mut lm).unwrap();
        }

        assert_eq!(lm.full_line_cnt(), 0);
        assert_eq!(lm.victim_line_cnt(), 1);
        assert_eq!(lm.peek_victim(), Some(first_line));
    }

    #[test]
    fn translation_frontier_tags_its_lines() {
        let g = seed_geometry();
        let mut lm = LineManager::new(g.tt_lines());
        let wp = WritePointer::open(FrontierKind::Translation, &mut lm).unwrap();
        assert!(lm.line(wp.curline()).is_translation());
    }
}
