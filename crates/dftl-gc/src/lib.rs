//! Garbage collection engine (C9): victim selection, per-page relocation,
//! block erase, and line recycling.
//!
//! `do_gc` sweeps a victim line one wordline at a time
//! ([`clean_one_flashpg`]), relocating every still-valid page before the
//! block underneath it is erased. Data pages and translation pages take
//! different relocation paths ([`gc_write_data_page`] /
//! [`gc_write_translation_page`]) because moving a data page also requires
//! updating the translation page that owns its mapping, while moving a
//! translation page is a self-contained copy. A third path
//! ([`wl_relocate_translation_page`]) exists for wear-leveling's cold-data
//! migration, which sweeps a line through the same wordline-by-wordline
//! machinery but must not touch the Translation-GC frontier (see the module
//! docs on `is_wl` below).

#![warn(missing_docs)]

use dftl_cmt::{Cmt, CmtEntry};
use dftl_directory::{Gtd, Rmap};
use dftl_frontiers::{WritePointer, advance_write_pointer};
use dftl_geometry::{Geometry, Ppa};
use dftl_lines::{LineError, LineId, LineManager};
use dftl_nand_state::{IoClass, NandCmd, NandOpKind, NandState, NandTiming, PageStatus};

/// Errors raised while running GC.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// A relocation frontier (GC, Translation-GC, or WL) ran out of free
    /// lines mid-sweep — a write-credit/foreground-GC scheduling bug per
    /// `spec.md` §7, not a routine condition.
    #[error(transparent)]
    Line(#[from] LineError),
}

/// Persistent GC telemetry read by wear leveling's tie-break rule
/// (`SPEC_FULL.md` §2.4: `last_gc_line` prefers the most recently GC-erased
/// line on an `erase_cnt` tie) and surfaced for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcState {
    last_gc_line: Option<LineId>,
    gc_cnt: u64,
}

impl GcState {
    /// The line most recently erased by [`do_gc`], if any.
    #[must_use]
    pub const fn last_gc_line(&self) -> Option<LineId> {
        self.last_gc_line
    }

    /// Total number of completed `do_gc` passes.
    #[must_use]
    pub const fn gc_cnt(&self) -> u64 {
        self.gc_cnt
    }
}

/// Bundles the mutable collaborators one GC pass needs. `wl_wp` is only
/// exercised when a caller passes `is_wl = true`; ordinary foreground/victim
/// GC never touches it.
pub struct GcCtx<'a> {
    /// Immutable device geometry.
    pub geometry: &'a Geometry,
    /// Per-page NAND status mirror.
    pub nand: &'a mut NandState,
    /// Free/full/victim line bookkeeping.
    pub lines: &'a mut LineManager,
    /// `physical_page_index -> LPN`.
    pub rmap: &'a mut Rmap,
    /// `vpn -> ppa_of_translation_page`.
    pub gtd: &'a mut Gtd,
    /// The bounded LRU of resident translation-page L2P arrays.
    pub cmt: &'a mut Cmt,
    /// Supplies relocated data pages' new PPAs during ordinary GC.
    pub gc_wp: &'a mut WritePointer,
    /// Supplies relocated translation pages' new PPAs, for both the
    /// translation-page path and the translation-page half of the
    /// data-page path.
    pub translation_gc_wp: &'a mut WritePointer,
    /// Supplies relocated pages' new PPAs for wear-leveling's cold-data
    /// migration sweep.
    pub wl_wp: &'a mut WritePointer,
    /// The external NAND timing oracle.
    pub timing: &'a mut dyn NandTiming,
}

/// Peeks the victim priority queue and pops it only if eligible.
///
/// Mirrors `select_victim_line`: with `force = false` a victim whose `vpc`
/// exceeds `pgs_per_line / 8` is left in the PQ (not worth cleaning yet);
/// `force = true` (foreground GC, wear-leveling) always takes the min-`vpc`
/// line if one exists.
pub fn select_victim_line(lines: &mut LineManager, geometry: &Geometry, force: bool) -> Option<LineId> {
    let id = lines.peek_victim()?;
    if !force && u64::from(lines.line(id).vpc()) > geometry.pgs_per_line() / 8 {
        return None;
    }
    lines.pop_victim()
}

/// Runs a complete GC pass over `victim`: sweeps every wordline, relocating
/// valid pages, erases each constituent block once its wordlines are clear,
/// and returns the line to the free list.
///
/// `is_wl` routes translation-page relocation through the WL frontier
/// instead of the Translation-GC frontier (see [`wl_relocate_translation_page`]);
/// wear-leveling's cold-data migration is the only caller that sets it.
///
/// # Errors
/// [`GcError::Line`] if a relocation frontier's free list is exhausted
/// mid-sweep.
pub fn do_gc(state: &mut GcState, ctx: &mut GcCtx<'_>, victim: LineId, is_wl: bool) -> Result<(), GcError> {
    state.gc_cnt += 1;
    state.last_gc_line = Some(victim);
    log::debug!(
        "GC-ing line {victim} (vpc={}, ipc={}), victim_pq={}, full={}, free={}",
        ctx.lines.line(victim).vpc(),
        ctx.lines.line(victim).ipc(),
        ctx.lines.victim_line_cnt(),
        ctx.lines.full_line_cnt(),
        ctx.lines.free_line_cnt(),
    );

    let oneshot = ctx.geometry.pgs_per_oneshotpg();
    let flashpgs_per_blk = ctx.geometry.pgs_per_blk() / oneshot;

    for flashpg in 0..flashpgs_per_blk {
        let pg0 = flashpg * oneshot;
        for ch in 0..ctx.geometry.nchs() {
            for lun in 0..ctx.geometry.luns_per_ch() {
                let base = Ppa::from_parts(ch, lun, 0, victim, pg0);
                clean_one_flashpg(ctx, base, is_wl)?;

                if flashpg == flashpgs_per_blk - 1 {
                    ctx.nand.mark_block_free(ctx.geometry, ch, lun, 0, victim);
                    ctx.timing.advance_nand(NandCmd {
                        io_class: if is_wl { IoClass::Wl } else { IoClass::Gc },
                        op: NandOpKind::Erase,
                        stime: 0,
                        xfer_size: 0,
                        ppa: Ppa::from_parts(ch, lun, 0, victim, 0),
                        interleave_pci_dma: false,
                    });
                }
            }
        }
    }

    ctx.lines.mark_line_free(victim);
    Ok(())
}

/// Cleans one wordline's worth of pages at `base` (i.e. `base.pg() ..
/// base.pg() + pgs_per_oneshotpg`): counts still-valid pages, schedules one
/// batched NAND read for all of them, then relocates each in turn.
fn clean_one_flashpg(ctx: &mut GcCtx<'_>, base: Ppa, is_wl: bool) -> Result<(), GcError> {
    let oneshot = ctx.geometry.pgs_per_oneshotpg();
    let page_at = |i: u32| Ppa::from_parts(base.ch().into(), base.lun().into(), base.pl().into(), base.blk(), u32::from(base.pg()) + i);

    let mut cnt = 0u32;
    for i in 0..oneshot {
        let pgidx = ctx.geometry.ppa_to_pgidx(page_at(i)).expect("gc sweeps only in-range pages");
        if ctx.nand.page(pgidx).status() == PageStatus::Valid {
            cnt += 1;
        }
    }
    if cnt == 0 {
        return Ok(());
    }

    ctx.timing.advance_nand(NandCmd {
        io_class: if is_wl { IoClass::Wl } else { IoClass::Gc },
        op: NandOpKind::Read,
        stime: 0,
        xfer_size: u64::from(ctx.geometry.pgsz()) * u64::from(cnt),
        ppa: base,
        interleave_pci_dma: false,
    });

    for i in 0..oneshot {
        let ppa = page_at(i);
        let pgidx = ctx.geometry.ppa_to_pgidx(ppa).expect("gc sweeps only in-range pages");
        if ctx.nand.page(pgidx).status() != PageStatus::Valid {
            continue;
        }
        if ctx.nand.page(pgidx).is_translation() {
            if is_wl {
                wl_relocate_translation_page(ctx, ppa)?;
            } else {
                gc_write_translation_page(ctx, ppa)?;
            }
        } else {
            gc_write_data_page(ctx, ppa, is_wl)?;
        }
    }
    Ok(())
}

/// Schedules a oneshot NAND write at `ppa` if it lands on a wordline
/// boundary, else a `Nop` folded into the later boundary write.
///
/// Takes `geometry`/`timing`/`wp` as disjoint borrows rather than a whole
/// `&mut GcCtx` — `wp` is itself one of `ctx`'s fields at every call site, so
/// bundling it behind a `GcCtx` parameter would alias a field the caller is
/// simultaneously borrowing.
fn schedule_oneshot(geometry: &Geometry, timing: &mut dyn NandTiming, wp: &WritePointer, ppa: Ppa, io_class: IoClass, stime: u64) {
    let at_boundary = wp.is_wordline_boundary(geometry);
    let (op, xfer_size) = if at_boundary {
        (NandOpKind::Write, u64::from(geometry.pgsz()) * u64::from(geometry.pgs_per_oneshotpg()))
    } else {
        (NandOpKind::Nop, 0)
    };
    timing.advance_nand(NandCmd {
        io_class,
        op,
        stime,
        xfer_size,
        ppa,
        interleave_pci_dma: false,
    });
}

/// Relocates a still-valid data page: allocates a fresh data PPA (from the
/// GC frontier, or the WL frontier when `is_wl`) and a fresh translation PPA
/// (always from the Translation-GC frontier, per `spec.md` §9's split-frontier
/// mandate — WL cold-data migration still needs the moved data's L2P entry
/// kept current, it just sources the data-page copy itself from the WL
/// frontier instead of GC's), then materializes the updated L2P either from
/// the resident CMT entry or from the predecessor translation page.
fn gc_write_data_page(ctx: &mut GcCtx<'_>, old_data_ppa: Ppa, is_wl: bool) -> Result<(), GcError> {
    let old_data_pgidx = ctx.geometry.ppa_to_pgidx(old_data_ppa).expect("valid page has an in-range ppa");
    let lpn = ctx.rmap.get(old_data_pgidx);
    let map_per_pg = ctx.geometry.map_per_pg();
    let vpn = lpn / u64::from(map_per_pg);
    let off = (lpn % u64::from(map_per_pg)) as usize;

    let old_tr_ppa = ctx.gtd.get(vpn);
    let old_tr_pgidx = ctx.geometry.ppa_to_pgidx(old_tr_ppa).expect("gtd only ever holds valid ppas");

    // Captured before any invalidation below: `mark_page_invalid` drops the
    // page's owned l2p array, so a cmt-miss must read it out while it's
    // still live on the predecessor translation page.
    let flash_l2p = if ctx.cmt.peek(vpn).is_none() {
        Some(
            ctx.nand
                .page(old_tr_pgidx)
                .l2p()
                .expect("gtd entries always reference a live translation page")
                .to_vec(),
        )
    } else {
        None
    };

    let new_tr_ppa = ctx.translation_gc_wp.get_new_page();
    let new_tr_pgidx = ctx.geometry.ppa_to_pgidx(new_tr_ppa).expect("translation-gc frontier yields in-range ppas");

    ctx.nand.mark_page_invalid(old_tr_pgidx).expect("predecessor translation page was valid");
    ctx.rmap.clear(old_tr_pgidx);
    ctx.lines.invalidate_one(old_tr_ppa.blk());

    let data_wp: &mut WritePointer = if is_wl { ctx.wl_wp } else { ctx.gc_wp };
    let new_data_ppa = data_wp.get_new_page();
    let new_data_pgidx = ctx.geometry.ppa_to_pgidx(new_data_ppa).expect("gc/wl frontier yields in-range ppas");

    ctx.nand.mark_page_invalid(old_data_pgidx).expect("caller only relocates valid pages");
    ctx.rmap.clear(old_data_pgidx);
    ctx.lines.invalidate_one(old_data_ppa.blk());

    ctx.rmap.set(new_data_pgidx, lpn);
    ctx.nand
        .mark_page_valid(new_data_pgidx, false, None)
        .expect("gc/wl frontier only allocates free pages");
    ctx.lines.validate_one(new_data_ppa.blk());

    let new_l2p = if let Some(entry) = ctx.cmt.peek_mut(vpn) {
        entry.l2p_mut()[off] = new_data_ppa;
        entry.clear_dirty();
        entry.l2p().to_vec()
    } else {
        let mut l2p = flash_l2p.expect("captured above when the cmt had no resident entry");
        l2p[off] = new_data_ppa;
        l2p
    };

    ctx.nand
        .mark_page_valid(new_tr_pgidx, true, Some(new_l2p))
        .expect("translation-gc frontier only allocates free pages");
    ctx.rmap.set(new_tr_pgidx, vpn);
    ctx.gtd.set(vpn, new_tr_ppa);
    ctx.lines.validate_one(new_tr_ppa.blk());

    schedule_oneshot(ctx.geometry, ctx.timing, ctx.translation_gc_wp, new_tr_ppa, IoClass::TranslationGc, 0);
    schedule_oneshot(
        ctx.geometry,
        ctx.timing,
        data_wp,
        new_data_ppa,
        if is_wl { IoClass::Wl } else { IoClass::Gc },
        0,
    );

    advance_write_pointer(ctx.translation_gc_wp, ctx.geometry, ctx.lines)?;
    let data_wp: &mut WritePointer = if is_wl { ctx.wl_wp } else { ctx.gc_wp };
    advance_write_pointer(data_wp, ctx.geometry, ctx.lines)?;

    log::trace!("gc relocated data page {old_data_ppa:?} -> {new_data_ppa:?} (lpn {lpn})");
    Ok(())
}

/// Relocates a still-valid translation page via the Translation-GC frontier:
/// the ordinary GC path (not a WL copy).
fn gc_write_translation_page(ctx: &mut GcCtx<'_>, old_tr_ppa: Ppa) -> Result<(), GcError> {
    relocate_translation_page(ctx, old_tr_ppa, Frontier::TranslationGc)
}

/// Relocates a still-valid translation page via the WL frontier instead of
/// the Translation-GC frontier.
///
/// `spec.md` §4.6/§9 mandates that wear-leveling's cold-data migration moves
/// translation pages "without the special translation-GC codepath" — they
/// are carried across as a plain copy on the WL frontier, the same
/// relocation shape [`gc_write_translation_page`] uses, just sourced from a
/// different frontier so a WL pass never competes with ordinary GC for
/// Translation-GC capacity.
pub fn wl_relocate_translation_page(ctx: &mut GcCtx<'_>, old_tr_ppa: Ppa) -> Result<(), GcError> {
    relocate_translation_page(ctx, old_tr_ppa, Frontier::Wl)
}

#[derive(Clone, Copy)]
enum Frontier {
    TranslationGc,
    Wl,
}

impl Frontier {
    const fn io_class(self) -> IoClass {
        match self {
            Self::TranslationGc => IoClass::TranslationGc,
            Self::Wl => IoClass::Wl,
        }
    }
}

fn relocate_translation_page(ctx: &mut GcCtx<'_>, old_tr_ppa: Ppa, frontier: Frontier) -> Result<(), GcError> {
    let old_tr_pgidx = ctx.geometry.ppa_to_pgidx(old_tr_ppa).expect("valid page has an in-range ppa");
    let vpn = ctx.rmap.get(old_tr_pgidx);

    let new_tr_ppa = match frontier {
        Frontier::TranslationGc => ctx.translation_gc_wp.get_new_page(),
        Frontier::Wl => ctx.wl_wp.get_new_page(),
    };
    let new_tr_pgidx = ctx.geometry.ppa_to_pgidx(new_tr_ppa).expect("frontier yields in-range ppas");

    let l2p = if let Some(entry) = ctx.cmt.peek_mut(vpn) {
        entry.clear_dirty();
        entry.l2p().to_vec()
    } else {
        ctx.nand
            .page(old_tr_pgidx)
            .l2p()
            .expect("a translation page always carries its l2p while valid")
            .to_vec()
    };

    ctx.nand.mark_page_invalid(old_tr_pgidx).expect("caller only relocates valid pages");
    ctx.rmap.clear(old_tr_pgidx);
    ctx.lines.invalidate_one(old_tr_ppa.blk());

    ctx.nand
        .mark_page_valid(new_tr_pgidx, true, Some(l2p))
        .expect("frontier only allocates free pages");
    ctx.rmap.set(new_tr_pgidx, vpn);
    ctx.gtd.set(vpn, new_tr_ppa);
    ctx.lines.validate_one(new_tr_ppa.blk());

    match frontier {
        Frontier::TranslationGc => {
            schedule_oneshot(ctx.geometry, ctx.timing, ctx.translation_gc_wp, new_tr_ppa, frontier.io_class(), 0);
            advance_write_pointer(ctx.translation_gc_wp, ctx.geometry, ctx.lines)?;
        }
        Frontier::Wl => {
            schedule_oneshot(ctx.geometry, ctx.timing, ctx.wl_wp, new_tr_ppa, frontier.io_class(), 0);
            advance_write_pointer(ctx.wl_wp, ctx.geometry, ctx.lines)?;
        }
    }

    log::trace!("relocated translation page {old_tr_ppa:?} -> {new_tr_ppa:?} (vpn {vpn})");
    Ok(())
}

/// True if `a` and `b` address the same wordline of the same block — the
/// unit [`clean_one_flashpg`] relocates as a batch, and the same notion the
/// I/O pipeline uses to coalesce contiguous reads (`spec.md` §4.7).
#[must_use]
pub fn is_same_flash_page(geometry: &Geometry, a: Ppa, b: Ppa) -> bool {
    a.blk() == b.blk()
        && u32::from(a.pg()) / geometry.pgs_per_oneshotpg() == u32::from(b.pg()) / geometry.pgs_per_oneshotpg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dftl_frontiers::FrontierKind;

    struct FixedTiming;
    impl NandTiming for FixedTiming {
        fn advance_nand(&mut self, cmd: NandCmd) -> u64 {
            cmd.stime
        }

        fn next_idle_time(&self) -> u64 {
            0
        }
    }

    fn seed_geometry() -> Geometry {
        // map_per_pg small enough that a handful of LPNs span several vpns;
        // several wordlines per block so `do_gc`'s flashpg sweep loops more
        // than once.
        Geometry::new(1, 1, 1, 8, 16, 4, 4, 2048, 4).unwrap()
    }

    struct Harness {
        geometry: Geometry,
        nand: NandState,
        lines: LineManager,
        rmap: Rmap,
        gtd: Gtd,
        cmt: Cmt,
        user_wp: WritePointer,
        gc_wp: WritePointer,
        translation_wp: WritePointer,
        translation_gc_wp: WritePointer,
        wl_wp: WritePointer,
        timing: FixedTiming,
    }

    impl Harness {
        fn new() -> Self {
            let geometry = seed_geometry();
            let nand = NandState::new(&geometry);
            let mut lines = LineManager::new(geometry.tt_lines());
            let user_wp = WritePointer::open(FrontierKind::UserData, &mut lines).unwrap();
            let gc_wp = WritePointer::open(FrontierKind::GcData, &mut lines).unwrap();
            let translation_wp = WritePointer::open(FrontierKind::Translation, &mut lines).unwrap();
            let translation_gc_wp = WritePointer::open(FrontierKind::TranslationGc, &mut lines).unwrap();
            let wl_wp = WritePointer::open(FrontierKind::Wl, &mut lines).unwrap();
            Self {
                geometry,
                nand,
                lines,
                rmap: Rmap::new(&geometry),
                gtd: Gtd::new(&geometry),
                cmt: Cmt::new(4),
                user_wp,
                gc_wp,
                translation_wp,
                translation_gc_wp,
                wl_wp,
                timing: FixedTiming,
            }
        }

        fn ctx(&mut self) -> GcCtx<'_> {
            GcCtx {
                geometry: &self.geometry,
                nand: &mut self.nand,
                lines: &mut self.lines,
                rmap: &mut self.rmap,
                gtd: &mut self.gtd,
                cmt: &mut self.cmt,
                gc_wp: &mut self.gc_wp,
                translation_gc_wp: &mut self.translation_gc_wp,
                wl_wp: &mut self.wl_wp,
                timing: &mut self.timing,
            }
        }

        /// Writes one LPN through the user frontier, creating a cold-miss
        /// translation page and a data page, the way `dftl-core`'s write
        /// path will once it exists.
        fn write_lpn(&mut self, lpn: u64) -> Ppa {
            let map_per_pg = self.geometry.map_per_pg();
            let vpn = lpn / u64::from(map_per_pg);
            let off = (lpn % u64::from(map_per_pg)) as usize;

            if self.gtd.get(vpn).is_unmapped() {
                let tr_ppa = self.translation_wp.get_new_page();
                let tr_pgidx = self.geometry.ppa_to_pgidx(tr_ppa).unwrap();
                let l2p = vec![Ppa::UNMAPPED; map_per_pg as usize];
                self.nand.mark_page_valid(tr_pgidx, true, Some(l2p)).unwrap();
                self.rmap.set(tr_pgidx, vpn);
                self.gtd.set(vpn, tr_ppa);
                self.lines.validate_one(tr_ppa.blk());
                advance_write_pointer(&mut self.translation_wp, &self.geometry, &mut self.lines).unwrap();
            }
            if self.cmt.peek(vpn).is_none() {
                let tr_ppa = self.gtd.get(vpn);
                let tr_pgidx = self.geometry.ppa_to_pgidx(tr_ppa).unwrap();
                let l2p = self.nand.page(tr_pgidx).l2p().unwrap().to_vec();
                self.cmt.insert(CmtEntry::new(vpn, l2p));
            }

            let new_ppa = self.user_wp.get_new_page();
            let new_pgidx = self.geometry.ppa_to_pgidx(new_ppa).unwrap();
            self.nand.mark_page_valid(new_pgidx, false, None).unwrap();
            self.rmap.set(new_pgidx, lpn);
            self.lines.validate_one(new_ppa.blk());
            self.cmt.touch_mut(vpn).unwrap().l2p_mut()[off] = new_ppa;
            self.cmt.touch_mut(vpn).unwrap().mark_dirty();
            advance_write_pointer(&mut self.user_wp, &self.geometry, &mut self.lines).unwrap();
            new_ppa
        }
    }

    #[test]
    fn gc_preserves_translation_after_relocation() {
        let mut h = Harness::new();
        let line = h.user_wp.curline();
        for lpn in 0..h.geometry.pgs_per_line() {
            h.write_lpn(lpn);
        }
        // line is now full and sitting in the full list; move it to the
        // victim pq (as if a later overwrite had invalidated one of its
        // pages) and force-select it regardless of its vpc/pgs_per_line ratio.
        h.lines.remove_full(line);
        h.lines.insert_victim(line);
        let victim = select_victim_line(&mut h.lines, &h.geometry, true).unwrap();
        assert_eq!(victim, line);

        let mut state = GcState::default();
        do_gc(&mut state, &mut h.ctx(), line, false).unwrap();

        assert_eq!(state.last_gc_line(), Some(line));
        assert_eq!(h.lines.line(line).vpc(), 0);
        assert_eq!(h.lines.line(line).ipc(), 0);
        assert!(h.lines.free_line_cnt() >= 1);

        // every relocated lpn must still resolve through the cmt/gtd chain.
        for lpn in 0..h.geometry.pgs_per_line() {
            let vpn = lpn / u64::from(h.geometry.map_per_pg());
            let off = (lpn % u64::from(h.geometry.map_per_pg())) as usize;
            let ppa = if let Some(entry) = h.cmt.peek(vpn) {
                entry.l2p()[off]
            } else {
                let tr_ppa = h.gtd.get(vpn);
                let tr_pgidx = h.geometry.ppa_to_pgidx(tr_ppa).unwrap();
                h.nand.page(tr_pgidx).l2p().unwrap()[off]
            };
            assert!(!ppa.is_unmapped(), "lpn {lpn} lost its mapping after gc");
            let pgidx = h.geometry.ppa_to_pgidx(ppa).unwrap();
            assert_eq!(h.nand.page(pgidx).status(), PageStatus::Valid);
        }
    }

    #[test]
    fn select_victim_refuses_low_value_line_unless_forced() {
        let mut h = Harness::new();
        let line = h.user_wp.curline();
        h.lines.set_counts(line, h.geometry.pgs_per_line() as u32, 0);
        h.lines.insert_victim(line);
        assert_eq!(select_victim_line(&mut h.lines, &h.geometry, false), None);
        assert_eq!(select_victim_line(&mut h.lines, &h.geometry, true), Some(line));
    }

    #[test]
    fn is_same_flash_page_groups_by_wordline() {
        let g = seed_geometry();
        let a = Ppa::from_parts(0, 0, 0, 0, 0);
        let b = Ppa::from_parts(0, 0, 0, 0, 3);
        let c = Ppa::from_parts(0, 0, 0, 0, 4);
        assert!(is_same_flash_page(&g, a, b));
        assert!(!is_same_flash_page(&g, a, c));
    }
}
