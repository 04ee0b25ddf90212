//! One partition's complete FTL state: NAND mirror, line manager, directory,
//! CMT, the five write pointers, and the GC/WL telemetry that rides along
//! with them.
//!
//! Fields are `pub(super)` rather than hidden behind accessor methods
//! because every caller needs to borrow several of them *disjointly* and
//! *simultaneously* (e.g. every field but `gc_state` to build a [`dftl_gc::GcCtx`],
//! while `gc_state` itself is borrowed alongside it) — a `&mut self` accessor
//! method would collapse that into one opaque whole-struct borrow and make
//! that impossible. Borrowing `inst.field` directly at each call site keeps
//! the borrows visibly disjoint to the compiler.

use dftl_cmt::Cmt;
use dftl_directory::{Gtd, Rmap};
use dftl_frontiers::{FrontierKind, WritePointer};
use dftl_gc::{GcCtx, GcState};
use dftl_geometry::Geometry;
use dftl_lines::{LineError, LineId, LineManager};
use dftl_nand_state::{NandState, NandTiming};
use dftl_translate::TranslateCtx;
use dftl_wl::WlStats;

/// One partition's full translation/GC/WL state.
#[derive(Debug)]
pub(crate) struct DftlInstance {
    pub(crate) nand: NandState,
    pub(crate) lines: LineManager,
    pub(crate) rmap: Rmap,
    pub(crate) gtd: Gtd,
    pub(crate) cmt: Cmt,
    pub(crate) user_wp: WritePointer,
    pub(crate) gc_wp: WritePointer,
    pub(crate) translation_wp: WritePointer,
    pub(crate) translation_gc_wp: WritePointer,
    pub(crate) wl_wp: WritePointer,
    pub(crate) gc_state: GcState,
    pub(crate) wl_stats: WlStats,
    /// Decremented per allocated data/translation page; on reaching zero,
    /// foreground GC runs and refills it to `pgs_per_line` (spec.md §4.5).
    pub(crate) write_credit: u64,
}

impl DftlInstance {
    /// Builds one partition's state: an all-`Free` NAND mirror, a fresh line
    /// manager, and the five write pointers each opened from the free list.
    ///
    /// # Errors
    /// [`LineError::NoFreeLine`] if `geometry.tt_lines()` is smaller than 5.
    pub(crate) fn new(geometry: &Geometry, cmt_capacity: u64) -> Result<Self, LineError> {
        let nand = NandState::new(geometry);
        let mut lines = LineManager::new(geometry.tt_lines());
        let user_wp = WritePointer::open(FrontierKind::UserData, &mut lines)?;
        let gc_wp = WritePointer::open(FrontierKind::GcData, &mut lines)?;
        let translation_wp = WritePointer::open(FrontierKind::Translation, &mut lines)?;
        let translation_gc_wp = WritePointer::open(FrontierKind::TranslationGc, &mut lines)?;
        let wl_wp = WritePointer::open(FrontierKind::Wl, &mut lines)?;
        Ok(Self {
            nand,
            lines,
            rmap: Rmap::new(geometry),
            gtd: Gtd::new(geometry),
            cmt: Cmt::new(cmt_capacity),
            user_wp,
            gc_wp,
            translation_wp,
            translation_gc_wp,
            wl_wp,
            gc_state: GcState::default(),
            wl_stats: WlStats::default(),
            write_credit: geometry.pgs_per_line(),
        })
    }

    /// Number of free lines remaining (`should_gc_high`'s input).
    pub(crate) fn free_line_cnt(&self) -> usize {
        self.lines.free_line_cnt()
    }

    /// The five frontiers' current lines — excluded from wear-leveling's
    /// cold-data migration candidacy (spec.md §4.6: a migration candidate
    /// must not be any frontier's `curline`).
    pub(crate) fn excluded_lines(&self) -> [LineId; 5] {
        [
            self.user_wp.curline(),
            self.gc_wp.curline(),
            self.translation_wp.curline(),
            self.translation_gc_wp.curline(),
            self.wl_wp.curline(),
        ]
    }

    /// Spends `amount` write credit; returns `true` once it reaches zero
    /// (the caller must then run foreground GC and refill).
    pub(crate) fn spend_credit(&mut self, amount: u64) -> bool {
        self.write_credit = self.write_credit.saturating_sub(amount);
        self.write_credit == 0
    }

    /// Refills write credit to one line's worth of pages, the amount
    /// `check_and_refill_write_credit` restores after a foreground GC pass.
    pub(crate) fn refill_credit(&mut self, geometry: &Geometry) {
        self.write_credit = geometry.pgs_per_line();
    }
}

/// Builds a [`TranslateCtx`] from an instance's individual fields.
///
/// A free function, not a `&mut self` method: see the module docs on why
/// the borrow must stay expressed as disjoint field paths off `inst`.
pub(crate) fn build_translate_ctx<'a>(
    geometry: &'a Geometry,
    inst: &'a mut DftlInstance,
    timing: &'a mut dyn NandTiming,
) -> TranslateCtx<'a> {
    TranslateCtx {
        geometry,
        nand: &mut inst.nand,
        lines: &mut inst.lines,
        rmap: &mut inst.rmap,
        gtd: &mut inst.gtd,
        cmt: &mut inst.cmt,
        translation_wp: &mut inst.translation_wp,
        timing,
    }
}

/// Builds a [`GcCtx`] from individual field references, leaving `gc_state`
/// (and, for WL callers, `wl_stats`) free to be borrowed alongside it by the
/// caller. See the module docs for why this takes loose fields instead of
/// `&mut DftlInstance`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_gc_ctx<'a>(
    geometry: &'a Geometry,
    nand: &'a mut NandState,
    lines: &'a mut LineManager,
    rmap: &'a mut Rmap,
    gtd: &'a mut Gtd,
    cmt: &'a mut Cmt,
    gc_wp: &'a mut WritePointer,
    translation_gc_wp: &'a mut WritePointer,
    wl_wp: &'a mut WritePointer,
    timing: &'a mut dyn NandTiming,
) -> GcCtx<'a> {
    GcCtx {
        geometry,
        nand,
        lines,
        rmap,
        gtd,
        cmt,
        gc_wp,
        translation_gc_wp,
        wl_wp,
        timing,
    }
}

/// Runs up to `k` foreground-GC iterations over `inst`, each popping the
/// min-`vpc` victim (forced, ignoring the `pgs_per_line / 8` threshold) and
/// fully cleaning it, then refills write credit regardless of how many
/// iterations actually found a victim (spec.md §4.5).
///
/// # Errors
/// [`dftl_gc::GcError`] if a relocation frontier's free list is exhausted mid-sweep.
pub(crate) fn foreground_gc(
    inst: &mut DftlInstance,
    geometry: &Geometry,
    timing: &mut dyn NandTiming,
    k: u32,
) -> Result<(), dftl_gc::GcError> {
    for _ in 0..k {
        let Some(victim) = dftl_gc::select_victim_line(&mut inst.lines, geometry, true) else {
            break;
        };
        let mut ctx = build_gc_ctx(
            geometry,
            &mut inst.nand,
            &mut inst.lines,
            &mut inst.rmap,
            &mut inst.gtd,
            &mut inst.cmt,
            &mut inst.gc_wp,
            &mut inst.translation_gc_wp,
            &mut inst.wl_wp,
            timing,
        );
        dftl_gc::do_gc(&mut inst.gc_state, &mut ctx, victim, false)?;
    }
    inst.refill_credit(geometry);
    Ok(())
}
