//! Address translator (C8): CMT hit/miss/cold-miss resolution.
//!
//! `translate` is the one place a single LPN becomes a PPA. A hit is free
//! (no NAND activity); a miss against an existing translation page costs one
//! NAND read; a miss against a vpn with no translation page yet (a cold
//! miss) allocates one instead of reading it. Either miss path may also have
//! to evict the CMT's LRU tail first, which costs a translation-page
//! write-back if the victim is dirty (I5).

#![warn(missing_docs)]

use dftl_cmt::{Cmt, CmtEntry};
use dftl_directory::{Gtd, Rmap};
use dftl_frontiers::{FrontierKind, WritePointer, advance_write_pointer};
use dftl_geometry::{Geometry, Ppa};
use dftl_lines::{LineError, LineManager};
use dftl_nand_state::{IoClass, NandCmd, NandOpKind, NandState, NandTiming};

/// Errors raised while translating an LPN.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// `lpn` is not within the geometry's logical capacity.
    #[error("lpn {0} is out of range for this geometry")]
    OutOfRangeLpn(u64),
    /// The Translation frontier's line ran out during a cold-miss allocation
    /// or a dirty eviction's write-back.
    #[error(transparent)]
    Line(#[from] LineError),
}

/// Splits an LPN into its translation-page index (`vpn`) and in-page offset.
#[must_use]
pub const fn split_lpn(lpn: u64, map_per_pg: u32) -> (u64, usize) {
    (lpn / map_per_pg as u64, (lpn % map_per_pg as u64) as usize)
}

/// The result of resolving one LPN: the PPA it currently maps to, the time
/// the lookup is logically complete, and how many NAND writes the lookup
/// itself performed (a dirty CMT eviction's write-back; 0 on a plain hit,
/// cold miss, or clean eviction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOutcome {
    /// The data (or translation) page `lpn` currently resolves to; may be
    /// [`Ppa::UNMAPPED`] for an LPN never written.
    pub ppa: Ppa,
    /// The timestamp at which this lookup's result is valid.
    pub completion_time: u64,
    /// NAND writes performed as a side effect of this lookup (dirty-eviction
    /// write-back), not counting the caller's own subsequent data write.
    pub nand_writes_performed: u32,
}

/// Bundles the mutable collaborators a single `translate` call needs, so
/// call sites don't thread six separate `&mut` parameters through the I/O
/// pipeline — the same context-struct idiom the line manager's own callers
/// use to pair a `LineManager` with the `Geometry` it was built from.
pub struct TranslateCtx<'a> {
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
    /// The Translation frontier, used for cold-miss creation and for
    /// dirty-eviction write-back.
    pub translation_wp: &'a mut WritePointer,
    /// The external NAND timing oracle.
    pub timing: &'a mut dyn NandTiming,
}

/// Resolves `lpn` to its current PPA as of `start_time`.
///
/// # Errors
/// [`TranslateError::OutOfRangeLpn`] if `lpn` exceeds the geometry's logical
/// capacity; [`TranslateError::Line`] if the Translation frontier's free
/// list is exhausted mid-allocation (a GC/credit bug, not a routine
/// condition — see `spec.md` §7).
pub fn translate(
    ctx: &mut TranslateCtx<'_>,
    lpn: u64,
    start_time: u64,
) -> Result<TranslateOutcome, TranslateError> {
    if !ctx.geometry.valid_lpn(lpn) {
        return Err(TranslateError::OutOfRangeLpn(lpn));
    }
    let map_per_pg = ctx.geometry.map_per_pg();
    let (vpn, off) = split_lpn(lpn, map_per_pg);

    if let Some(entry) = ctx.cmt.touch(vpn) {
        ctx.cmt.record_hit();
        return Ok(TranslateOutcome {
            ppa: entry.l2p()[off],
            completion_time: start_time,
            nand_writes_performed: 0,
        });
    }
    ctx.cmt.record_miss();

    let existing_tr = ctx.gtd.get(vpn);
    let (tr_l2p, completion_time) = if existing_tr.is_unmapped() {
        ctx.cmt.record_cold_miss();
        (create_translation_page(ctx, vpn, map_per_pg)?, start_time)
    } else {
        let pgidx = ctx
            .geometry
            .ppa_to_pgidx(existing_tr)
            .expect("gtd only ever holds valid ppas");
        let completion = ctx.timing.advance_nand(NandCmd {
            io_class: IoClass::Translation,
            op: NandOpKind::Read,
            stime: start_time,
            xfer_size: u64::from(ctx.geometry.pgsz()),
            ppa: existing_tr,
            interleave_pci_dma: true,
        });
        let l2p = ctx
            .nand
            .page(pgidx)
            .l2p()
            .expect("gtd entries always reference a live translation page")
            .to_vec();
        (l2p, completion)
    };

    let ppa = tr_l2p[off];
    let mut nand_writes_performed = 0;
    if ctx.cmt.is_full() {
        let victim = ctx
            .cmt
            .evict_lru()
            .expect("is_full implies at least one resident entry");
        if victim.dirty() {
            writeback_dirty_victim(ctx, victim, completion_time)?;
            ctx.cmt.record_flush();
            nand_writes_performed += 1;
        }
    }
    ctx.cmt.insert(CmtEntry::new(vpn, tr_l2p));

    Ok(TranslateOutcome {
        ppa,
        completion_time,
        nand_writes_performed,
    })
}

/// Allocates a translation PPA from the Translation frontier and installs a
/// fresh all-[`Ppa::UNMAPPED`] L2P array on it — the cold-miss path of
/// `translate`'s step 3a.
fn create_translation_page(
    ctx: &mut TranslateCtx<'_>,
    vpn: u64,
    map_per_pg: u32,
) -> Result<Vec<Ppa>, TranslateError> {
    debug_assert!(matches!(ctx.translation_wp.kind(), FrontierKind::Translation));

    let new_tr_ppa = ctx.translation_wp.get_new_page();
    let new_tr_pgidx = ctx
        .geometry
        .ppa_to_pgidx(new_tr_ppa)
        .expect("translation frontier always yields an in-range ppa");
    let fresh_l2p = vec![Ppa::UNMAPPED; map_per_pg as usize];

    let installed = ctx
        .nand
        .mark_page_valid(new_tr_pgidx, true, Some(fresh_l2p.clone()));
    debug_assert!(installed.is_ok(), "translation frontier only allocates Free pages");

    ctx.rmap.set(new_tr_pgidx, vpn);
    ctx.gtd.set(vpn, new_tr_ppa);
    ctx.lines.validate_one(new_tr_ppa.blk());

    advance_write_pointer(ctx.translation_wp, ctx.geometry, ctx.lines)?;
    log::trace!("cold miss for vpn {vpn}: created translation page at {new_tr_ppa:?}");
    Ok(fresh_l2p)
}

/// Writes a dirty CMT victim's L2P back to a fresh translation page,
/// invalidating its predecessor and updating the GTD/RMAP for its vpn — the
/// inner branch of `translate`'s step 3c.
fn writeback_dirty_victim(
    ctx: &mut TranslateCtx<'_>,
    victim: CmtEntry,
    stime: u64,
) -> Result<(), TranslateError> {
    let vpn = victim.vpn();
    let old_tr_ppa = ctx.gtd.get(vpn);
    let old_tr_pgidx = ctx
        .geometry
        .ppa_to_pgidx(old_tr_ppa)
        .expect("a dirty cmt entry always has a live predecessor translation page");

    let invalidated = ctx.nand.mark_page_invalid(old_tr_pgidx);
    debug_assert!(invalidated.is_ok(), "predecessor translation page was Valid while cached");
    ctx.rmap.clear(old_tr_pgidx);
    ctx.lines.invalidate_one(old_tr_ppa.blk());

    let new_tr_ppa = ctx.translation_wp.get_new_page();
    let new_tr_pgidx = ctx
        .geometry
        .ppa_to_pgidx(new_tr_ppa)
        .expect("translation frontier always yields an in-range ppa");
    let at_boundary = ctx.translation_wp.is_wordline_boundary(ctx.geometry);

    let installed = ctx
        .nand
        .mark_page_valid(new_tr_pgidx, true, Some(victim.into_l2p()));
    debug_assert!(installed.is_ok(), "translation frontier only allocates Free pages");
    ctx.rmap.set(new_tr_pgidx, vpn);
    ctx.gtd.set(vpn, new_tr_ppa);
    ctx.lines.validate_one(new_tr_ppa.blk());

    let (op, xfer_size) = if at_boundary {
        (
            NandOpKind::Write,
            u64::from(ctx.geometry.pgsz()) * u64::from(ctx.geometry.pgs_per_oneshotpg()),
        )
    } else {
        (NandOpKind::Nop, 0)
    };
    ctx.timing.advance_nand(NandCmd {
        io_class: IoClass::Translation,
        op,
        stime,
        xfer_size,
        ppa: new_tr_ppa,
        interleave_pci_dma: false,
    });

    advance_write_pointer(ctx.translation_wp, ctx.geometry, ctx.lines)?;
    log::trace!("evicted dirty cmt entry for vpn {vpn}: wrote back to {new_tr_ppa:?}");
    Ok(())
}
