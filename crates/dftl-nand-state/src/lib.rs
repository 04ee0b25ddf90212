//! Per-page NAND status mirror.
//!
//! Tracks, for every physical page in the device, whether it is free, holds
//! valid data, or has been invalidated — plus, for pages that hold a
//! translation-page payload, the owned L2P array itself. This is the only
//! place an L2P array lives outside the CMT; ownership moves here and back
//! exactly once per relocation (see [`Page::take_l2p`]).

#![warn(missing_docs)]

use dftl_geometry::{Geometry, Ppa};
use thiserror::Error;

/// Traffic-class tag attached to a scheduled NAND command, for the external
/// timing oracle's own per-class bookkeeping — this crate's page bookkeeping
/// doesn't read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoClass {
    /// Host-originated reads/writes.
    User,
    /// GC relocation of data pages.
    Gc,
    /// Demand-paged translation-page creation and CMT eviction writeback.
    Translation,
    /// GC relocation of translation pages.
    TranslationGc,
    /// Wear-leveling cold-data migration copies.
    Wl,
}

/// Which NAND-level operation a [`NandCmd`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NandOpKind {
    /// A page (or run of pages) read.
    Read,
    /// A oneshot (wordline) program.
    Write,
    /// No NAND activity — folded into a later `Write` at the same wordline.
    Nop,
    /// A block erase.
    Erase,
}

/// One scheduled NAND operation, handed to the external timing oracle.
///
/// Mirrors the original's `struct nand_cmd`: this crate and its callers only
/// ever *build* one of these and hand it to a [`NandTiming`] implementation
/// to learn a completion timestamp — the actual latency math lives entirely
/// outside this workspace (`SPEC_FULL.md` §0, external collaborators).
#[derive(Debug, Clone, Copy)]
pub struct NandCmd {
    /// Traffic-class tag, for the oracle's own telemetry.
    pub io_class: IoClass,
    /// The NAND-level operation.
    pub op: NandOpKind,
    /// Start timestamp.
    pub stime: u64,
    /// Transfer size in bytes (ignored for `Nop`/`Erase`).
    pub xfer_size: u64,
    /// The page (or block, for `Erase`) this command targets.
    pub ppa: Ppa,
    /// Whether this command may overlap PCIe DMA with NAND array access.
    pub interleave_pci_dma: bool,
}

/// The external NAND timing simulator (`advance_nand`), consumed as an
/// opaque latency oracle parameterized by op kind, transfer size, and start
/// time (spec.md §1). Implemented outside this workspace by the virtual
/// NVMe device's NAND model; `dftl-sim` provides a minimal stand-in for
/// scenario exercises.
pub trait NandTiming {
    /// Schedules `cmd` against the NAND array and returns its completion
    /// timestamp.
    fn advance_nand(&mut self, cmd: NandCmd) -> u64;

    /// The timestamp at which every channel this oracle knows about is next
    /// idle — the external `next_idle_time(ssd)` collaborator (spec.md §6),
    /// consumed by `dftl-core`'s `Flush` handler.
    fn next_idle_time(&self) -> u64;
}

/// The lifecycle state of one physical page (I6).
///
/// Legal transitions are `Free -> Valid` ([`NandState::mark_page_valid`]),
/// `Valid -> Invalid` ([`NandState::mark_page_invalid`]), and
/// `Invalid -> Free` ([`NandState::mark_block_free`]). Any other transition
/// is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageStatus {
    /// Erased and unwritten.
    #[default]
    Free,
    /// Holds live data (or, if `translation`, a live L2P array).
    Valid,
    /// Superseded; space is reclaimed at the next block erase.
    Invalid,
}

/// Errors raised by an illegal page-status transition (I6).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Attempted `mark_page_valid` on a page that wasn't `Free`.
    #[error("page {pgidx} is {from:?}, cannot mark valid (must be Free)")]
    NotFree {
        /// Flat page index.
        pgidx: u64,
        /// The page's actual status.
        from: PageStatus,
    },
    /// Attempted `mark_page_invalid` on a page that wasn't `Valid`.
    #[error("page {pgidx} is {from:?}, cannot mark invalid (must be Valid)")]
    NotValid {
        /// Flat page index.
        pgidx: u64,
        /// The page's actual status.
        from: PageStatus,
    },
}

/// One physical page's status, traffic-class tag, and (if a valid
/// translation page) its owned L2P array.
#[derive(Debug, Clone, Default)]
pub struct Page {
    status: PageStatus,
    translation: bool,
    l2p: Option<Vec<Ppa>>,
}

impl Page {
    /// The page's current status.
    #[must_use]
    pub const fn status(&self) -> PageStatus {
        self.status
    }

    /// Whether this page was written as a translation page.
    #[must_use]
    pub const fn is_translation(&self) -> bool {
        self.translation
    }

    /// Borrows the L2P array, if this is a valid translation page.
    #[must_use]
    pub fn l2p(&self) -> Option<&[Ppa]> {
        self.l2p.as_deref()
    }

    /// Mutably borrows the L2P array, if this is a valid translation page.
    pub fn l2p_mut(&mut self) -> Option<&mut [Ppa]> {
        self.l2p.as_deref_mut()
    }

    /// Takes ownership of the L2P array out of this page, leaving `None` behind.
    ///
    /// Used when relocating a translation page's payload to its successor
    /// without ever holding two live copies (see `SPEC_FULL.md` §3 on L2P
    /// ownership).
    pub fn take_l2p(&mut self) -> Option<Vec<Ppa>> {
        self.l2p.take()
    }
}

/// The flat, per-page NAND state mirror for one namespace.
#[derive(Debug, Clone)]
pub struct NandState {
    pages: Vec<Page>,
}

impl NandState {
    /// Allocates an all-`Free` state mirror sized to `geometry.tt_pgs()`.
    #[must_use]
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            pages: vec![Page::default(); geometry.tt_pgs() as usize],
        }
    }

    /// Borrows a page by flat index.
    #[must_use]
    pub fn page(&self, pgidx: u64) -> &Page {
        &self.pages[pgidx as usize]
    }

    /// `Free -> Valid`. Sets the translation tag and, if `translation`,
    /// installs `l2p` as the page's owned array.
    ///
    /// # Errors
    /// [`TransitionError::NotFree`] if the page is not currently `Free`.
    pub fn mark_page_valid(
        &mut self,
        pgidx: u64,
        translation: bool,
        l2p: Option<Vec<Ppa>>,
    ) -> Result<(), TransitionError> {
        let page = &mut self.pages[pgidx as usize];
        if page.status != PageStatus::Free {
            return Err(TransitionError::NotFree {
                pgidx,
                from: page.status,
            });
        }
        page.status = PageStatus::Valid;
        page.translation = translation;
        page.l2p = l2p;
        log::trace!("page {pgidx} Free -> Valid (translation={translation})");
        Ok(())
    }

    /// `Valid -> Invalid`. Drops any owned L2P array (the caller must have
    /// already transferred it via [`Page::take_l2p`] if it needed to
    /// survive).
    ///
    /// # Errors
    /// [`TransitionError::NotValid`] if the page is not currently `Valid`.
    pub fn mark_page_invalid(&mut self, pgidx: u64) -> Result<(), TransitionError> {
        let page = &mut self.pages[pgidx as usize];
        if page.status != PageStatus::Valid {
            return Err(TransitionError::NotValid {
                pgidx,
                from: page.status,
            });
        }
        page.status = PageStatus::Invalid;
        page.l2p = None;
        log::trace!("page {pgidx} Valid -> Invalid");
        Ok(())
    }

    /// `Invalid -> Free` for every page in the physical block
    /// `(ch, lun, pl, blk)`. Called once per `(ch, lun, pl)` combination
    /// that makes up a line, at the end of block erase.
    pub fn mark_block_free(&mut self, geometry: &Geometry, ch: u32, lun: u32, pl: u32, blk: u32) {
        for pg in 0..geometry.pgs_per_blk() {
            let ppa = Ppa::from_parts(ch, lun, pl, blk, pg);
            let Some(pgidx) = geometry.ppa_to_pgidx(ppa) else {
                continue;
            };
            let page = &mut self.pages[pgidx as usize];
            page.status = PageStatus::Free;
            page.translation = false;
            page.l2p = None;
        }
        log::trace!("block (ch={ch}, lun={lun}, pl={pl}, blk={blk}) erased");
    }
}
