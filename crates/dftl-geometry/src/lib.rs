//! Device geometry and the packed physical page address ([`Ppa`]) type.
//!
//! ```text
//!   channel 0 ──┬── lun 0 ──┬── plane 0 ──┬── block 0 ── page 0..pgs_per_blk
//!               │           │             └── block 1 ── ...
//!               │           └── plane 1 ── ...
//!               └── lun 1 ── ...
//! ```
//!
//! A [`Ppa`] addresses one leaf page. [`Geometry`] holds the tree shape and
//! the strides needed to fold a `(ch, lun, pl, blk, pg)` tuple into a single
//! flat page index, per [`Geometry::ppa_to_pgidx`].

#![warn(missing_docs)]

use bitfield_struct::bitfield;
use thiserror::Error;

/// Errors raised while constructing or validating a [`Geometry`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// One of the tree-shape parameters (channels, luns, planes, blocks, pages) was zero.
    #[error("geometry parameter `{0}` must be nonzero")]
    ZeroParameter(&'static str),
    /// `pgs_per_oneshotpg` must evenly divide `pgs_per_blk` so wordline rollover is exact.
    #[error("pgs_per_oneshotpg ({oneshot}) must evenly divide pgs_per_blk ({pgs_per_blk})")]
    OneshotDoesNotDivideBlock {
        /// Configured wordline width, in pages.
        oneshot: u32,
        /// Configured block height, in pages.
        pgs_per_blk: u32,
    },
}

/// Immutable device geometry, plus the strides derived from it.
///
/// `Geometry` is validated once at construction time and is `Copy`; every
/// other component borrows or copies it rather than re-deriving the strides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    nchs: u32,
    luns_per_ch: u32,
    pls_per_lun: u32,
    blks_per_pl: u32,
    pgs_per_blk: u32,
    pgs_per_oneshotpg: u32,
    map_per_pg: u32,
    pgsz: u32,
    secs_per_pg: u32,

    pgs_per_pl: u64,
    pgs_per_lun: u64,
    pgs_per_ch: u64,
    tt_pgs: u64,
    pgs_per_line: u64,
    tt_lines: u32,
    tt_tpgs: u64,
}

impl Geometry {
    /// Builds a geometry from the tree-shape parameters, deriving every stride.
    ///
    /// # Errors
    /// Returns [`GeometryError`] if any parameter is zero, if
    /// `pgs_per_oneshotpg` does not divide `pgs_per_blk`, or if `map_per_pg`
    /// does not divide the resulting total page count.
    pub fn new(
        nchs: u32,
        luns_per_ch: u32,
        pls_per_lun: u32,
        blks_per_pl: u32,
        pgs_per_blk: u32,
        pgs_per_oneshotpg: u32,
        map_per_pg: u32,
        pgsz: u32,
        secs_per_pg: u32,
    ) -> Result<Self, GeometryError> {
        if nchs == 0 {
            return Err(GeometryError::ZeroParameter("nchs"));
        }
        if luns_per_ch == 0 {
            return Err(GeometryError::ZeroParameter("luns_per_ch"));
        }
        if pls_per_lun == 0 {
            return Err(GeometryError::ZeroParameter("pls_per_lun"));
        }
        if blks_per_pl == 0 {
            return Err(GeometryError::ZeroParameter("blks_per_pl"));
        }
        if pgs_per_blk == 0 {
            return Err(GeometryError::ZeroParameter("pgs_per_blk"));
        }
        if pgs_per_oneshotpg == 0 {
            return Err(GeometryError::ZeroParameter("pgs_per_oneshotpg"));
        }
        if map_per_pg == 0 {
            return Err(GeometryError::ZeroParameter("map_per_pg"));
        }
        if pgsz == 0 {
            return Err(GeometryError::ZeroParameter("pgsz"));
        }
        if secs_per_pg == 0 {
            return Err(GeometryError::ZeroParameter("secs_per_pg"));
        }
        if pgs_per_blk % pgs_per_oneshotpg != 0 {
            return Err(GeometryError::OneshotDoesNotDivideBlock {
                oneshot: pgs_per_oneshotpg,
                pgs_per_blk,
            });
        }

        let pgs_per_pl = u64::from(blks_per_pl) * u64::from(pgs_per_blk);
        let pgs_per_lun = u64::from(pls_per_lun) * pgs_per_pl;
        let pgs_per_ch = u64::from(luns_per_ch) * pgs_per_lun;
        let tt_pgs = u64::from(nchs) * pgs_per_ch;
        // Write pointers stripe over channels and LUNs only (plane index is
        // always 0, as in the source this is grounded on), so a line's
        // capacity is the ch/lun product, not the full ch/lun/plane product.
        let pgs_per_line = u64::from(nchs) * u64::from(luns_per_ch) * u64::from(pgs_per_blk);
        let tt_lines = blks_per_pl;

        // Ceiling division: a partially filled final translation page still needs a slot.
        let tt_tpgs = tt_pgs.div_ceil(u64::from(map_per_pg));

        Ok(Self {
            nchs,
            luns_per_ch,
            pls_per_lun,
            blks_per_pl,
            pgs_per_blk,
            pgs_per_oneshotpg,
            map_per_pg,
            pgsz,
            secs_per_pg,
            pgs_per_pl,
            pgs_per_lun,
            pgs_per_ch,
            tt_pgs,
            pgs_per_line,
            tt_lines,
            tt_tpgs,
        })
    }

    /// Number of channels.
    #[must_use]
    pub const fn nchs(&self) -> u32 {
        self.nchs
    }

    /// Number of LUNs per channel.
    #[must_use]
    pub const fn luns_per_ch(&self) -> u32 {
        self.luns_per_ch
    }

    /// Number of planes per LUN.
    #[must_use]
    pub const fn pls_per_lun(&self) -> u32 {
        self.pls_per_lun
    }

    /// Number of blocks per plane — equivalently, the number of lines.
    #[must_use]
    pub const fn blks_per_pl(&self) -> u32 {
        self.blks_per_pl
    }

    /// Pages per block.
    #[must_use]
    pub const fn pgs_per_blk(&self) -> u32 {
        self.pgs_per_blk
    }

    /// Pages per wordline (oneshot program unit).
    #[must_use]
    pub const fn pgs_per_oneshotpg(&self) -> u32 {
        self.pgs_per_oneshotpg
    }

    /// L2P entries packed into a single translation page.
    #[must_use]
    pub const fn map_per_pg(&self) -> u32 {
        self.map_per_pg
    }

    /// Bytes per physical page — the NAND transfer-size unit.
    #[must_use]
    pub const fn pgsz(&self) -> u32 {
        self.pgsz
    }

    /// Host sectors (512 B) packed into one physical page — the LBA/LPN stride.
    #[must_use]
    pub const fn secs_per_pg(&self) -> u32 {
        self.secs_per_pg
    }

    /// Pages per plane (= `blks_per_pl * pgs_per_blk`); the `blk` stride.
    #[must_use]
    pub const fn pgs_per_pl(&self) -> u64 {
        self.pgs_per_pl
    }

    /// Pages per LUN; the `pl` stride.
    #[must_use]
    pub const fn pgs_per_lun(&self) -> u64 {
        self.pgs_per_lun
    }

    /// Pages per channel; the `lun` stride.
    #[must_use]
    pub const fn pgs_per_ch(&self) -> u64 {
        self.pgs_per_ch
    }

    /// Total pages in the device; the `ch` stride.
    #[must_use]
    pub const fn tt_pgs(&self) -> u64 {
        self.tt_pgs
    }

    /// Pages per line (a line spans every channel/lun/plane at one block index).
    #[must_use]
    pub const fn pgs_per_line(&self) -> u64 {
        self.pgs_per_line
    }

    /// Number of lines (equal to `blks_per_pl`).
    #[must_use]
    pub const fn tt_lines(&self) -> u32 {
        self.tt_lines
    }

    /// Total number of translation pages (`ceil(tt_pgs / map_per_pg)`).
    #[must_use]
    pub const fn tt_tpgs(&self) -> u64 {
        self.tt_tpgs
    }

    /// Folds a `(ch, lun, pl, blk, pg)` tuple into a flat page index.
    ///
    /// `ppa_to_pgidx(p) = ch*pgs_per_ch + lun*pgs_per_lun + pl*pgs_per_pl + blk*pgs_per_blk + pg`.
    /// Returns `None` for [`Ppa::UNMAPPED`] or an out-of-range component.
    #[must_use]
    pub fn ppa_to_pgidx(&self, ppa: Ppa) -> Option<u64> {
        if !self.valid_ppa(ppa) {
            return None;
        }
        Some(
            u64::from(ppa.ch()) * self.pgs_per_ch
                + u64::from(ppa.lun()) * self.pgs_per_lun
                + u64::from(ppa.pl()) * self.pgs_per_pl
                + u64::from(ppa.blk()) * u64::from(self.pgs_per_blk)
                + u64::from(ppa.pg()),
        )
    }

    /// Reconstructs a [`Ppa`] from a flat page index produced by [`Self::ppa_to_pgidx`].
    #[must_use]
    pub fn pgidx_to_ppa(&self, mut pgidx: u64) -> Ppa {
        let ch = pgidx / self.pgs_per_ch;
        pgidx %= self.pgs_per_ch;
        let lun = pgidx / self.pgs_per_lun;
        pgidx %= self.pgs_per_lun;
        let pl = pgidx / self.pgs_per_pl;
        pgidx %= self.pgs_per_pl;
        let blk = pgidx / u64::from(self.pgs_per_blk);
        let pg = pgidx % u64::from(self.pgs_per_blk);

        Ppa::new()
            .with_ch(ch as u8)
            .with_lun(lun as u8)
            .with_pl(pl as u8)
            .with_blk(blk as u32)
            .with_pg(pg as u16)
    }

    /// True if every component of `ppa` is within range and `ppa` is not [`Ppa::UNMAPPED`].
    #[must_use]
    pub fn valid_ppa(&self, ppa: Ppa) -> bool {
        if ppa.is_unmapped() {
            return false;
        }
        u32::from(ppa.ch()) < self.nchs
            && u32::from(ppa.lun()) < self.luns_per_ch
            && u32::from(ppa.pl()) < self.pls_per_lun
            && ppa.blk() < self.blks_per_pl
            && u32::from(ppa.pg()) < self.pgs_per_blk
    }

    /// True if `lpn` addresses a page within the configured logical capacity.
    #[must_use]
    pub fn valid_lpn(&self, lpn: u64) -> bool {
        lpn < self.tt_pgs
    }
}

/// A packed `(ch, lun, pl, blk, pg)` physical page address.
///
/// [`Ppa::UNMAPPED`] (all bits set) is a reserved sentinel distinct from any
/// encodable tuple, used throughout the directory structures for "no
/// mapping yet" and "this slot is free."
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Ppa {
    /// In-block page offset.
    #[bits(16)]
    pub pg: u16,
    /// Block index within the plane — the line id.
    #[bits(24)]
    pub blk: u32,
    /// Plane index within the LUN.
    #[bits(4)]
    pub pl: u8,
    /// LUN index within the channel.
    #[bits(8)]
    pub lun: u8,
    /// Channel index.
    #[bits(8)]
    pub ch: u8,
    #[bits(4)]
    __unused: u8,
}

impl Ppa {
    /// The reserved "no mapping" sentinel.
    pub const UNMAPPED: Self = Self::from_bits(u64::MAX);

    /// True if this is the [`Self::UNMAPPED`] sentinel.
    #[must_use]
    pub const fn is_unmapped(self) -> bool {
        self.into_bits() == Self::UNMAPPED.into_bits()
    }

    /// Builds a `Ppa` from explicit components, bypassing geometry validation.
    ///
    /// Prefer [`Geometry::pgidx_to_ppa`] when starting from a flat index;
    /// use this when the caller already holds validated components (e.g. a
    /// write pointer's current position).
    #[must_use]
    pub fn from_parts(ch: u32, lun: u32, pl: u32, blk: u32, pg: u32) -> Self {
        Self::new()
            .with_ch(ch as u8)
            .with_lun(lun as u8)
            .with_pl(pl as u8)
            .with_blk(blk)
            .with_pg(pg as u16)
    }
}

impl Default for Ppa {
    fn default() -> Self {
        Self::UNMAPPED
    }
}

impl core::fmt::Debug for Ppa {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_unmapped() {
            write!(f, "Ppa(UNMAPPED)")
        } else {
            write!(
                f,
                "Ppa(ch={}, lun={}, pl={}, blk={}, pg={})",
                self.ch(),
                self.lun(),
                self.pl(),
                self.blk(),
                self.pg()
            )
        }
    }
}
