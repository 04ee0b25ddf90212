//! A stand-in for the external NAND timing simulator and write buffer
//! (spec.md §1/§6), which this workspace only ever consumes as opaque
//! `advance_nand`/`advance_write_buffer`/`next_idle_time` oracles.
//!
//! `original_source/dftl.c` calls into `ssd_advance_nand`/`ssd.c`, which
//! isn't part of the retrieved pack — this is a plausible from-scratch
//! model of the same shape (per-channel/LUN serialization, op-kind-specific
//! latency), not a port of anything in the pack.

use dftl_geometry::Ppa;
use dftl_nand_state::{NandCmd, NandOpKind, NandTiming};

/// Fixed per-operation latencies, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latencies {
    /// Fixed overhead of a read, regardless of size.
    pub read_fixed: u64,
    /// Per-byte cost of a read transfer.
    pub read_per_byte: u64,
    /// Fixed overhead of a program (write).
    pub write_fixed: u64,
    /// Per-byte cost of a program transfer.
    pub write_per_byte: u64,
    /// Fixed cost of a block erase.
    pub erase_fixed: u64,
}

impl Default for Latencies {
    fn default() -> Self {
        Self {
            read_fixed: 6_000,
            read_per_byte: 1,
            write_fixed: 75_000,
            write_per_byte: 2,
            erase_fixed: 1_500_000,
        }
    }
}

/// An in-process NAND timing model: one busy-until clock per `(channel,
/// LUN)`, so overlapping ops on distinct LUNs run concurrently while ops
/// issued to the same LUN serialize, and a device-wide clock for
/// [`NandTiming::next_idle_time`].
pub struct SimNandTiming {
    latencies: Latencies,
    busy_until: Vec<u64>,
    luns_per_ch: u32,
}

impl SimNandTiming {
    /// Builds a timing model for a device with `nchs` channels and
    /// `luns_per_ch` LUNs per channel, all starting idle at time 0.
    #[must_use]
    pub fn new(nchs: u32, luns_per_ch: u32, latencies: Latencies) -> Self {
        Self {
            latencies,
            busy_until: vec![0; (nchs * luns_per_ch) as usize],
            luns_per_ch,
        }
    }

    fn lun_slot(&self, ppa: Ppa) -> usize {
        (u32::from(ppa.ch()) * self.luns_per_ch + u32::from(ppa.lun())) as usize
    }
}

impl NandTiming for SimNandTiming {
    fn advance_nand(&mut self, cmd: NandCmd) -> u64 {
        let slot = self.lun_slot(cmd.ppa);
        let start = cmd.stime.max(self.busy_until[slot]);
        let duration = match cmd.op {
            NandOpKind::Read => self.latencies.read_fixed + cmd.xfer_size * self.latencies.read_per_byte,
            NandOpKind::Write => self.latencies.write_fixed + cmd.xfer_size * self.latencies.write_per_byte,
            NandOpKind::Erase => self.latencies.erase_fixed,
            NandOpKind::Nop => 0,
        };
        let finish = start + duration;
        self.busy_until[slot] = finish;
        finish
    }

    fn next_idle_time(&self) -> u64 {
        self.busy_until.iter().copied().max().unwrap_or(0)
    }
}

/// A write buffer of fixed capacity, reserved by [`Self::buffer_allocate`]
/// and released by [`Self::schedule_internal_operation`] once the backing
/// NAND program completes — the external `buffer_allocate`/
/// `advance_write_buffer`/`schedule_internal_operation` collaborators from
/// spec.md §6.
pub struct SimWriteBuffer {
    capacity: u64,
    in_use: u64,
    ns_per_byte: u64,
}

impl SimWriteBuffer {
    /// Builds a write buffer with room for `capacity` bytes, draining at
    /// `ns_per_byte` nanoseconds per buffered byte.
    #[must_use]
    pub const fn new(capacity: u64, ns_per_byte: u64) -> Self {
        Self { capacity, in_use: 0, ns_per_byte }
    }
}

impl dftl_core::WriteBuffer for SimWriteBuffer {
    fn buffer_allocate(&mut self, bytes: u64) -> u64 {
        let free = self.capacity - self.in_use;
        let granted = bytes.min(free);
        self.in_use += granted;
        granted
    }

    fn advance_write_buffer(&mut self, stime: u64, bytes: u64) -> u64 {
        stime + bytes * self.ns_per_byte
    }

    fn schedule_internal_operation(&mut self, _sqid: u32, _t: u64, bytes_to_release: u64) {
        self.in_use = self.in_use.saturating_sub(bytes_to_release);
    }
}
