//! The host I/O pipeline (C11): `Read`/`Write`/`Flush`, turned into
//! sequences of [`dftl_translate::translate`] and NAND/write-buffer calls.

use dftl_gc::is_same_flash_page;
use dftl_nand_state::{IoClass, NandCmd, NandOpKind, NandTiming};
use dftl_translate::translate;

use crate::instance::{build_translate_ctx, foreground_gc};
use crate::{Dftl, DftlError, Ppa, SECTOR_SIZE};

/// The external write-buffer model (spec.md §6's `buffer_allocate`,
/// `advance_write_buffer`, `schedule_internal_operation`), consumed as an
/// opaque collaborator exactly like [`NandTiming`] is for the NAND array —
/// implemented outside this workspace by the virtual NVMe device, with a
/// minimal stand-in provided by `dftl-sim`.
pub trait WriteBuffer {
    /// Reserves `bytes` in the write buffer, returning the number of bytes
    /// actually granted (less than `bytes` means the caller must fail the
    /// write with [`DftlError::WriteBufferFull`]).
    fn buffer_allocate(&mut self, bytes: u64) -> u64;

    /// Advances the write-buffer clock by `bytes` starting at `stime`,
    /// returning the buffer-side completion timestamp.
    fn advance_write_buffer(&mut self, stime: u64, bytes: u64) -> u64;

    /// Schedules the release of `bytes_to_release` from the write buffer at
    /// time `t`, for submission queue `sqid`, once the backing NAND program
    /// that consumed them has completed.
    fn schedule_internal_operation(&mut self, sqid: u32, t: u64, bytes_to_release: u64);
}

/// Tracks an in-flight run of contiguous same-flash-page reads so they can
/// be coalesced into a single NAND read (spec.md §4.7).
struct ReadRun {
    base: Ppa,
    pages: u32,
}

impl Dftl {
    /// Services a host `Read(slba, nr_lba)`.
    ///
    /// Adds firmware overhead to `stime` (`fw_4kb_rd_lat` for transfers at
    /// or under one physical page, else `fw_rd_lat`), then for each
    /// partition walks its logical pages in ascending order, translating
    /// each LPN and coalescing contiguous same-flash-page hits into one
    /// batched NAND read. Unmapped or invalid results are skipped, not
    /// errors (spec.md §7).
    ///
    /// # Errors
    /// [`DftlError::OutOfRangeLpn`] if the command's LBA range exceeds this
    /// namespace's logical capacity; [`DftlError::Line`] if a Translation
    /// frontier's free list is exhausted mid-lookup.
    pub fn read(&mut self, timing: &mut dyn NandTiming, slba: u64, nr_lba: u32, stime: u64) -> Result<u64, DftlError> {
        self.stats.host_read_cmds += 1;
        let (start_lpn, end_lpn) = self.lba_range_to_lpn(slba, nr_lba);
        if !self.valid_global_lpn(end_lpn) {
            return Err(DftlError::OutOfRangeLpn(end_lpn));
        }

        let bytes = u64::from(nr_lba) * SECTOR_SIZE;
        let fw_lat = if bytes <= u64::from(self.geometry.pgsz()) {
            self.params.fw_4kb_rd_lat
        } else {
            self.params.fw_rd_lat
        };
        let t0 = stime + fw_lat;
        let nr_parts = u64::from(self.params.nr_parts);

        let mut completion = t0;
        for part in 0..nr_parts {
            let mut run: Option<ReadRun> = None;
            for global_lpn in (start_lpn..=end_lpn).filter(|l| l % nr_parts == part) {
                let local_lpn = global_lpn / nr_parts;
                let inst = &mut self.instances[part as usize];
                let mut ctx = build_translate_ctx(&self.geometry, inst, timing);
                let outcome = translate(&mut ctx, local_lpn, t0)?;
                completion = completion.max(outcome.completion_time);

                if outcome.ppa.is_unmapped() || !self.geometry.valid_ppa(outcome.ppa) {
                    completion = completion.max(flush_read_run(&self.geometry, timing, run.take(), t0));
                    continue;
                }

                match &mut run {
                    Some(r) if is_same_flash_page(&self.geometry, r.base, outcome.ppa) => r.pages += 1,
                    _ => {
                        completion = completion.max(flush_read_run(&self.geometry, timing, run.take(), t0));
                        run = Some(ReadRun { base: outcome.ppa, pages: 1 });
                    }
                }
            }
            completion = completion.max(flush_read_run(&self.geometry, timing, run.take(), t0));
        }

        Ok(completion)
    }

    /// Services a host `Write(slba, nr_lba, fua)`.
    ///
    /// Reserves `nr_lba` sectors' worth of bytes in the write buffer,
    /// invalidates each LPN's previous mapping (if any), allocates a fresh
    /// data page from the User frontier, and keeps the CMT/RMAP/GTD
    /// coherent. A oneshot `NAND_WRITE` is scheduled whenever a newly
    /// allocated page lands on a wordline boundary. Every allocated
    /// data/translation page spends one unit of write credit; exhausting it
    /// runs foreground GC and refills.
    ///
    /// # Errors
    /// [`DftlError::WriteBufferFull`] if the write buffer can't grant the
    /// reservation; [`DftlError::OutOfRangeLpn`] if the LBA range exceeds
    /// this namespace's logical capacity; [`DftlError::Line`]/[`DftlError::Transition`]
    /// propagate frontier exhaustion or state-machine bugs.
    pub fn write(
        &mut self,
        timing: &mut dyn NandTiming,
        wbuf: &mut dyn WriteBuffer,
        sqid: u32,
        slba: u64,
        nr_lba: u32,
        stime: u64,
        fua: bool,
    ) -> Result<u64, DftlError> {
        self.stats.host_write_cmds += 1;
        let (start_lpn, end_lpn) = self.lba_range_to_lpn(slba, nr_lba);
        if !self.valid_global_lpn(end_lpn) {
            return Err(DftlError::OutOfRangeLpn(end_lpn));
        }

        let bytes = u64::from(nr_lba) * SECTOR_SIZE;
        let granted = wbuf.buffer_allocate(bytes);
        if granted < bytes {
            log::warn!("write buffer exhausted: requested {bytes} bytes, granted {granted}");
            return Err(DftlError::WriteBufferFull);
        }
        let t_buf = wbuf.advance_write_buffer(stime, bytes);
        let nr_parts = u64::from(self.params.nr_parts);

        let mut nand_completion = t_buf;
        for global_lpn in start_lpn..=end_lpn {
            let part = (global_lpn % nr_parts) as usize;
            let local_lpn = global_lpn / nr_parts;

            let outcome = {
                let inst = &mut self.instances[part];
                let mut ctx = build_translate_ctx(&self.geometry, inst, timing);
                translate(&mut ctx, local_lpn, t_buf)?
            };
            nand_completion = nand_completion.max(outcome.completion_time);

            let inst = &mut self.instances[part];
            if !outcome.ppa.is_unmapped() {
                if let Some(old_pgidx) = self.geometry.ppa_to_pgidx(outcome.ppa) {
                    inst.nand.mark_page_invalid(old_pgidx)?;
                    inst.rmap.clear(old_pgidx);
                    let old_blk = outcome.ppa.blk();
                    inst.lines.invalidate_one(old_blk);
                    // invalidate_one only restores heap order for a line
                    // already in the victim pq; a fully-written line sitting
                    // in the full list must be moved there explicitly, the
                    // same remove_full-then-insert_victim step do_cold_data_migration
                    // uses before do_gc pulls a line out of rotation.
                    if !inst.lines.line(old_blk).in_victim_pq() && !inst.excluded_lines().contains(&old_blk) {
                        inst.lines.remove_full(old_blk);
                        inst.lines.insert_victim(old_blk);
                    }
                }
            }

            let new_ppa = inst.user_wp.get_new_page();
            let new_pgidx = self.geometry.ppa_to_pgidx(new_ppa).expect("user frontier yields in-range ppas");
            inst.nand.mark_page_valid(new_pgidx, false, None)?;
            inst.rmap.set(new_pgidx, local_lpn);
            inst.lines.validate_one(new_ppa.blk());

            let map_per_pg = self.geometry.map_per_pg();
            let vpn = local_lpn / u64::from(map_per_pg);
            let off = (local_lpn % u64::from(map_per_pg)) as usize;
            let entry = inst.cmt.touch_mut(vpn).expect("translate() just faulted vpn's entry into the cmt");
            entry.l2p_mut()[off] = new_ppa;
            entry.mark_dirty();

            if inst.user_wp.is_wordline_boundary(&self.geometry) {
                let stime = nand_completion.max(t_buf);
                let xfer_size = u64::from(self.geometry.pgsz()) * u64::from(self.geometry.pgs_per_oneshotpg());
                let c = timing.advance_nand(NandCmd {
                    io_class: IoClass::User,
                    op: NandOpKind::Write,
                    stime,
                    xfer_size,
                    ppa: new_ppa,
                    interleave_pci_dma: true,
                });
                nand_completion = nand_completion.max(c);
                wbuf.schedule_internal_operation(sqid, stime, xfer_size);
            }

            dftl_frontiers::advance_write_pointer(&mut inst.user_wp, &self.geometry, &mut inst.lines)?;

            let credit_spent = 1 + u64::from(outcome.nand_writes_performed);
            if inst.spend_credit(credit_spent) {
                foreground_gc(inst, &self.geometry, timing, self.params.gc_foreground_iters)?;
            }
        }

        Ok(if fua || !self.params.write_early_completion {
            nand_completion
        } else {
            t_buf
        })
    }

    /// Services a host `Flush`. Returns the latest `next_idle_time` across
    /// every partition's share of the NAND array — idempotent between two
    /// consecutive flushes with no intervening I/O (L5).
    #[must_use]
    pub fn flush(&self, timing: &dyn NandTiming) -> u64 {
        (0..self.instances.len()).map(|_| timing.next_idle_time()).max().unwrap_or(0)
    }
}

/// Flushes an accumulated coalesced-read run, if any, as one NAND read
/// sized `pgsz * pages`, returning the run's completion time (or `stime`
/// unchanged if there was no run to flush).
fn flush_read_run(geometry: &dftl_geometry::Geometry, timing: &mut dyn NandTiming, run: Option<ReadRun>, stime: u64) -> u64 {
    let Some(run) = run else { return stime };
    timing.advance_nand(NandCmd {
        io_class: IoClass::User,
        op: NandOpKind::Read,
        stime,
        xfer_size: u64::from(geometry.pgsz()) * u64::from(run.pages),
        ppa: run.base,
        interleave_pci_dma: true,
    })
}
