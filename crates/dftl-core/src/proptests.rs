//! Property tests over random operation sequences (spec.md §8's P1 and L1),
//! the way `proptest` is used across the pack's storage-adjacent crates.

use proptest::prelude::*;

use dftl_geometry::Geometry;
use dftl_nand_state::{NandCmd, NandTiming};

use crate::io::WriteBuffer;
use crate::{Dftl, DftlParams};

struct FixedTiming(u64);

impl NandTiming for FixedTiming {
    fn advance_nand(&mut self, cmd: NandCmd) -> u64 {
        cmd.stime + self.0
    }

    fn next_idle_time(&self) -> u64 {
        0
    }
}

struct UnboundedWriteBuffer;

impl WriteBuffer for UnboundedWriteBuffer {
    fn buffer_allocate(&mut self, bytes: u64) -> u64 {
        bytes
    }

    fn advance_write_buffer(&mut self, stime: u64, _bytes: u64) -> u64 {
        stime
    }

    fn schedule_internal_operation(&mut self, _sqid: u32, _t: u64, _bytes_to_release: u64) {}
}

fn seed() -> Dftl {
    let geometry = Geometry::new(1, 1, 1, 8, 16, 4, 512, 4096, 8).unwrap();
    let params = DftlParams::new(0.1, 2, 1, 4, 1, false, 4, 4, 4, false, true, 10, 20, 2).unwrap();
    Dftl::new(geometry, params).unwrap()
}

/// Every line is free, victim, full, or owned by exactly one of the five
/// frontiers as its `curline` — never more than one of those at once, and
/// never none of them (spec.md P1).
fn assert_every_line_accounted_for(dftl: &Dftl) {
    let inst = &dftl.instances[0];
    let tt_lines = dftl.geometry().tt_lines();
    let excluded = inst.excluded_lines();
    let accounted = inst.lines.free_line_cnt() + inst.lines.victim_line_cnt() + inst.lines.full_line_cnt() + excluded.len();
    assert_eq!(accounted as u32, tt_lines);
}

proptest! {
    #[test]
    fn p1_every_line_is_accounted_for_after_any_write_sequence(lpns in prop::collection::vec(0u64..128, 1..40)) {
        let mut dftl = seed();
        let mut timing = FixedTiming(10);
        let mut wbuf = UnboundedWriteBuffer;
        let secs_per_pg = u64::from(dftl.geometry().secs_per_pg());

        for (i, lpn) in lpns.iter().enumerate() {
            let stime = u64::try_from(i).unwrap() * 100;
            let _ = dftl.write(&mut timing, &mut wbuf, 0, lpn * secs_per_pg, secs_per_pg as u32, stime, false);
            assert_every_line_accounted_for(&dftl);
        }
    }

    #[test]
    fn l1_write_then_read_round_trips_for_any_lpn_sequence(lpns in prop::collection::vec(0u64..128, 1..20)) {
        let mut dftl = seed();
        let mut timing = FixedTiming(10);
        let mut wbuf = UnboundedWriteBuffer;
        let secs_per_pg = u64::from(dftl.geometry().secs_per_pg());

        for lpn in &lpns {
            dftl.write(&mut timing, &mut wbuf, 0, lpn * secs_per_pg, secs_per_pg as u32, 0, false).unwrap();
        }

        // the last write to each distinct lpn must still resolve to a mapped, valid ppa.
        let mut last_write_index = std::collections::HashMap::new();
        for (i, lpn) in lpns.iter().enumerate() {
            last_write_index.insert(*lpn, i);
        }
        for lpn in last_write_index.keys() {
            dftl.read(&mut timing, lpn * secs_per_pg, secs_per_pg as u32, 0).unwrap();
            let inst = &dftl.instances[0];
            let map_per_pg = u64::from(dftl.geometry().map_per_pg());
            let vpn = lpn / map_per_pg;
            let off = (lpn % map_per_pg) as usize;
            let ppa = inst.cmt.peek(vpn).expect("lpn just read must have its vpn resident").l2p()[off];
            prop_assert!(!ppa.is_unmapped());
            let pgidx = dftl.geometry().ppa_to_pgidx(ppa).unwrap();
            prop_assert_eq!(inst.nand.page(pgidx).status(), dftl_nand_state::PageStatus::Valid);
        }
    }
}
