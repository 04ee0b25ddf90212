//! Black-box coverage of the public `Dftl` facade, exercised purely through
//! `read`/`write`/`flush`/`print_cmt`/`print_ec` — no internal field access,
//! in the same style as `kernel-sync`'s `tests/spin_lock.rs`.

use dftl_core::{Dftl, DftlParams, EcVerbosity, EraseCountReport, WriteBuffer};
use dftl_geometry::Geometry;
use dftl_nand_state::{NandCmd, NandTiming};

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
    let params = DftlParams::new(0.1, 2, 1, 4, 1, false, 4, 4, 4, false, true, 10, 20, 1).unwrap();
    Dftl::new(geometry, params).unwrap()
}

#[test]
fn write_then_read_completes_without_error() {
    let mut dftl = seed();
    let mut timing = FixedTiming(10);
    let mut wbuf = UnboundedWriteBuffer;

    let secs_per_pg = u64::from(dftl.geometry().secs_per_pg());
    dftl.write(&mut timing, &mut wbuf, 0, 0, secs_per_pg as u32, 0, false).unwrap();
    let completion = dftl.read(&mut timing, 0, secs_per_pg as u32, 100).unwrap();

    assert!(completion >= 100);
    assert_eq!(dftl.stats().host_write_cmds, 1);
    assert_eq!(dftl.stats().host_read_cmds, 1);
}

#[test]
fn write_past_namespace_capacity_is_rejected() {
    let mut dftl = seed();
    let mut timing = FixedTiming(10);
    let mut wbuf = UnboundedWriteBuffer;

    let tt_pgs = dftl.geometry().tt_pgs();
    let secs_per_pg = u64::from(dftl.geometry().secs_per_pg());
    let out_of_range_slba = tt_pgs * secs_per_pg;

    let err = dftl
        .write(&mut timing, &mut wbuf, 0, out_of_range_slba, secs_per_pg as u32, 0, false)
        .unwrap_err();
    assert!(matches!(err, dftl_core::DftlError::OutOfRangeLpn(_)));
}

#[test]
fn flush_is_idempotent_with_no_intervening_io() {
    let dftl = seed();
    let timing = FixedTiming(10);
    assert_eq!(dftl.flush(&timing), dftl.flush(&timing));
}

#[test]
fn print_cmt_and_print_ec_reflect_committed_writes() {
    let mut dftl = seed();
    let mut timing = FixedTiming(10);
    let mut wbuf = UnboundedWriteBuffer;

    let secs_per_pg = u64::from(dftl.geometry().secs_per_pg());
    for lpn in 0..3 {
        dftl.write(&mut timing, &mut wbuf, 0, lpn * secs_per_pg, secs_per_pg as u32, 0, false).unwrap();
    }

    let cmt_report = dftl.print_cmt();
    assert_eq!(cmt_report.aggregate.cold_miss_cnt, 1, "one translation page covers all three lpns");

    let EraseCountReport::Totals { total_erase_cnt, line_cnt } = dftl.print_ec(EcVerbosity::Totals) else {
        unreachable!()
    };
    assert_eq!(total_erase_cnt, 0, "no line has been erased yet");
    assert_eq!(line_cnt, dftl.geometry().tt_lines());
}
