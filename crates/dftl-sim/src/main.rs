//! A small scenario runner exercising spec.md §8's S1–S6 seed scenarios
//! against the public `dftl-core` facade, plus the `PrintCmt`/`PrintEc`
//! admin commands (spec.md §6) — standing in for the virtual NVMe device's
//! command dispatcher, which lives outside this workspace.

mod logger;
mod timing;

use dftl_core::{DftlError, DftlParams, EcVerbosity};
use dftl_geometry::Geometry;
use log::LevelFilter;
use timing::{Latencies, SimNandTiming, SimWriteBuffer};

fn main() -> Result<(), DftlError> {
    logger::StderrLogger::new(LevelFilter::Info)
        .init()
        .expect("no logger installed yet");

    run_basic_round_trip()?;
    run_fill_and_gc()?;
    run_wear_leveling_demo()?;
    Ok(())
}

/// S1/S2: writes LPN 0 once, reads it back, overwrites it, and prints the
/// CMT/erase-count telemetry the admin commands would surface.
fn run_basic_round_trip() -> Result<(), DftlError> {
    println!("--- basic round trip (S1/S2) ---");
    let geometry = Geometry::new(1, 1, 1, 8, 16, 4, 512, 4096, 8).expect("valid geometry");
    let params = DftlParams::new(0.1, 2, 1, 2, 1, false, 4, 4, 4, false, true, 10_000, 40_000, 1).expect("valid params");
    let mut dftl = dftl_core::Dftl::new(geometry, params)?;
    let mut timing = SimNandTiming::new(geometry.nchs(), geometry.luns_per_ch(), Latencies::default());
    let mut wbuf = SimWriteBuffer::new(1 << 20, 1);

    let secs_per_pg = u64::from(geometry.secs_per_pg());
    let t = dftl.write(&mut timing, &mut wbuf, 0, 0, secs_per_pg as u32, 0, false)?;
    println!("write(lpn=0) completed at {t}ns");
    let t = dftl.read(&mut timing, 0, secs_per_pg as u32, t)?;
    println!("read(lpn=0) completed at {t}ns");
    let t = dftl.write(&mut timing, &mut wbuf, 0, 0, secs_per_pg as u32, t, false)?;
    println!("overwrite(lpn=0) completed at {t}ns");

    print_admin(&dftl);
    Ok(())
}

/// S3/S4: fills the first line with user writes, forcing the frontier to
/// roll over and the first line to become a GC candidate, then triggers
/// foreground GC by exhausting write credit on a second line.
fn run_fill_and_gc() -> Result<(), DftlError> {
    println!("\n--- fill a line and force GC (S3/S4) ---");
    let geometry = Geometry::new(1, 1, 1, 8, 16, 4, 512, 4096, 8).expect("valid geometry");
    let params = DftlParams::new(0.2, 1, 1, 2, 1, false, 4, 4, 4, false, true, 10_000, 40_000, 1).expect("valid params");
    let mut dftl = dftl_core::Dftl::new(geometry, params)?;
    let mut timing = SimNandTiming::new(geometry.nchs(), geometry.luns_per_ch(), Latencies::default());
    let mut wbuf = SimWriteBuffer::new(1 << 20, 1);

    let secs_per_pg = u64::from(geometry.secs_per_pg());
    let mut t = 0u64;
    let pgs_per_line = geometry.pgs_per_line();
    for lpn in 0..pgs_per_line * 2 {
        t = dftl.write(&mut timing, &mut wbuf, 0, lpn * secs_per_pg, secs_per_pg as u32, t, false)?;
    }
    println!("wrote {} pages across two lines, last completion at {t}ns", pgs_per_line * 2);
    println!("free lines remaining: should_gc_high = {}", dftl.should_gc_high(0));

    print_admin(&dftl);
    Ok(())
}

/// S6 (shape only — a fresh namespace has no erase-count skew to correct):
/// writes one line's worth of data, then demonstrates the explicit
/// `run_wear_leveling` hook (`DO_WL=true`) and prints the pool erase-count
/// telemetry before and after, which is a no-op here since neither pool's
/// spread has crossed a threshold yet.
fn run_wear_leveling_demo() -> Result<(), DftlError> {
    println!("\n--- wear leveling (S6) ---");
    let geometry = Geometry::new(1, 1, 1, 8, 16, 4, 512, 4096, 8).expect("valid geometry");
    let params = DftlParams::new(0.1, 2, 1, 2, 1, true, 2, 2, 2, false, true, 10_000, 40_000, 1).expect("valid params");
    let mut dftl = dftl_core::Dftl::new(geometry, params)?;
    let mut timing = SimNandTiming::new(geometry.nchs(), geometry.luns_per_ch(), Latencies::default());
    let mut wbuf = SimWriteBuffer::new(1 << 20, 1);

    let secs_per_pg = u64::from(geometry.secs_per_pg());
    let mut t = 0u64;
    for lpn in 0..geometry.pgs_per_line() {
        t = dftl.write(&mut timing, &mut wbuf, 0, lpn * secs_per_pg, secs_per_pg as u32, t, false)?;
    }

    println!("before wear leveling:");
    print_ec_pools(&dftl);
    dftl.run_wear_leveling(&mut timing)?;
    println!("after wear leveling:");
    print_ec_pools(&dftl);
    Ok(())
}

fn print_admin(dftl: &dftl_core::Dftl) {
    let cmt = dftl.print_cmt();
    println!(
        "PrintCmt: hits={} misses={} cold_misses={} flushes={}",
        cmt.aggregate.hit_cnt, cmt.aggregate.miss_cnt, cmt.aggregate.cold_miss_cnt, cmt.aggregate.flush_cnt
    );
    print_ec_pools(dftl);
}

fn print_ec_pools(dftl: &dftl_core::Dftl) {
    if let dftl_core::EraseCountReport::Pools { hot, cold } = dftl.print_ec(EcVerbosity::Pools) {
        println!(
            "PrintEc(pools): hot={{lines={}, total_erase_cnt={}}} cold={{lines={}, total_erase_cnt={}}}",
            hot.line_cnt, hot.total_erase_cnt, cold.line_cnt, cold.total_erase_cnt
        );
    }
}
