//! Dual-pool wear leveling (C10): hot/cold pool classification, pool-size
//! adjustment in both directions, and cold-data migration.
//!
//! Every line carries a [`dftl_lines::Pool`] tag. Three independent rules,
//! grounded on `original_source/dftl.c`'s `check_hot_pool_adjustment`/
//! `do_hot_pool_adjustment`, `check_cold_pool_adjustment`/
//! `do_cold_pool_adjustment`, and `check_cold_data_migration`/
//! `do_cold_data_migration`, keep the tag assignment matched to actual wear
//! (`spec.md` §4.6):
//!
//! - **Hot-pool adjustment**: if the `erase_cnt` spread *within* the Hot pool
//!   exceeds `TH_HOT_POOL_ADJUSTMENT`, the least-worn Hot line is retagged
//!   Cold — it's seeing more wear than its peers only because it keeps
//!   landing hot writes, not because it's actually durable, so it's given a
//!   rest.
//! - **Cold-pool adjustment**: if the most-rested Cold line (by `eec`) has
//!   drifted further from the least-worn Hot line than
//!   `TH_COLD_POOL_ADJUSTMENT`, it's retagged Hot — it's been sitting idle
//!   long enough that putting it back into hot rotation won't hurt it.
//! - **Cold-data migration**: when a fully-written, non-frontier Hot line has
//!   accumulated `TH_COLD_DATA_MIGRATION` more erases than a fully-written,
//!   non-frontier Cold line, the two effectively swap duty: the Hot line is
//!   GC'd to reclaim it, the Cold line's still-valid pages are relocated onto
//!   the WL frontier (and the Cold line itself erased as a side effect of
//!   that relocation), and the two lines' pool tags and `eec` are swapped.
//!   This is the only rule that actually moves data, not just a tag.
//!
//! A pool transition always resets the line's `eec` — the glossary defines
//! `eec` as "effective erase count, reset on a pool transition", so every
//! `set_pool` call here is paired with a `reset_eec` regardless of which of
//! the three rules triggered it.

#![warn(missing_docs)]

use dftl_gc::{GcCtx, GcError, GcState, do_gc};
use dftl_lines::{LineId, LineManager, Pool};

/// Errors raised while running wear leveling.
#[derive(Debug, thiserror::Error)]
pub enum WlError {
    /// Cold-data migration relocates both lines through [`do_gc`]; either
    /// leg can exhaust a frontier's free list exactly as ordinary GC can.
    #[error(transparent)]
    Gc(#[from] GcError),
}

/// The three threshold parameters from `spec.md` §4.6.
#[derive(Debug, Clone, Copy)]
pub struct WlParams {
    /// Maximum tolerated `erase_cnt` spread within the Hot pool.
    pub th_hot_pool_adjustment: u64,
    /// Maximum tolerated `eec` gap between the most-rested Cold line and the
    /// least-worn Hot line.
    pub th_cold_pool_adjustment: u64,
    /// Maximum tolerated `erase_cnt` gap between a restricted Hot line and a
    /// restricted Cold line before their data is swapped.
    pub th_cold_data_migration: u64,
}

/// Telemetry counters, read the same way [`dftl_gc::GcState`] and
/// `dftl_cmt::CmtStats` are: plain counts, no side effects of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct WlStats {
    hot_pool_adjustment_cnt: u64,
    cold_pool_adjustment_cnt: u64,
    cold_data_migration_cnt: u64,
}

impl WlStats {
    /// Number of times [`do_hot_pool_adjustment`] retagged a line.
    #[must_use]
    pub const fn hot_pool_adjustment_cnt(&self) -> u64 {
        self.hot_pool_adjustment_cnt
    }

    /// Number of times [`do_cold_pool_adjustment`] retagged a line.
    #[must_use]
    pub const fn cold_pool_adjustment_cnt(&self) -> u64 {
        self.cold_pool_adjustment_cnt
    }

    /// Number of times [`do_cold_data_migration`] swapped a hot/cold pair.
    #[must_use]
    pub const fn cold_data_migration_cnt(&self) -> u64 {
        self.cold_data_migration_cnt
    }
}

fn retag(lines: &mut LineManager, id: LineId, pool: Pool) {
    lines.set_pool(id, pool);
    lines.reset_eec(id);
}

/// Hot-pool adjustment: retags the least-worn Hot line as Cold if the
/// `erase_cnt` spread within the Hot pool exceeds the threshold.
///
/// Returns whether a line was retagged.
pub fn do_hot_pool_adjustment(lines: &mut LineManager, stats: &mut WlStats, params: WlParams) -> bool {
    let mut min: Option<(LineId, u64)> = None;
    let mut max: Option<u64> = None;
    for line in lines.iter() {
        if line.pool() != Pool::Hot {
            continue;
        }
        let ec = line.erase_cnt();
        if min.is_none_or(|(_, m)| ec < m) {
            min = Some((line.id(), ec));
        }
        if max.is_none_or(|m| ec > m) {
            max = Some(ec);
        }
    }
    let (Some((min_id, min_ec)), Some(max_ec)) = (min, max) else {
        return false;
    };
    if max_ec - min_ec <= params.th_hot_pool_adjustment {
        return false;
    }

    log::debug!("hot-pool adjustment: retagging line {min_id} (erase_cnt={min_ec}) cold (spread {}/{})", max_ec - min_ec, params.th_hot_pool_adjustment);
    retag(lines, min_id, Pool::Cold);
    stats.hot_pool_adjustment_cnt += 1;
    true
}

/// Cold-pool adjustment: retags the most-rested Cold line as Hot if its
/// `eec` has drifted past the least-worn Hot line's `eec` by more than the
/// threshold.
///
/// Returns whether a line was retagged.
pub fn do_cold_pool_adjustment(lines: &mut LineManager, stats: &mut WlStats, params: WlParams) -> bool {
    let mut max_cold: Option<(LineId, u64)> = None;
    let mut min_hot_eec: Option<u64> = None;
    for line in lines.iter() {
        match line.pool() {
            Pool::Cold => {
                let eec = line.eec();
                if max_cold.is_none_or(|(_, m)| eec > m) {
                    max_cold = Some((line.id(), eec));
                }
            }
            Pool::Hot => {
                let eec = line.eec();
                if min_hot_eec.is_none_or(|m| eec < m) {
                    min_hot_eec = Some(eec);
                }
            }
        }
    }
    let (Some((cold_id, cold_eec)), Some(hot_eec)) = (max_cold, min_hot_eec) else {
        return false;
    };
    if cold_eec <= hot_eec || cold_eec - hot_eec <= params.th_cold_pool_adjustment {
        return false;
    }

    log::debug!("cold-pool adjustment: retagging line {cold_id} (eec={cold_eec}) hot (gap {}/{})", cold_eec - hot_eec, params.th_cold_pool_adjustment);
    retag(lines, cold_id, Pool::Hot);
    stats.cold_pool_adjustment_cnt += 1;
    true
}

/// A line is eligible for cold-data migration only while it's fully written
/// (`vpc == pgs_per_line`, i.e. sitting in the full list rather than the
/// victim PQ or owned as some frontier's `curline`) and isn't itself one of
/// the frontiers' current lines.
fn migration_candidate(lines: &LineManager, id: LineId, pgs_per_line: u64, excluded: &[LineId]) -> bool {
    u64::from(lines.line(id).vpc()) == pgs_per_line && !excluded.contains(&id)
}

/// Breaks an `erase_cnt` tie among migration candidates the way
/// `original_source/dftl.c`'s `do_cold_data_migration` does. The hot-pool
/// search (`want_max=true`, `max_ec_idx`) prefers the line most recently
/// erased by GC (`last_gc_line`) before falling back to `ipc`; the cold-pool
/// search (`want_max=false`, `min_ec_idx`) never consults `last_gc_line` at
/// all and ties purely on `ipc`.
fn better_candidate(lines: &LineManager, best: (LineId, u64), candidate: (LineId, u64), want_max: bool, last_gc_line: Option<LineId>) -> bool {
    let (best_id, best_ec) = best;
    let (cand_id, cand_ec) = candidate;
    if cand_ec != best_ec {
        return if want_max { cand_ec > best_ec } else { cand_ec < best_ec };
    }
    if want_max {
        if last_gc_line == Some(cand_id) && last_gc_line != Some(best_id) {
            return true;
        }
        if last_gc_line == Some(best_id) {
            return false;
        }
    }
    lines.line(cand_id).ipc() > lines.line(best_id).ipc()
}

fn restricted_extremum(lines: &LineManager, pool: Pool, pgs_per_line: u64, excluded: &[LineId], want_max: bool, last_gc_line: Option<LineId>) -> Option<(LineId, u64)> {
    let mut best: Option<(LineId, u64)> = None;
    for line in lines.iter() {
        if line.pool() != pool || !migration_candidate(lines, line.id(), pgs_per_line, excluded) {
            continue;
        }
        let candidate = (line.id(), line.erase_cnt());
        best = Some(match best {
            None => candidate,
            Some(b) => {
                if better_candidate(lines, b, candidate, want_max, last_gc_line) {
                    candidate
                } else {
                    b
                }
            }
        });
    }
    best
}

/// Cold-data migration: swaps a worn-out Hot line and a rested Cold line
/// when the `erase_cnt` gap between them (restricted to fully-written,
/// non-frontier lines) exceeds the threshold.
///
/// The Hot line is freed by ordinary GC (`is_wl = false`); the Cold line's
/// still-valid pages are relocated onto the WL frontier (`is_wl = true`),
/// which also erases it. Both must be pulled out of the full list before
/// `do_gc` erases them, mirroring the `remove_full`-then-`insert_victim`
/// protocol ordinary GC follows for lines it pulls out of rotation.
///
/// # Errors
/// [`WlError::Gc`] if either relocation leg exhausts a frontier's free list.
pub fn do_cold_data_migration(
    gc_state: &mut GcState,
    stats: &mut WlStats,
    ctx: &mut GcCtx<'_>,
    params: WlParams,
    excluded: &[LineId],
) -> Result<bool, WlError> {
    let pgs_per_line = ctx.geometry.pgs_per_line();
    let hot = restricted_extremum(ctx.lines, Pool::Hot, pgs_per_line, excluded, true);
    let cold = restricted_extremum(ctx.lines, Pool::Cold, pgs_per_line, excluded, false);
    let (Some((hot_id, hot_ec)), Some((cold_id, cold_ec))) = (hot, cold) else {
        return Ok(false);
    };
    if hot_ec <= cold_ec || hot_ec - cold_ec <= params.th_cold_data_migration {
        return Ok(false);
    }

    log::debug!(
        "cold-data migration: hot line {hot_id} (erase_cnt={hot_ec}) <-> cold line {cold_id} (erase_cnt={cold_ec}), gap {}/{}",
        hot_ec - cold_ec,
        params.th_cold_data_migration
    );

    ctx.lines.remove_full(hot_id);
    do_gc(gc_state, ctx, hot_id, false)?;

    ctx.lines.remove_full(cold_id);
    do_gc(gc_state, ctx, cold_id, true)?;

    retag(ctx.lines, hot_id, Pool::Cold);
    retag(ctx.lines, cold_id, Pool::Hot);
    stats.cold_data_migration_cnt += 1;
    Ok(true)
}

/// Runs one full wear-leveling pass: cold-data migration until it stops
/// triggering, then one hot-pool check, then one cold-pool check — the
/// order `dual_pool` in the original runs its three checks in.
///
/// # Errors
/// [`WlError::Gc`] if a cold-data migration relocation fails.
pub fn run_wear_leveling(gc_state: &mut GcState, stats: &mut WlStats, ctx: &mut GcCtx<'_>, params: WlParams, excluded: &[LineId]) -> Result<(), WlError> {
    while do_cold_data_migration(gc_state, stats, ctx, params, excluded)? {}
    do_hot_pool_adjustment(ctx.lines, stats, params);
    do_cold_pool_adjustment(ctx.lines, stats, params);
    Ok(())
}
