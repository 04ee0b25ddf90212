//! Read-only admin/telemetry commands (`SPEC_FULL.md` §2.1/§2.2): `PrintCmt`
//! and `PrintEc`, mirroring the original's `print_cmt_`/`print_erase_cnt_`
//! debug dumps as typed reports instead of formatted text.

use dftl_lines::{LineId, Pool};

use crate::Dftl;
pub use dftl_cmt::CmtStats;

/// `PrintCmt`'s payload: every partition's CMT hit/miss telemetry, plus the
/// sum across all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmtReport {
    /// One entry per partition, in instance order.
    pub per_partition: Vec<CmtStats>,
    /// The sum of every partition's counters.
    pub aggregate: CmtStats,
}

/// `PrintEc`'s `cdw2[0]` verbosity selector (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcVerbosity {
    /// Just the device-wide total and average erase count.
    Totals,
    /// Per-pool totals and averages.
    Pools,
    /// Per-pool totals and averages, plus every line's individual erase
    /// count and effective erase count.
    PoolsWithEec,
}

/// One line's erase telemetry, reported at [`EcVerbosity::PoolsWithEec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEcReport {
    /// The line's id.
    pub line: LineId,
    /// Its current wear-leveling pool.
    pub pool: Pool,
    /// Lifetime erase count.
    pub erase_cnt: u64,
    /// Effective erase count (reset on a pool transition).
    pub eec: u64,
}

/// One pool's aggregate erase telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolEcTotals {
    /// Number of lines currently tagged this pool.
    pub line_cnt: u32,
    /// Sum of every such line's `erase_cnt`.
    pub total_erase_cnt: u64,
}

/// `PrintEc`'s payload, shaped by the requested [`EcVerbosity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EraseCountReport {
    /// Device-wide total erase count and the number of lines it's spread over.
    Totals {
        /// Sum of every line's `erase_cnt`, across every partition.
        total_erase_cnt: u64,
        /// Total number of lines summed (`tt_lines * nr_parts`).
        line_cnt: u32,
    },
    /// Per-pool totals, summed across every partition.
    Pools {
        /// Hot-pool totals.
        hot: PoolEcTotals,
        /// Cold-pool totals.
        cold: PoolEcTotals,
    },
    /// Per-pool totals plus every individual line's erase telemetry, one
    /// inner vector per partition in instance order.
    PoolsWithEec {
        /// Hot-pool totals.
        hot: PoolEcTotals,
        /// Cold-pool totals.
        cold: PoolEcTotals,
        /// Every line's individual report, grouped by partition.
        lines: Vec<Vec<LineEcReport>>,
    },
}

impl Dftl {
    /// `PrintCmt`: every partition's CMT hit/miss/cold-miss/flush counters,
    /// plus their sum.
    #[must_use]
    pub fn print_cmt(&self) -> CmtReport {
        let per_partition: Vec<CmtStats> = self.instances.iter().map(|inst| inst.cmt.stats()).collect();
        let aggregate = per_partition.iter().fold(CmtStats::default(), |acc, s| CmtStats {
            hit_cnt: acc.hit_cnt + s.hit_cnt,
            miss_cnt: acc.miss_cnt + s.miss_cnt,
            read_miss_cnt: acc.read_miss_cnt + s.read_miss_cnt,
            write_miss_cnt: acc.write_miss_cnt + s.write_miss_cnt,
            cold_miss_cnt: acc.cold_miss_cnt + s.cold_miss_cnt,
            flush_cnt: acc.flush_cnt + s.flush_cnt,
        });
        CmtReport { per_partition, aggregate }
    }

    /// `PrintEc`: per-line/per-pool erase-count telemetry at the requested
    /// verbosity, mirroring the original's `print_erase_cnt_`.
    #[must_use]
    pub fn print_ec(&self, verbosity: EcVerbosity) -> EraseCountReport {
        match verbosity {
            EcVerbosity::Totals => {
                let mut total_erase_cnt = 0u64;
                let mut line_cnt = 0u32;
                for inst in &self.instances {
                    for line in inst.lines.iter() {
                        total_erase_cnt += line.erase_cnt();
                        line_cnt += 1;
                    }
                }
                EraseCountReport::Totals { total_erase_cnt, line_cnt }
            }
            EcVerbosity::Pools => {
                let (hot, cold) = self.pool_totals();
                EraseCountReport::Pools { hot, cold }
            }
            EcVerbosity::PoolsWithEec => {
                let (hot, cold) = self.pool_totals();
                let lines = self
                    .instances
                    .iter()
                    .map(|inst| {
                        inst.lines
                            .iter()
                            .map(|line| LineEcReport {
                                line: line.id(),
                                pool: line.pool(),
                                erase_cnt: line.erase_cnt(),
                                eec: line.eec(),
                            })
                            .collect()
                    })
                    .collect();
                EraseCountReport::PoolsWithEec { hot, cold, lines }
            }
        }
    }

    fn pool_totals(&self) -> (PoolEcTotals, PoolEcTotals) {
        let mut hot = PoolEcTotals::default();
        let mut cold = PoolEcTotals::default();
        for inst in &self.instances {
            for line in inst.lines.iter() {
                let totals = match line.pool() {
                    Pool::Hot => &mut hot,
                    Pool::Cold => &mut cold,
                };
                totals.line_cnt += 1;
                totals.total_erase_cnt += line.erase_cnt();
            }
        }
        (hot, cold)
    }
}
