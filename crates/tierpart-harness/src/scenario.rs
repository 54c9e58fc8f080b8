//! Repeatable partition scenarios and their reports.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tierpart_core::{PartitionError, PartitionSnapshot, TieredPartition};

/// Failures a scenario run can report.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The partition itself rejected the scenario's parameters.
    #[error("partition error: {0}")]
    Partition(#[from] PartitionError),

    /// The layout parameters overflow the arena size computation.
    #[error("layout parameters overflow: nblks={nblks} granularity={granularity} tiers={tiers}")]
    LayoutOverflow {
        nblks: usize,
        granularity: usize,
        tiers: usize,
    },
}

/// Report for the layout scenario: the partition as built, before any
/// allocation traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutReport {
    pub nblks: usize,
    pub granularity: usize,
    pub tier_count: usize,
    pub arena_bytes: usize,
    pub snapshot: PartitionSnapshot,
}

impl fmt::Display for LayoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "layout: nblks={} granularity={} tiers={} arena={}B",
            self.nblks, self.granularity, self.tier_count, self.arena_bytes
        )?;
        write!(f, "{}", self.snapshot)
    }
}

/// Report for the churn scenario: a seeded allocate/release workload and the
/// traffic it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnReport {
    pub seed: u64,
    pub ops: usize,
    /// Requests served straight from the home tier's head.
    pub pops: usize,
    /// Requests served by borrowing and splitting a larger tier's block.
    pub splits: usize,
    /// Releases absorbed by an adjacent free neighbor.
    pub merges: usize,
    /// Releases reinserted at the home tier's head.
    pub inserts: usize,
    /// Requests denied because no tier at or above the target had capacity.
    pub exhaustions: usize,
    /// Blocks still held when the workload ended.
    pub live_at_end: usize,
    pub final_snapshot: PartitionSnapshot,
}

impl fmt::Display for ChurnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "churn: seed={:#x} ops={} pops={} splits={} merges={} inserts={} exhaustions={} live={}",
            self.seed,
            self.ops,
            self.pops,
            self.splits,
            self.merges,
            self.inserts,
            self.exhaustions,
            self.live_at_end
        )?;
        write!(f, "{}", self.final_snapshot)
    }
}

/// Builds a partition with the given parameters and reports its initial
/// free-chain layout.
pub fn run_layout(
    nblks: usize,
    granularity: usize,
    tier_count: usize,
) -> Result<LayoutReport, ScenarioError> {
    let arena_bytes = TieredPartition::required_bytes(nblks, granularity, tier_count).ok_or(
        ScenarioError::LayoutOverflow {
            nblks,
            granularity,
            tiers: tier_count,
        },
    )?;
    let partition =
        TieredPartition::with_tiers(vec![0u8; arena_bytes], nblks, granularity, tier_count)?;
    Ok(LayoutReport {
        nblks,
        granularity,
        tier_count,
        arena_bytes,
        snapshot: partition.snapshot(),
    })
}

/// Runs `ops` seeded allocate/release operations against a fresh partition
/// and summarizes the traffic from the lifecycle trace.
///
/// The workload is fully determined by `seed`, so two runs with the same
/// parameters produce identical reports.
pub fn run_churn(
    nblks: usize,
    granularity: usize,
    tier_count: usize,
    ops: usize,
    seed: u64,
) -> Result<ChurnReport, ScenarioError> {
    let arena_bytes = TieredPartition::required_bytes(nblks, granularity, tier_count).ok_or(
        ScenarioError::LayoutOverflow {
            nblks,
            granularity,
            tiers: tier_count,
        },
    )?;
    let partition =
        TieredPartition::with_tiers(vec![0u8; arena_bytes], nblks, granularity, tier_count)?;

    let mut live: Vec<(usize, usize)> = Vec::new();
    let mut rng = seed;
    let mut exhaustions = 0usize;

    // Request sizes stay within the base granularity, so every release
    // classifies back to tier 0 and the workload churns the pop, split,
    // merge, and insert paths without ever re-splitting a released parent.
    for _ in 0..ops {
        let r = lcg(&mut rng);
        if r % 2 == 0 || live.is_empty() {
            let size = ((r >> 8) as usize % granularity).max(1);
            match partition.allocate(size, granularity) {
                Ok(offset) => live.push((size, offset)),
                Err(PartitionError::Exhausted) => exhaustions += 1,
                Err(err) => return Err(err.into()),
            }
        } else {
            let idx = (r >> 4) as usize % live.len();
            let (size, offset) = live.swap_remove(idx);
            partition.release(size, granularity, offset)?;
        }
    }

    let mut pops = 0usize;
    let mut splits = 0usize;
    let mut merges = 0usize;
    let mut inserts = 0usize;
    for record in partition.drain_trace() {
        match record.event {
            "pop" => pops += 1,
            "split" => splits += 1,
            "merge" => merges += 1,
            "insert" => inserts += 1,
            _ => {}
        }
    }

    Ok(ChurnReport {
        seed,
        ops,
        pops,
        splits,
        merges,
        inserts,
        exhaustions,
        live_at_end: live.len(),
        final_snapshot: partition.snapshot(),
    })
}

fn lcg(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_report_lists_every_tier() {
        let report = run_layout(3, 16, 3).expect("layout");
        assert_eq!(report.arena_bytes, 224);
        assert_eq!(report.snapshot.tiers.len(), 3);
        for tier in &report.snapshot.tiers {
            assert_eq!(tier.free_count, 2);
            assert_eq!(tier.free_count, tier.free_blocks.len());
        }
    }

    #[test]
    fn layout_rejects_invalid_parameters() {
        assert!(matches!(
            run_layout(1, 16, 3),
            Err(ScenarioError::LayoutOverflow { .. })
        ));
        assert!(matches!(
            run_layout(3, 4, 3),
            Err(ScenarioError::Partition(
                PartitionError::InvalidGranularity(4)
            ))
        ));
    }

    #[test]
    fn churn_is_deterministic_per_seed() {
        let a = run_churn(8, 16, 4, 400, 0xDEAD_BEEF).expect("first run");
        let b = run_churn(8, 16, 4, 400, 0xDEAD_BEEF).expect("second run");
        assert_eq!(a.pops, b.pops);
        assert_eq!(a.splits, b.splits);
        assert_eq!(a.merges, b.merges);
        assert_eq!(a.exhaustions, b.exhaustions);
        assert_eq!(a.final_snapshot, b.final_snapshot);
    }

    #[test]
    fn churn_counters_account_for_every_operation() {
        let report = run_churn(8, 16, 4, 400, 0x5EED).expect("churn");
        let releases = report.merges + report.inserts;
        let allocations = report.pops + report.splits;
        assert_eq!(
            allocations + releases + report.exhaustions,
            report.ops,
            "every op is a served allocation, a release, or a denial"
        );
        assert_eq!(allocations, releases + report.live_at_end);
    }

    #[test]
    fn reports_serialize_to_json() {
        let report = run_layout(3, 16, 3).expect("layout");
        let json = serde_json::to_string(&report).expect("serialize");
        let back: LayoutReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.arena_bytes, report.arena_bytes);
        assert_eq!(back.snapshot, report.snapshot);
    }
}
