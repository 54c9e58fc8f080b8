//! Structured lifecycle trace.
//!
//! Every layout, allocation, and release appends one record to an in-state
//! log so callers can reconstruct what the partition did without attaching a
//! debugger to the target. Tracing is purely diagnostic: no operation
//! consults the log for correctness, and draining it is always safe.

use serde::{Deserialize, Serialize};

/// Severity of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Trace,
    Debug,
    Info,
    Warn,
}

/// One partition lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Monotonic event id, starting at 1.
    pub seq: u64,
    /// Severity level.
    pub level: TraceLevel,
    /// Boundary operation (`create`, `allocate`, `release`).
    pub op: &'static str,
    /// Event kind (`layout`, `pop`, `split`, `merge`, `insert`, ...).
    pub event: &'static str,
    /// Tier involved, when one is.
    pub tier: Option<usize>,
    /// Arena offset involved, when one is.
    pub offset: Option<usize>,
    /// Block size served or scanned, when relevant.
    pub block_size: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
}

/// Append-only event log owned by the partition state.
pub(crate) struct TraceLog {
    next_seq: u64,
    records: Vec<TraceRecord>,
}

impl TraceLog {
    pub(crate) fn new() -> Self {
        Self {
            next_seq: 1,
            records: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record(
        &mut self,
        level: TraceLevel,
        op: &'static str,
        event: &'static str,
        tier: Option<usize>,
        offset: Option<usize>,
        block_size: Option<usize>,
        outcome: &'static str,
    ) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.records.push(TraceRecord {
            seq,
            level,
            op,
            event,
            tier,
            offset,
            block_size,
            outcome,
        });
    }

    pub(crate) fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub(crate) fn drain(&mut self) -> Vec<TraceRecord> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_carry_monotonic_seq_ids() {
        let mut log = TraceLog::new();
        log.record(TraceLevel::Trace, "allocate", "pop", Some(0), Some(0), Some(16), "success");
        log.record(TraceLevel::Warn, "allocate", "exhausted", Some(2), None, None, "denied");
        let records = log.drain();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, 1);
        assert_eq!(records[1].seq, 2);
        assert!(log.records().is_empty());
    }
}
