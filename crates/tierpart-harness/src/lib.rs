//! Scenario harness for the tierpart partition allocator.
//!
//! This crate drives a [`tierpart_core::TieredPartition`] through repeatable
//! scenarios and emits structured reports:
//! - Layout: build a partition and dump every tier's free chain
//! - Churn: run a seeded allocate/release workload and summarize the
//!   pop/split/merge/exhaustion traffic it produced

#![forbid(unsafe_code)]

pub mod scenario;

pub use scenario::{ChurnReport, LayoutReport, ScenarioError, run_churn, run_layout};
