//! CLI entrypoint for the tierpart scenario harness.

use clap::{Parser, Subcommand};

/// Scenario tooling for the tierpart partition allocator.
#[derive(Debug, Parser)]
#[command(name = "tierpart-harness")]
#[command(about = "Scenario harness for the tierpart partition allocator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a partition and dump every tier's initial free chain.
    Layout {
        /// Blocks per tier (the layout threads nblks - 1 rows).
        #[arg(long, default_value_t = 8)]
        nblks: usize,
        /// Tier-0 block size in bytes.
        #[arg(long, default_value_t = 16)]
        granularity: usize,
        /// Number of size classes.
        #[arg(long, default_value_t = 4)]
        tiers: usize,
        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Run a seeded allocate/release workload and summarize the traffic.
    Churn {
        /// Blocks per tier (the layout threads nblks - 1 rows).
        #[arg(long, default_value_t = 8)]
        nblks: usize,
        /// Tier-0 block size in bytes.
        #[arg(long, default_value_t = 16)]
        granularity: usize,
        /// Number of size classes.
        #[arg(long, default_value_t = 4)]
        tiers: usize,
        /// Number of operations to run.
        #[arg(long, default_value_t = 1000)]
        ops: usize,
        /// Workload seed; identical seeds reproduce identical reports.
        #[arg(long, default_value_t = 0xDEAD_BEEF)]
        seed: u64,
        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Layout {
            nblks,
            granularity,
            tiers,
            json,
        } => {
            let report = tierpart_harness::run_layout(nblks, granularity, tiers)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::Churn {
            nblks,
            granularity,
            tiers,
            ops,
            seed,
            json,
        } => {
            let report = tierpart_harness::run_churn(nblks, granularity, tiers, ops, seed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
    }

    Ok(())
}
