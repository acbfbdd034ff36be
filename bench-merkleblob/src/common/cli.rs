use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Subcommand, Debug, Serialize, Clone)]
pub enum Command {
    /// Run a mixed insert/delete workload, then prove every remaining key
    Run {
        /// Total number of insert and delete operations
        #[arg(long, default_value_t = 200_000)]
        ops: u64,

        /// Percentage of operations that delete a random live key
        #[arg(long, default_value_t = 30)]
        delete_percent: u64,

        /// Keys per batch_insert call; 0 inserts one key at a time
        #[arg(long, default_value_t = 0)]
        batch_size: usize,

        /// Write the final blob to this file
        #[arg(long, default_value = "")]
        blob_file: String,
    },
    /// Load a blob written by `run` and check its consistency
    Verify {
        #[arg(long)]
        blob_file: String,
    },
}

#[derive(Parser, Debug, Serialize, Clone)]
pub struct BenchmarkCli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Seed for key generation and operation choice
    #[arg(long, default_value_t = 100)]
    pub seed: u64,

    /// Output filename for the JSON summary; printed to stdout if empty
    #[arg(long, default_value = "")]
    pub output: String,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
