// Workload driver for the merkle blob.
// 2 sub-commands
// - run (seeded insert/delete mix, optional batch inserts, proves every live key)
// - verify (loads a blob written by run and checks links, hashes and proofs)
use std::fs;

use anyhow::{bail, Context, Result};
use bench_merkleblob::common::{cli, utils, workload};
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    let args = cli::BenchmarkCli::parse();
    utils::init_logging(&args.log_level);

    let summary = match &args.command {
        Some(cli::Command::Run {
            ops,
            delete_percent,
            batch_size,
            blob_file,
        }) => {
            let (blob, summary) =
                workload::run_mixed_workload(args.seed, *ops, *delete_percent, *batch_size)?;
            if !blob_file.is_empty() {
                fs::write(blob_file, blob.blob())
                    .with_context(|| format!("writing blob to {}", blob_file))?;
                info!("Blob of {} bytes written to {}", blob.blob().len(), blob_file);
            }
            summary
        }
        Some(cli::Command::Verify { blob_file }) => {
            let bytes =
                fs::read(blob_file).with_context(|| format!("reading blob from {}", blob_file))?;
            workload::verify_blob(bytes)?
        }
        None => {
            bail!(
                "No command provided: valid commands are run and verify. Use --help to see all options."
            );
        }
    };

    info!(
        "{}: {} live keys in {} slots, max lineage {}",
        summary.command, summary.live_keys, summary.slots, summary.max_lineage
    );
    utils::write_summary(&summary, &args.output)
}
