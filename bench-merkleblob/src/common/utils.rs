use std::fs::File;
use std::io::Write;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

pub fn init_logging(max_level: &str) {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(max_level));
}

#[derive(Serialize, Debug, Default)]
pub struct RunSummary {
    pub command: String,
    pub inserts: u64,
    pub deletes: u64,
    pub live_keys: usize,
    pub slots: usize,
    pub free_slots: usize,
    pub max_lineage: usize,
    pub proofs_checked: usize,
    pub root_hash: String,
    pub duration_secs: f64,
}

pub fn write_summary(summary: &RunSummary, output: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    if output.is_empty() {
        println!("{}", json);
        return Ok(());
    }
    let mut file = File::create(output).with_context(|| format!("creating {}", output))?;
    file.write_all(json.as_bytes())?;
    info!("Summary written to {}", output);
    Ok(())
}
