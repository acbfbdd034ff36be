use std::time::Instant;

use anyhow::{ensure, Context, Result};
use log::{debug, info};
use merkleblob::config::Config;
use merkleblob::merkletree::helpers::{generate_hash, generate_kvid, SeededStream};
use merkleblob::{KvId, MerkleBlob};

use crate::common::utils::RunSummary;

fn root_hex(blob: &MerkleBlob) -> Result<String> {
    Ok(blob.get_root_hash()?.map(hex::encode).unwrap_or_default())
}

/// Applies `ops` seeded operations, then proves every remaining key.
pub fn run_mixed_workload(
    seed: u64,
    ops: u64,
    delete_percent: u64,
    batch_size: usize,
) -> Result<(MerkleBlob, RunSummary)> {
    ensure!(delete_percent <= 100, "delete_percent must be at most 100");
    let start = Instant::now();
    let mut blob = MerkleBlob::empty(Config::default());
    let mut random = SeededStream::new(seed);
    let mut live: Vec<KvId> = Vec::new();
    let mut pending: Vec<(KvId, KvId)> = Vec::new();
    let mut pending_hashes = Vec::new();
    let mut summary = RunSummary {
        command: "run".to_string(),
        ..Default::default()
    };

    for op in 0..ops {
        if op > 0 && op % 100_000 == 0 {
            debug!("{} ops applied, {} live keys", op, blob.len());
        }
        if random.chance(delete_percent) && !live.is_empty() {
            let pos = random.below(live.len() as u64) as usize;
            blob.delete(live.swap_remove(pos))?;
            summary.deletes += 1;
            continue;
        }
        // distinct run seeds draw keys from disjoint seed ranges
        let key_seed = (seed << 32).wrapping_add(op);
        let (key, value) = generate_kvid(key_seed);
        summary.inserts += 1;
        if batch_size == 0 {
            blob.insert(key, value, generate_hash(key_seed))?;
            live.push(key);
            continue;
        }
        pending.push((key, value));
        pending_hashes.push(generate_hash(key_seed));
        if pending.len() == batch_size {
            blob.batch_insert(&pending, &pending_hashes)?;
            live.extend(pending.drain(..).map(|(key, _)| key));
            pending_hashes.clear();
        }
    }
    if !pending.is_empty() {
        blob.batch_insert(&pending, &pending_hashes)?;
        live.extend(pending.drain(..).map(|(key, _)| key));
    }
    info!(
        "Applied {} inserts and {} deletes in {:.2}s",
        summary.inserts,
        summary.deletes,
        start.elapsed().as_secs_f64()
    );

    blob.calculate_lazy_hashes()?;
    let root = blob.get_root_hash()?;
    for key in live.iter() {
        let proof = blob.get_proof_of_inclusion(*key)?;
        ensure!(
            root.is_some_and(|root| proof.valid_for_root(&root)),
            "proof for key {} does not verify",
            key
        );
        let index = blob.get_key_index(*key)?;
        summary.max_lineage = summary.max_lineage.max(blob.get_lineage_indexes(index)?.len());
    }
    summary.proofs_checked = live.len();
    fill_shape(&blob, &mut summary)?;
    summary.duration_secs = start.elapsed().as_secs_f64();
    Ok((blob, summary))
}

/// Loads a persisted blob and runs the full consistency check on it.
pub fn verify_blob(bytes: Vec<u8>) -> Result<RunSummary> {
    let start = Instant::now();
    let mut blob = MerkleBlob::with_config(bytes, Config::verified())
        .context("loading blob failed verification")?;
    blob.calculate_lazy_hashes()?;
    let mut summary = RunSummary {
        command: "verify".to_string(),
        ..Default::default()
    };
    for key in blob.get_keys_values()?.keys() {
        ensure!(
            blob.get_proof_of_inclusion(*key)?.valid(),
            "proof for key {} does not verify",
            key
        );
        let index = blob.get_key_index(*key)?;
        summary.max_lineage = summary.max_lineage.max(blob.get_lineage_indexes(index)?.len());
        summary.proofs_checked += 1;
    }
    fill_shape(&blob, &mut summary)?;
    summary.duration_secs = start.elapsed().as_secs_f64();
    Ok(summary)
}

fn fill_shape(blob: &MerkleBlob, summary: &mut RunSummary) -> Result<()> {
    summary.live_keys = blob.len();
    summary.slots = blob.slot_count();
    summary.free_slots = blob.free_slot_count();
    summary.root_hash = root_hex(blob)?;
    Ok(())
}
