use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use cinder_core::{
    block_proof, equivalent_time as work_equivalent_time,
    hash::u256_to_hex,
    next_work_required,
    pow::{check_headers_pow, check_target_range},
    utils::Saveable,
    BlockHash, BlockTree, ChainIndex, Compact, ConsensusParams, HeaderChain,
};
use log::{error, info, warn};
use std::path::Path;

fn format_time(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(time) => time.to_rfc3339(),
        None => format!("{} (out of range)", timestamp),
    }
}

fn load_chain(path: &Path) -> Result<HeaderChain> {
    let chain = HeaderChain::load_from_file(path)
        .with_context(|| format!("Failed to load header chain from {}", path.display()))?;
    info!("Loaded {} headers from {}", chain.len(), path.display());
    Ok(chain)
}

fn build_tree(chain: &HeaderChain, params: &ConsensusParams) -> Result<BlockTree> {
    let mut tree = BlockTree::new();
    for (position, header) in chain.iter().enumerate() {
        tree.connect_header(header, params)
            .with_context(|| format!("Header {} ({}) was rejected", position, header.hash))?;
    }
    Ok(tree)
}

pub fn target(bits: Compact, params: &ConsensusParams) -> Result<()> {
    let decoded = bits.decode();

    println!("Bits:      {}", bits);
    println!("Negative:  {}", decoded.negative);
    println!("Overflow:  {}", decoded.overflow);
    println!("Target:    {}", u256_to_hex(&decoded.value));
    println!("Encoded:   {}", Compact::from_target(&decoded.value));
    println!("Work:      {}", block_proof(bits));

    match check_target_range(bits, params) {
        Ok(_) => println!("Within the proof-of-work limit {}", params.pow_limit_compact()),
        Err(e) => println!("Not a valid target for this network: {}", e),
    }
    Ok(())
}

pub fn check_pow(hash: &BlockHash, bits: Compact, params: &ConsensusParams) -> Result<()> {
    match cinder_core::check_proof_of_work(hash, bits, params) {
        Ok(()) => {
            println!("Proof-of-work valid: {} meets {}", hash, bits);
            Ok(())
        }
        Err(e) => {
            error!("Proof-of-work invalid: {}", e);
            Err(anyhow!(e))
        }
    }
}

pub fn verify(path: &Path, params: &ConsensusParams) -> Result<()> {
    let chain = load_chain(path)?;

    // Stateless hash checks before replaying the difficulty schedule.
    let failures: Vec<_> = check_headers_pow(&chain, params)
        .into_iter()
        .enumerate()
        .filter_map(|(position, result)| result.err().map(|e| (position, e)))
        .collect();
    if !failures.is_empty() {
        for (position, e) in &failures {
            warn!("Header {} ({}): {}", position, chain[*position].hash, e);
        }
        bail!("{} of {} headers fail proof-of-work", failures.len(), chain.len());
    }

    let tree = build_tree(&chain, params)?;
    let tip_id = tree
        .tip()
        .ok_or_else(|| anyhow!("Chain file {} has no headers", path.display()))?;
    let tip = tree.entry(tip_id);

    println!("Verified {} headers", tree.len());
    println!("Best tip:   {}", tip.hash());
    println!("Height:     {}", tip.height());
    println!("Time:       {}", format_time(tip.time()));
    println!("Bits:       {}", tip.bits());
    println!("Chain work: {}", u256_to_hex(tip.chain_work()));
    Ok(())
}

/// One spacing after the best tip, or zero for an empty tree.
fn default_candidate_time(tree: &BlockTree, params: &ConsensusParams) -> i64 {
    tree.tip().map_or(0, |tip| {
        tree.entry(tip).time().saturating_add(params.target_spacing)
    })
}

pub fn next(path: &Path, time: Option<i64>, params: &ConsensusParams) -> Result<()> {
    let tree = build_tree(&load_chain(path)?, params)?;
    let tip = tree.tip();
    let candidate_time = time.unwrap_or_else(|| default_candidate_time(&tree, params));

    let bits = next_work_required(&tree, tip, candidate_time, params)
        .context("Chain state cannot be retargeted")?;

    match tip {
        Some(tip) => println!(
            "Next block at height {} (time {})",
            tree.entry(tip).height() + 1,
            format_time(candidate_time)
        ),
        None => println!("Next block is the genesis block"),
    }
    println!("Required bits: {}", bits);
    Ok(())
}

pub fn equivalent_time(
    path: &Path,
    to: u64,
    from: u64,
    tip: Option<u64>,
    params: &ConsensusParams,
) -> Result<()> {
    let tree = build_tree(&load_chain(path)?, params)?;
    let lookup = |height: u64| {
        tree.at_height(height)
            .map(|id| tree.entry(id))
            .ok_or_else(|| anyhow!("No block at height {} on the best chain", height))
    };

    let to_entry = lookup(to)?;
    let from_entry = lookup(from)?;
    let tip_entry = match tip {
        Some(height) => lookup(height)?,
        None => {
            let id = tree
                .tip()
                .ok_or_else(|| anyhow!("Chain file {} has no headers", path.display()))?;
            tree.entry(id)
        }
    };

    let seconds = work_equivalent_time(to_entry, from_entry, tip_entry, params);
    println!(
        "Work between heights {} and {} is worth {} seconds at the difficulty of height {}",
        from,
        to,
        seconds,
        tip_entry.height()
    );
    Ok(())
}

pub fn print_params(params: &ConsensusParams) -> Result<()> {
    print!("{}", params.to_toml()?);
    Ok(())
}
