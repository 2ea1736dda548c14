mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cinder_core::{BlockHash, Compact, ConsensusParams, Network};
use log::info;
use std::path::PathBuf;

/// Inspect compact targets and check difficulty rules on header chains.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Network whose consensus parameters to use.
    #[arg(short, long, default_value = "main")]
    network: Network,

    /// TOML file with consensus parameters, replacing the network preset.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore the min-difficulty and no-retargeting relaxations.
    #[arg(long)]
    force_retarget: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a compact target and show its value and work.
    Target {
        /// Compact bits, in hex.
        bits: Compact,
    },
    /// Check a block hash against compact bits.
    CheckPow {
        /// Block hash, 64 hex digits.
        hash: BlockHash,
        /// Compact bits, in hex.
        bits: Compact,
    },
    /// Connect every header of a chain file, checking difficulty and proof-of-work.
    Verify {
        /// JSON file with headers in connection order.
        chain: PathBuf,
    },
    /// Compute the bits required for the block after the best tip.
    Next {
        /// JSON file with headers in connection order.
        chain: PathBuf,
        /// Timestamp of the candidate block. Defaults to one spacing after the tip.
        #[arg(short, long)]
        time: Option<i64>,
    },
    /// Time the network needs to produce the work between two heights.
    EquivalentTime {
        /// JSON file with headers in connection order.
        chain: PathBuf,
        /// Height of the block to measure up to.
        to: u64,
        /// Height of the block to measure from.
        from: u64,
        /// Height whose difficulty sets the rate. Defaults to the best tip.
        #[arg(long)]
        tip: Option<u64>,
    },
    /// Print the effective consensus parameters as TOML.
    Params,
}

fn load_params(cli: &Cli) -> Result<ConsensusParams> {
    let mut params = match &cli.config {
        Some(path) => ConsensusParams::load_from_file(path)?,
        None => ConsensusParams::for_network(cli.network),
    };
    if cli.force_retarget {
        params.force_retarget = true;
    }
    params
        .validate()
        .context("Consensus parameters are not usable")?;
    Ok(params)
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let cli = Cli::parse();
    let params = load_params(&cli)?;
    info!(
        "Using {} consensus parameters",
        match &cli.config {
            Some(path) => path.display().to_string(),
            None => cli.network.to_string(),
        }
    );

    match cli.command {
        Command::Target { bits } => commands::target(bits, &params),
        Command::CheckPow { hash, bits } => commands::check_pow(&hash, bits, &params),
        Command::Verify { chain } => commands::verify(&chain, &params),
        Command::Next { chain, time } => commands::next(&chain, time, &params),
        Command::EquivalentTime {
            chain,
            to,
            from,
            tip,
        } => commands::equivalent_time(&chain, to, from, tip, &params),
        Command::Params => commands::print_params(&params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "cinder",
            "--network",
            "testnet",
            "--force-retarget",
            "check-pow",
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            "1d00ffff",
        ])
        .unwrap();
        assert_eq!(cli.network, Network::Testnet);
        assert!(cli.force_retarget);
        match cli.command {
            Command::CheckPow { bits, .. } => assert_eq!(bits, Compact(0x1d00ffff)),
            other => panic!("unexpected command {:?}", other),
        }

        let params = load_params(&cli).unwrap();
        assert!(params.force_retarget);
        assert!(params.allow_min_difficulty_blocks);
    }

    #[test]
    fn test_rejects_unknown_network() {
        assert!(Cli::try_parse_from(["cinder", "--network", "moon", "params"]).is_err());
    }
}
