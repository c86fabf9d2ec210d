//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! execution logic for each subcommand: the PRP/LL/P−1 runs over the CPU
//! reference squarer, standalone proof generation from an existing snapshot
//! set, and the schedule/disk-usage report.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use mersforge::runner::{self, RunConfig};
use mersforge::squarer::CpuSquarer;
use mersforge::store::ProofStore;
use mersforge::{proof, schedule};
use tracing::info;

use super::{Cli, Commands};

fn run_config(cli: &Cli, exponent: u32, power: Option<u32>, b1: u64, b2: u64) -> RunConfig {
    RunConfig {
        exponent,
        power,
        proof_root: cli.proof_root.clone(),
        save_path: cli.save_path.clone(),
        backup_interval: Duration::from_secs(cli.backup_interval),
        b1,
        b2,
    }
}

/// Dispatch a subcommand. An external GPU pipeline would be plugged in
/// here through the `Squarer` trait; the binary ships the CPU reference.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Prp {
            exponent,
            power,
            proof_out,
        } => {
            let cfg = run_config(cli, *exponent, *power, 0, 0);
            let mut squarer = CpuSquarer::prp(*exponent);
            let (outcome, proof) = runner::run_prp(&mut squarer, &cfg)?;
            info!(?outcome, "PRP finished");

            if let Some(path) = proof_out {
                let json = serde_json::to_vec_pretty(&proof)?;
                fs::write(path, json)
                    .with_context(|| format!("writing proof to {}", path.display()))?;
                info!(path = %path.display(), "proof artifact written");
            }
            Ok(())
        }

        Commands::Ll { exponent } => {
            let cfg = run_config(cli, *exponent, None, 0, 0);
            let mut squarer = CpuSquarer::ll(*exponent);
            let outcome = runner::run_ll(&mut squarer, &cfg)?;
            info!(?outcome, "LL finished");
            Ok(())
        }

        Commands::Pm1 { exponent, b1, b2 } => {
            let cfg = run_config(cli, *exponent, None, *b1, *b2);
            match runner::run_pm1(&cfg)? {
                Some(factor) => info!(%factor, "factor found"),
                None => info!("no factor"),
            }
            Ok(())
        }

        Commands::Proof {
            exponent,
            power,
            out,
        } => {
            let power = power.unwrap_or_else(|| schedule::best_power(*exponent));
            let store = ProofStore::new(&cli.proof_root, *exponent, power)?;
            // Fail fast on any corrupt snapshot before the reduction starts.
            store.verify_to(*exponent)?;
            let proof = proof::compute_proof(&store)?;
            proof.validate()?;

            let json = serde_json::to_vec_pretty(&proof)?;
            fs::write(out, json).with_context(|| format!("writing proof to {}", out.display()))?;
            info!(path = %out.display(), "proof artifact written");
            Ok(())
        }

        Commands::Info { exponent, power } => {
            let power = power.unwrap_or_else(|| schedule::best_power(*exponent));
            info!(
                exponent,
                power,
                snapshots = 1u32 << power,
                disk_gb = format_args!("{:.2}", schedule::disk_usage_gb(*exponent, power)),
                "checkpoint schedule"
            );
            Ok(())
        }
    }
}

/// Configure the global rayon pool; 0 keeps the default (all cores).
pub fn configure_rayon(threads: usize) {
    if threads > 0 {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            tracing::warn!(error = %err, "could not configure rayon thread pool");
        }
    }
}
