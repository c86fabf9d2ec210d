//! # Main — CLI Entry Point
//!
//! Routes subcommands to the test drivers. Handles the shared concerns:
//! structured logging initialization, rayon thread-pool configuration, and
//! the save/proof directory options.

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "mersforge", about = "Mersenne primality tests with compact proofs")]
struct Cli {
    /// Directory for the live-state files (.mers, .loop, ...)
    #[arg(long, default_value = ".")]
    save_path: PathBuf,

    /// Root of the <E>/proof snapshot tree
    #[arg(long, default_value = ".")]
    proof_root: PathBuf,

    /// Seconds between live-state backups
    #[arg(long, default_value_t = 120)]
    backup_interval: u64,

    /// Rayon thread pool size (0 = all cores)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// PRP-3 test with proof generation
    Prp {
        /// Prime exponent p of M_p = 2^p - 1
        exponent: u32,

        /// Proof power (2-12); derived from the exponent when omitted
        #[arg(long)]
        power: Option<u32>,

        /// Write the proof artifact as JSON to this path
        #[arg(long)]
        proof_out: Option<PathBuf>,
    },

    /// Lucas-Lehmer test (no proof)
    Ll { exponent: u32 },

    /// Pollard P-1 stage 1 on the Mersenne cofactor
    Pm1 {
        exponent: u32,

        /// Stage-1 smoothness bound
        #[arg(long, default_value_t = 1_000_000)]
        b1: u64,

        /// Stage-2 bound (0 = stage 1 only); reserved for device stage 2
        #[arg(long, default_value_t = 0)]
        b2: u64,
    },

    /// Generate the proof from an existing snapshot set
    Proof {
        exponent: u32,

        #[arg(long)]
        power: Option<u32>,

        /// Output path for the JSON proof artifact
        #[arg(long, default_value = "proof.json")]
        out: PathBuf,
    },

    /// Report the checkpoint schedule and predicted disk usage
    Info {
        exponent: u32,

        #[arg(long)]
        power: Option<u32>,
    },
}

fn main() -> Result<()> {
    // Structured logging: LOG_FORMAT=json for fleet collection, otherwise
    // human-readable on stderr.
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);
    cli::run(&cli)
}
