//! # Runner — PRP, Lucas-Lehmer and P−1 Drivers
//!
//! Glues the squarer, the checkpoint schedule, the proof store and the
//! backup manager into the long-running test loops. The drivers own the
//! iteration counter; everything else is consulted per iteration.
//!
//! ## Loop Structure
//!
//! Resume reads the loop file before the residue snapshot; a loop value of
//! `k+1` guarantees the snapshot holds the residue at iteration `k`. During
//! the run, proof snapshots are written the moment their iteration
//! completes, and the live state is backed up on a wall-clock interval.
//! The backup writes the residue before the loop file, so a crash between
//! the two only ever loses the newer snapshot, never consistency.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use anyhow::Result;
use rug::integer::Order;
use rug::Integer;
use tracing::{info, warn};

use crate::backup::{BackupManager, TestMode};
use crate::p1;
use crate::proof::{self, Proof};
use crate::progress::Progress;
use crate::schedule;
use crate::squarer::Squarer;
use crate::store::ProofStore;
use crate::words;

/// Paths, bounds and cadence for one run.
pub struct RunConfig {
    pub exponent: u32,
    /// Proof power; `None` selects [`schedule::best_power`].
    pub power: Option<u32>,
    /// Root of the `<E>/proof/` snapshot tree.
    pub proof_root: PathBuf,
    /// Directory for the `.mers`/`.loop` state files.
    pub save_path: PathBuf,
    pub backup_interval: Duration,
    /// P−1 smoothness bounds; unused by PRP/LL.
    pub b1: u64,
    pub b2: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PrpOutcome {
    ProbablePrime,
    Composite { res64: u64 },
}

#[derive(Debug, PartialEq, Eq)]
pub enum LlOutcome {
    Prime,
    Composite { res64: u64 },
}

/// Run the PRP-3 test to iteration E and build the proof.
///
/// The test declares M_E a probable prime iff `3^(2^E) ≡ 9 (mod M_E)`:
/// `2^E = M_E + 1`, so for prime M_E Fermat gives
/// `3^(M_E + 1) = 3^(M_E − 1) · 3² ≡ 9`.
pub fn run_prp(squarer: &mut dyn Squarer, cfg: &RunConfig) -> Result<(PrpOutcome, Proof)> {
    let e = cfg.exponent;
    let power = cfg.power.unwrap_or_else(|| schedule::best_power(e));
    info!(
        e,
        power,
        disk_gb = format_args!("{:.2}", schedule::disk_usage_gb(e, power)),
        "starting PRP test"
    );

    let store = ProofStore::new(&cfg.proof_root, e, power)?;
    let backup = BackupManager::new(&cfg.save_path, e, TestMode::Prp, 0, 0)?;

    let mut x = vec![0u64; squarer.word_len()];
    let next = backup.load_state(&mut x) as u32;
    if next > 0 && !store.is_valid_to(next) {
        warn!(
            resume = next,
            "proof snapshots missing below the resume point; the run will \
             finish but proof generation will fail"
        );
    }
    squarer.write_words(&x);

    let start = if next == 0 { 1 } else { next };
    let progress = Progress::new(e as u64);
    progress.iterations.store(start as u64 - 1, Ordering::Relaxed);
    *progress.stage.lock().unwrap() = format!("PRP M{}", e);
    let reporter = progress.start_reporter();

    let mut last_backup = Instant::now();
    for k in start..=e {
        squarer.advance();
        progress.iterations.fetch_add(1, Ordering::Relaxed);

        if store.schedule().is_checkpoint(k) {
            let residue = words::from_device(&squarer.read_words(), e);
            store.save(k, &residue)?;
            progress.snapshots.fetch_add(1, Ordering::Relaxed);
        }

        if last_backup.elapsed() >= cfg.backup_interval || k == e {
            let host = squarer.read_words();
            backup.save_state(&host, k as u64, None)?;
            last_backup = Instant::now();
        }
    }

    progress.stop();
    drop(reporter);

    let final_words = words::from_device(&squarer.read_words(), e);
    let fingerprint = words::res64(&final_words);
    let outcome = if words::to_integer(&final_words) == 9u32 {
        info!(e, "PRP: M{} is a probable prime", e);
        PrpOutcome::ProbablePrime
    } else {
        info!(e, res64 = format_args!("{:016x}", fingerprint), "PRP: composite");
        PrpOutcome::Composite { res64: fingerprint }
    };

    let proof = proof::compute_proof(&store)?;
    Ok((outcome, proof))
}

/// Run the Lucas-Lehmer test: E−2 iterations of `x ← x² − 2` from 4.
///
/// No proof is produced; the compact proof construction needs the plain
/// squaring sequence, which LL does not provide.
pub fn run_ll(squarer: &mut dyn Squarer, cfg: &RunConfig) -> Result<LlOutcome> {
    let e = cfg.exponent;
    let total = e - 2;
    info!(e, "starting Lucas-Lehmer test");

    let backup = BackupManager::new(&cfg.save_path, e, TestMode::Ll, 0, 0)?;

    let mut x = vec![0u64; squarer.word_len()];
    let next = backup.load_state(&mut x) as u32;
    squarer.write_words(&x);

    let start = if next == 0 { 1 } else { next };
    let progress = Progress::new(total as u64);
    progress.iterations.store(start as u64 - 1, Ordering::Relaxed);
    *progress.stage.lock().unwrap() = format!("LL M{}", e);
    let reporter = progress.start_reporter();

    let mut last_backup = Instant::now();
    for k in start..=total {
        squarer.advance();
        progress.iterations.fetch_add(1, Ordering::Relaxed);

        if last_backup.elapsed() >= cfg.backup_interval || k == total {
            let host = squarer.read_words();
            backup.save_state(&host, k as u64, None)?;
            last_backup = Instant::now();
        }
    }

    progress.stop();
    drop(reporter);

    let value = words::to_integer(&words::from_device(&squarer.read_words(), e));
    // 0 and M_E are the same residue class; the device may report either.
    let is_zero = value.cmp0() == std::cmp::Ordering::Equal
        || value == crate::mersenne::modulus(e);
    if is_zero {
        info!(e, "LL: M{} is prime", e);
        Ok(LlOutcome::Prime)
    } else {
        let words32 = words::from_integer(&value, e);
        let fingerprint = words::res64(&words32);
        info!(e, res64 = format_args!("{:016x}", fingerprint), "LL: composite");
        Ok(LlOutcome::Composite { res64: fingerprint })
    }
}

/// Run P−1 stage 1 and persist the stage-1 state (residue plus the
/// accumulated-exponent dump) through the backup manager.
pub fn run_pm1(cfg: &RunConfig) -> Result<Option<Integer>> {
    let e = cfg.exponent;
    info!(e, b1 = cfg.b1, b2 = cfg.b2, "starting P-1 stage 1");

    let backup = BackupManager::new(&cfg.save_path, e, TestMode::Pm1, cfg.b1, cfg.b2)?;

    let exponent = p1::stage1_exponent(e, cfg.b1);
    let residue = crate::mersenne::powmod_big(&Integer::from(3u32), &exponent, e);

    let mut host = residue.to_digits::<u64>(Order::Lsf);
    host.resize((e as usize + 63) / 64, 0);
    backup.save_state(&host, 0, Some(&exponent))?;

    let m = crate::mersenne::modulus(e);
    let g = Integer::from(&residue - 1u32).gcd(&m);
    if g > 1u32 && g < m {
        info!(e, factor = %g, "P-1 found a factor");
        Ok(Some(g))
    } else {
        info!(e, "P-1 stage 1 found no factor");
        Ok(None)
    }
}
