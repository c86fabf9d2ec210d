//! # Store — Durable Proof Snapshots With Integrity Protection
//!
//! One file per scheduled iteration, `<root>/<E>/proof/<k>`, holding a CRC32
//! followed by the residue in 32-bit little-endian words. The CRC is the
//! standard IEEE polynomial over the word bytes exactly as they sit on disk,
//! so a snapshot that reads back byte-identical always passes.
//!
//! Writes go through a temp sibling and a rename: a crash mid-write leaves
//! the previous snapshot (or nothing) rather than a truncated file that
//! would halt resume later with a CRC failure.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::error::ProofError;
use crate::schedule::ProofSchedule;
use crate::words;

/// Read/write access to the proof snapshot directory for one exponent.
pub struct ProofStore {
    dir: PathBuf,
    schedule: ProofSchedule,
}

impl ProofStore {
    /// Open (creating if needed) `<root>/<E>/proof` for the given schedule.
    pub fn new(root: &Path, e: u32, power: u32) -> Result<Self, ProofError> {
        let schedule = ProofSchedule::new(e, power)?;
        let dir = root.join(e.to_string()).join("proof");
        fs::create_dir_all(&dir).map_err(|err| ProofError::io(&dir, err))?;
        Ok(ProofStore { dir, schedule })
    }

    pub fn schedule(&self) -> &ProofSchedule {
        &self.schedule
    }

    pub fn exponent(&self) -> u32 {
        self.schedule.exponent()
    }

    fn snapshot_path(&self, k: u32) -> PathBuf {
        self.dir.join(k.to_string())
    }

    pub fn file_exists(&self, k: u32) -> bool {
        self.snapshot_path(k).exists()
    }

    /// Persist the residue at iteration `k`. A no-op when `k` is not on the
    /// schedule, so the driver can call this after every iteration.
    pub fn save(&self, k: u32, residue: &[u32]) -> Result<(), ProofError> {
        if !self.schedule.is_checkpoint(k) {
            return Ok(());
        }

        let mut bytes = Vec::with_capacity(4 + residue.len() * 4);
        bytes.extend_from_slice(&[0u8; 4]); // CRC placeholder
        for &w in residue {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        let crc = crc32fast::hash(&bytes[4..]);
        bytes[..4].copy_from_slice(&crc.to_le_bytes());

        let path = self.snapshot_path(k);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(|err| ProofError::io(&tmp, err))?;
        fs::rename(&tmp, &path).map_err(|err| ProofError::io(&path, err))?;
        Ok(())
    }

    /// Load and CRC-check the residue at iteration `k`.
    ///
    /// The byte count is authoritative: exactly ⌈E/32⌉ words are read, and a
    /// file with trailing garbage still passes when the prefix is intact.
    pub fn load(&self, k: u32) -> Result<Vec<u32>, ProofError> {
        if !self.schedule.is_checkpoint(k) {
            return Err(ProofError::ScheduleInconsistency {
                e: self.schedule.exponent(),
                power: self.schedule.power(),
                k,
            });
        }

        let path = self.snapshot_path(k);
        let mut file = fs::File::open(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ProofError::MissingSnapshot { path: path.clone() }
            } else {
                ProofError::io(&path, err)
            }
        })?;

        let mut crc_bytes = [0u8; 4];
        file.read_exact(&mut crc_bytes)
            .map_err(|_| ProofError::CorruptSnapshot { path: path.clone() })?;
        let stored_crc = u32::from_le_bytes(crc_bytes);

        let n = words::word_count(self.schedule.exponent());
        let mut data = vec![0u8; n * 4];
        file.read_exact(&mut data)
            .map_err(|_| ProofError::CorruptSnapshot { path: path.clone() })?;

        if crc32fast::hash(&data) != stored_crc {
            return Err(ProofError::CorruptSnapshot { path });
        }

        let residue = data
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(residue)
    }

    /// Whether every scheduled snapshot strictly below `min(limit, E)` exists
    /// on disk. Resume past a missing snapshot is impossible.
    pub fn is_valid_to(&self, limit: u32) -> bool {
        let bound = limit.min(self.schedule.exponent());
        for &point in self.schedule.checkpoints() {
            if point >= bound {
                break;
            }
            if !self.file_exists(point) {
                warn!(k = point, "missing proof snapshot");
                return false;
            }
        }
        true
    }

    /// Full CRC verification of every snapshot up to and including `limit`.
    /// Run before proof generation so a corrupt file fails fast instead of
    /// deep inside the reduction.
    pub fn verify_to(&self, limit: u32) -> Result<(), ProofError> {
        let bound = limit.min(self.schedule.exponent());
        let failures: Vec<ProofError> = self
            .schedule
            .checkpoints()
            .par_iter()
            .filter(|&&point| point <= bound)
            .filter_map(|&point| self.load(point).err())
            .collect();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Delete every snapshot of this exponent. Only an explicit cleanup
    /// request removes proof files.
    pub fn clear(&self) -> Result<(), ProofError> {
        for &point in self.schedule.checkpoints() {
            let path = self.snapshot_path(point);
            if path.exists() {
                fs::remove_file(&path).map_err(|err| ProofError::io(&path, err))?;
            }
        }
        Ok(())
    }
}
