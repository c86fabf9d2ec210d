//! # Backup — Live Residue State Across Process Restarts
//!
//! The squaring loop persists its device residue and iteration counter so a
//! killed process resumes where it stopped. File family under a
//! caller-supplied save path, base name `E ‖ mode [‖ B1 [‖ "_" ‖ B2]]`:
//!
//! | file        | contents                                   |
//! |-------------|--------------------------------------------|
//! | `.mers`     | residue, device 64-bit words, little-endian |
//! | `.loop`     | next iteration to execute, ASCII decimal    |
//! | `.exponent` | P−1 accumulated exponent, decimal bignum    |
//! | `.hq`/`.q`  | P−1 stage-2 accumulators                    |
//! | `.loop2`    | P−1 stage-2 next index, ASCII decimal       |
//!
//! The update order is snapshot first, then loop file. A crash between the
//! two leaves the loop pointing one save behind, so the rerun simply
//! overwrites the orphan snapshot; the pair is never inconsistent the other
//! way around.

use std::fs;
use std::path::{Path, PathBuf};

use rug::Integer;
use tracing::{info, warn};

use crate::error::ProofError;

/// Which test owns the state files; selects the base name and the seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestMode {
    Prp,
    Ll,
    Pm1,
}

impl TestMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TestMode::Prp => "prp",
            TestMode::Ll => "ll",
            TestMode::Pm1 => "pm1",
        }
    }

    /// Iteration-0 residue: 3 for PRP and P−1 (base-3 powering), 4 for
    /// Lucas-Lehmer.
    pub fn seed(self) -> u64 {
        match self {
            TestMode::Prp | TestMode::Pm1 => 3,
            TestMode::Ll => 4,
        }
    }
}

/// Owns the state-file paths for one `(exponent, mode, bounds)` run.
pub struct BackupManager {
    mode: TestMode,
    mers: PathBuf,
    loop_file: PathBuf,
    exponent_file: PathBuf,
    stage2: Option<Stage2Paths>,
}

struct Stage2Paths {
    hq: PathBuf,
    q: PathBuf,
    loop2: PathBuf,
}

impl BackupManager {
    /// Create the save directory and derive the file family. `b1`/`b2` are 0
    /// outside P−1; `b2 > 0` additionally enables the stage-2 files.
    pub fn new(
        save_path: &Path,
        exponent: u32,
        mode: TestMode,
        b1: u64,
        b2: u64,
    ) -> Result<Self, ProofError> {
        fs::create_dir_all(save_path).map_err(|err| ProofError::io(save_path, err))?;

        let base = if b1 > 0 {
            format!("{}{}{}", exponent, mode.as_str(), b1)
        } else {
            format!("{}{}", exponent, mode.as_str())
        };

        let stage2 = (b2 > 0).then(|| {
            let base2 = format!("{}{}{}_{}", exponent, mode.as_str(), b1, b2);
            Stage2Paths {
                hq: save_path.join(format!("{}.hq", base2)),
                q: save_path.join(format!("{}.q", base2)),
                loop2: save_path.join(format!("{}.loop2", base2)),
            }
        });

        Ok(BackupManager {
            mode,
            mers: save_path.join(format!("{}.mers", base)),
            loop_file: save_path.join(format!("{}.loop", base)),
            exponent_file: save_path.join(format!("{}.exponent", base)),
            stage2,
        })
    }

    /// Restore the live residue into `x` and return the next iteration to
    /// execute.
    ///
    /// A missing, empty or zero loop file means a fresh run: `x` becomes the
    /// seed at index 0 and 0 is returned. A valid loop index with an
    /// unreadable or short `.mers` file is logged and treated as fresh state
    /// rather than fatal.
    pub fn load_state(&self, x: &mut [u64]) -> u64 {
        let resume = read_counter(&self.loop_file);
        if resume > 0 {
            match fs::read(&self.mers) {
                Ok(bytes) if bytes.len() == x.len() * 8 => {
                    for (word, chunk) in x.iter_mut().zip(bytes.chunks_exact(8)) {
                        *word = u64::from_le_bytes(chunk.try_into().unwrap());
                    }
                    info!(
                        resume,
                        path = %self.mers.display(),
                        "resuming from saved state"
                    );
                    return resume;
                }
                Ok(bytes) => {
                    warn!(
                        path = %self.mers.display(),
                        expected = x.len() * 8,
                        got = bytes.len(),
                        "state file has wrong size, starting fresh"
                    );
                }
                Err(err) => {
                    warn!(
                        path = %self.mers.display(),
                        error = %err,
                        "could not read state file, starting fresh"
                    );
                }
            }
        }

        x.fill(0);
        x[0] = self.mode.seed();
        0
    }

    /// Persist the residue read back from the device, then advance the loop
    /// file to `iter + 1`. For P−1, the accumulated exponent is dumped
    /// alongside.
    pub fn save_state(
        &self,
        x: &[u64],
        iter: u64,
        exponent: Option<&Integer>,
    ) -> Result<(), ProofError> {
        let mut bytes = Vec::with_capacity(x.len() * 8);
        for &word in x {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        write_atomic(&self.mers, &bytes)?;
        write_atomic(&self.loop_file, (iter + 1).to_string().as_bytes())?;

        if let Some(e) = exponent {
            write_atomic(&self.exponent_file, e.to_string().as_bytes())?;
        }
        info!(iter = iter + 1, path = %self.mers.display(), "state saved");
        Ok(())
    }

    /// Read back the P−1 accumulated exponent, defaulting to 0 when no dump
    /// exists yet.
    pub fn load_exponent(&self) -> Integer {
        match fs::read_to_string(&self.exponent_file) {
            Ok(text) => match text.trim().parse::<Integer>() {
                Ok(value) => {
                    info!(path = %self.exponent_file.display(), "loaded exponent dump");
                    value
                }
                Err(_) => {
                    warn!(path = %self.exponent_file.display(), "unparsable exponent dump");
                    Integer::new()
                }
            },
            Err(_) => {
                info!(path = %self.exponent_file.display(), "no exponent dump, defaulting to 0");
                Integer::new()
            }
        }
    }

    /// Restore the stage-2 accumulators; returns the next stage-2 index, or
    /// 0 when no stage-2 state exists.
    pub fn load_state_stage2(&self, hq: &mut [u64], q: &mut [u64]) -> u64 {
        let Some(paths) = &self.stage2 else { return 0 };
        let resume = read_counter(&paths.loop2);
        if resume == 0 {
            return 0;
        }
        read_words_into(&paths.hq, hq);
        read_words_into(&paths.q, q);
        info!(resume, "stage-2 buffers restored");
        resume
    }

    /// Persist the stage-2 accumulators and advance `.loop2` to `idx + 1`.
    pub fn save_state_stage2(&self, hq: &[u64], q: &[u64], idx: u64) -> Result<(), ProofError> {
        let Some(paths) = &self.stage2 else {
            return Ok(());
        };
        write_atomic(&paths.hq, &words_to_bytes(hq))?;
        write_atomic(&paths.q, &words_to_bytes(q))?;
        write_atomic(&paths.loop2, (idx + 1).to_string().as_bytes())?;
        info!(idx = idx + 1, "stage-2 backup saved");
        Ok(())
    }

    /// Remove every state file of this run. Only explicit cleanup deletes
    /// them.
    pub fn clear_state(&self) {
        let mut paths = vec![&self.mers, &self.loop_file, &self.exponent_file];
        if let Some(stage2) = &self.stage2 {
            paths.extend([&stage2.hq, &stage2.q, &stage2.loop2]);
        }
        for path in paths {
            if path.exists() && fs::remove_file(path).is_ok() {
                info!(path = %path.display(), "removed state file");
            }
        }
    }
}

/// Parse an ASCII decimal counter file, tolerating trailing whitespace.
/// Absent, empty or malformed files read as 0.
fn read_counter(path: &Path) -> u64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|text| text.trim_end().parse::<u64>().ok())
        .unwrap_or(0)
}

fn words_to_bytes(words: &[u64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 8);
    for &word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

fn read_words_into(path: &Path, out: &mut [u64]) {
    match fs::read(path) {
        Ok(bytes) => {
            for (word, chunk) in out.iter_mut().zip(bytes.chunks_exact(8)) {
                *word = u64::from_le_bytes(chunk.try_into().unwrap());
            }
        }
        Err(err) => warn!(path = %path.display(), error = %err, "could not read accumulator"),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ProofError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|err| ProofError::io(&tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| ProofError::io(path, err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_state_uses_prp_seed() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Prp, 0, 0).unwrap();
        let mut x = vec![u64::MAX; 2];
        assert_eq!(backup.load_state(&mut x), 0);
        assert_eq!(x, vec![3, 0]);
    }

    #[test]
    fn fresh_state_uses_ll_seed() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Ll, 0, 0).unwrap();
        let mut x = vec![0u64; 2];
        backup.load_state(&mut x);
        assert_eq!(x[0], 4);
    }

    #[test]
    fn save_then_load_resumes_at_next_iteration() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Prp, 0, 0).unwrap();
        let saved = vec![0x1122_3344_5566_7788u64, 42];
        backup.save_state(&saved, 100, None).unwrap();

        let mut x = vec![0u64; 2];
        assert_eq!(backup.load_state(&mut x), 101);
        assert_eq!(x, saved);
    }

    #[test]
    fn loop_file_tolerates_trailing_whitespace() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Prp, 0, 0).unwrap();
        backup.save_state(&[7, 0], 5, None).unwrap();
        let loop_path = dir.path().join("127prp.loop");
        fs::write(&loop_path, "6\n").unwrap();

        let mut x = vec![0u64; 2];
        assert_eq!(backup.load_state(&mut x), 6);
    }

    #[test]
    fn corrupt_mers_with_valid_loop_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Prp, 0, 0).unwrap();
        backup.save_state(&[9, 9], 50, None).unwrap();
        fs::write(dir.path().join("127prp.mers"), b"short").unwrap();

        let mut x = vec![0u64; 2];
        assert_eq!(backup.load_state(&mut x), 0);
        assert_eq!(x, vec![3, 0]);
    }

    #[test]
    fn b1_and_b2_extend_the_base_name() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Pm1, 10000, 500000).unwrap();
        backup.save_state(&[1], 0, None).unwrap();
        backup.save_state_stage2(&[2], &[3], 7).unwrap();

        assert!(dir.path().join("127pm110000.mers").exists());
        assert!(dir.path().join("127pm110000.loop").exists());
        assert!(dir.path().join("127pm110000_500000.hq").exists());
        assert!(dir.path().join("127pm110000_500000.q").exists());
        assert!(dir.path().join("127pm110000_500000.loop2").exists());
    }

    #[test]
    fn stage2_round_trip() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Pm1, 100, 10000).unwrap();
        backup.save_state_stage2(&[11, 12], &[13, 14], 20).unwrap();

        let mut hq = vec![0u64; 2];
        let mut q = vec![0u64; 2];
        assert_eq!(backup.load_state_stage2(&mut hq, &mut q), 21);
        assert_eq!(hq, vec![11, 12]);
        assert_eq!(q, vec![13, 14]);
    }

    #[test]
    fn exponent_dump_round_trips() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Pm1, 100, 0).unwrap();
        let exponent = Integer::from(123456789u64) * Integer::from(987654321u64);
        backup.save_state(&[1], 0, Some(&exponent)).unwrap();
        assert_eq!(backup.load_exponent(), exponent);
    }

    #[test]
    fn missing_exponent_defaults_to_zero() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Pm1, 100, 0).unwrap();
        assert_eq!(backup.load_exponent(), Integer::new());
    }

    #[test]
    fn clear_state_removes_all_files() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(dir.path(), 127, TestMode::Pm1, 100, 10000).unwrap();
        backup.save_state(&[1], 0, Some(&Integer::from(5u32))).unwrap();
        backup.save_state_stage2(&[1], &[1], 0).unwrap();
        backup.clear_state();

        assert!(!dir.path().join("127pm1100.mers").exists());
        assert!(!dir.path().join("127pm1100.loop").exists());
        assert!(!dir.path().join("127pm1100.exponent").exists());
        assert!(!dir.path().join("127pm1100_10000.hq").exists());
    }
}
