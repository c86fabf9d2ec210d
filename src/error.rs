//! Error taxonomy for the proof and checkpoint subsystems.
//!
//! Snapshot corruption and zero middles are fatal to proof generation; a
//! missing snapshot before the final iteration makes both resume and proof
//! generation impossible. I/O failures carry the offending path.

use std::path::PathBuf;

/// Errors surfaced by the checkpoint store, backup manager and proof builder.
#[derive(Debug)]
pub enum ProofError {
    /// CRC mismatch or short read on a proof snapshot file.
    CorruptSnapshot { path: PathBuf },
    /// An expected checkpoint file does not exist.
    MissingSnapshot { path: PathBuf },
    /// OS-level I/O failure (permissions, disk full), with the path involved.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The membership test disagrees with the constructed point set.
    ScheduleInconsistency { e: u32, power: u32, k: u32 },
    /// A computed middle residue is zero — upstream snapshot corruption.
    ZeroMiddle { level: u32 },
}

impl std::fmt::Display for ProofError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofError::CorruptSnapshot { path } => {
                write!(f, "corrupt proof snapshot: {}", path.display())
            }
            ProofError::MissingSnapshot { path } => {
                write!(f, "missing proof snapshot: {}", path.display())
            }
            ProofError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ProofError::ScheduleInconsistency { e, power, k } => write!(
                f,
                "checkpoint schedule inconsistency at k={} (E={}, power={})",
                k, e, power
            ),
            ProofError::ZeroMiddle { level } => {
                write!(f, "zero middle residue at proof level {}", level)
            }
        }
    }
}

impl std::error::Error for ProofError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProofError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ProofError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProofError::Io {
            path: path.into(),
            source,
        }
    }
}
