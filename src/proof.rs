//! # Proof — Binary-Tree Compression of an Iterated-Squaring Run
//!
//! A PRP run is E sequential squarings; re-running all of them is the only
//! naive way to check the result. The proof reduces verification cost to
//! roughly `E / 2^power` squarings: each level publishes a "midpoint"
//! residue of the remaining interval, exponentiated by a hash the prover
//! could not have chosen because it depends on every prior commitment
//! (Fiat–Shamir compression of a Fischlin-style proof of iterated
//! squaring).
//!
//! ## Reduction Order
//!
//! Level `p` loads `2^p` checkpoints at stride `2^(power−p−1)` through the
//! schedule's point array and collapses them with the binary-counter
//! pattern: whenever the low bits of the leaf index form `…1`, the two top
//! buffers combine as `A^h · C mod M_E`, with `h` the most recently
//! recorded unused level hash. The association is exactly the Merkle-path
//! collapse; any deviation produces a proof no verifier accepts.
//!
//! ## References
//!
//! - K. Pietrzak, "Simple Verifiable Delay Functions", ITCS 2019.
//! - M. Fischlin, "Communication-Efficient Non-Interactive Proofs of
//!   Knowledge with Online Extractors", CRYPTO 2005.
//! - GIMPS PRP proof format: <https://www.mersenne.org/various/math.php>

use std::time::Instant;

use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProofError;
use crate::hash::{self, HashState};
use crate::mersenne;
use crate::store::ProofStore;
use crate::words;

/// The proof artifact: the final residue `B` and one middle residue per
/// level, all in the 32-bit word form of length ⌈E/32⌉.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub e: u32,
    pub b: Vec<u32>,
    pub middles: Vec<Vec<u32>>,
}

impl Proof {
    pub fn power(&self) -> u32 {
        self.middles.len() as u32
    }

    /// Recompute the per-level 64-bit exponents from `(E, B, middles)`
    /// alone, exactly as a verifier would. The builder's internal sequence
    /// must match this.
    pub fn hash_chain(&self) -> Vec<u64> {
        let mut chain = Vec::with_capacity(self.middles.len());
        let mut state: HashState = hash::hash_words(self.e, &self.b);
        for middle in &self.middles {
            state = hash::hash_words_chained(self.e, state, middle);
            chain.push(hash::low64(state));
        }
        chain
    }

    /// Structural sanity: word counts, level count, nonzero middles. The
    /// full arithmetic re-check belongs to the external verifier.
    pub fn validate(&self) -> Result<(), ProofError> {
        let n = words::word_count(self.e);
        if self.b.len() != n {
            return Err(ProofError::ZeroMiddle { level: 0 });
        }
        for (level, middle) in self.middles.iter().enumerate() {
            if middle.len() != n || middle.iter().all(|&w| w == 0) {
                return Err(ProofError::ZeroMiddle {
                    level: level as u32,
                });
            }
        }
        Ok(())
    }
}

/// Build the proof from a fully populated checkpoint set.
///
/// Every scheduled snapshot must exist and pass CRC; a corrupt or missing
/// file aborts, as does a zero middle (which indicates upstream corruption
/// rather than a recoverable condition).
pub fn compute_proof(store: &ProofStore) -> Result<Proof, ProofError> {
    let start = Instant::now();
    let schedule = store.schedule();
    let e = schedule.exponent();
    let power = schedule.power();
    let points = schedule.points();

    let b = store.load(e)?;
    let mut state = hash::hash_words(e, &b);
    let mut hashes: Vec<u64> = Vec::with_capacity(power as usize);
    let mut middles: Vec<Vec<u32>> = Vec::with_capacity(power as usize);

    // Buffer pool: level p uses the first 2^p slots.
    let mut buf: Vec<Integer> = vec![Integer::new(); 1usize << power];

    for p in 0..power {
        let stride = 1u32 << (power - p - 1);
        let leaves = 1usize << p;
        let mut buf_index = 0usize;

        for slot in buf.iter_mut().take(leaves) {
            *slot = Integer::new();
        }

        for i in 0..leaves {
            let ci = stride as usize * (2 * i + 1) - 1;
            let k = points[ci];
            // Guarded like the reference; never taken for a well-formed set.
            if k > e || !schedule.is_checkpoint(k) {
                continue;
            }

            buf[buf_index] = words::to_integer(&store.load(k)?);
            buf_index += 1;

            let mut bit = 0u32;
            while i & (1usize << bit) != 0 {
                let h = hashes[(p - 1 - bit) as usize];
                buf_index -= 1;
                // A^h * C, left factor exponentiated by the most recently
                // recorded unused hash.
                let c = std::mem::replace(&mut buf[buf_index], Integer::new());
                let powered = mersenne::powmod(&buf[buf_index - 1], h, e);
                buf[buf_index - 1] = mersenne::reduce(powered * c, e);
                bit += 1;
            }
        }

        if buf_index != 1 {
            warn!(level = p, buf_index, "expected a single buffer after collapse");
        }

        if buf[0].cmp0() == std::cmp::Ordering::Equal {
            return Err(ProofError::ZeroMiddle { level: p });
        }
        let middle = words::from_integer(&buf[0], e);

        state = hash::hash_words_chained(e, state, &middle);
        hashes.push(hash::low64(state));
        info!(
            level = p,
            middle = format_args!("{:016x}", words::res64(&middle)),
            hash = format_args!("{:016x}", hashes[p as usize]),
            "proof level complete"
        );
        middles.push(middle);
    }

    info!(
        e,
        power,
        elapsed = format_args!("{:.2}s", start.elapsed().as_secs_f64()),
        "proof generated"
    );
    Ok(Proof { e, b, middles })
}
