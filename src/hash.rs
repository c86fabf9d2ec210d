//! # Hash — Domain-Separated SHA3-256 Over Residues
//!
//! The proof's hash chain binds each level's exponent to every prior
//! commitment: the prover cannot choose the exponents, which is what makes
//! the Fiat–Shamir compression sound. The digest is SHA3-256 over the
//! exponent, the previous chain state (when present) and the residue words,
//! everything serialized little-endian. Only the first 64 bits of a digest
//! feed the next exponent.

use tiny_keccak::{Hasher, Sha3};

/// A 256-bit chain state as four little-endian 64-bit limbs.
pub type HashState = [u64; 4];

/// `SHA3-256(LE64(E) ‖ bytes(W))` — the chain seed over the final residue.
pub fn hash_words(e: u32, words: &[u32]) -> HashState {
    let mut sha = Sha3::v256();
    sha.update(&(e as u64).to_le_bytes());
    update_words(&mut sha, words);
    finish(sha)
}

/// `SHA3-256(LE64(E) ‖ bytes(H_prev) ‖ bytes(W))` — one chain step.
pub fn hash_words_chained(e: u32, prev: HashState, words: &[u32]) -> HashState {
    let mut sha = Sha3::v256();
    sha.update(&(e as u64).to_le_bytes());
    for limb in prev {
        sha.update(&limb.to_le_bytes());
    }
    update_words(&mut sha, words);
    finish(sha)
}

/// The 64 bits of a chain state that select the next level's exponent.
pub fn low64(h: HashState) -> u64 {
    h[0]
}

fn update_words(sha: &mut Sha3, words: &[u32]) {
    for &w in words {
        sha.update(&w.to_le_bytes());
    }
}

fn finish(sha: Sha3) -> HashState {
    let mut digest = [0u8; 32];
    sha.finalize(&mut digest);
    let mut limbs = [0u64; 4];
    for (i, chunk) in digest.chunks_exact(8).enumerate() {
        limbs[i] = u64::from_le_bytes(chunk.try_into().unwrap());
    }
    limbs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let words = vec![1u32, 2, 3, 4];
        assert_eq!(hash_words(127, &words), hash_words(127, &words));
    }

    #[test]
    fn hash_separates_exponents() {
        let words = vec![9u32, 0, 0, 0];
        assert_ne!(hash_words(127, &words), hash_words(521, &words));
    }

    #[test]
    fn chained_hash_depends_on_prior_state() {
        let words = vec![5u32; 4];
        let h0 = hash_words(127, &words);
        let h1 = hash_words_chained(127, h0, &words);
        let h2 = hash_words_chained(127, h1, &words);
        assert_ne!(h0, h1);
        assert_ne!(h1, h2);
        assert_eq!(hash_words_chained(127, h0, &words), h1);
    }

    #[test]
    fn matches_reference_sha3_of_serialized_bytes() {
        // Serialization order: LE64(E), then each 32-bit word little-endian.
        let words = vec![0xAABB_CCDDu32, 0x1122_3344];
        let mut reference = Sha3::v256();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&89u64.to_le_bytes());
        bytes.extend_from_slice(&[0xDD, 0xCC, 0xBB, 0xAA, 0x44, 0x33, 0x22, 0x11]);
        reference.update(&bytes);
        let mut digest = [0u8; 32];
        reference.finalize(&mut digest);

        let h = hash_words(89, &words);
        assert_eq!(low64(h), u64::from_le_bytes(digest[..8].try_into().unwrap()));
    }
}
