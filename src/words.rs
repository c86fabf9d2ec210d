//! # Words — Residue Codec Between Word Form and Integer Form
//!
//! A residue travels in three shapes: the device's 64-bit word vector, the
//! on-disk/proof 32-bit word vector of length ⌈E/32⌉, and the
//! arbitrary-precision integer the proof builder computes with. All word
//! vectors are little-endian in word significance; trailing zero words are
//! permitted and carry no meaning.

use rug::integer::Order;
use rug::Integer;

/// Number of 32-bit words in the proof form of a residue: ⌈E/32⌉.
pub fn word_count(e: u32) -> usize {
    (e as usize + 31) / 32
}

/// Interpret `words` as a little-endian, least-significant-word-first
/// unsigned magnitude.
pub fn to_integer(words: &[u32]) -> Integer {
    Integer::from_digits(words, Order::Lsf)
}

/// Serialize `x` into exactly ⌈E/32⌉ little-endian 32-bit words, zero padded.
///
/// The caller guarantees `0 ≤ x < 2^E`; the codec never truncates.
pub fn from_integer(x: &Integer, e: u32) -> Vec<u32> {
    let mut words = x.to_digits::<u32>(Order::Lsf);
    debug_assert!(
        words.len() <= word_count(e),
        "residue exceeds 2^{} ({} words)",
        e,
        words.len()
    );
    words.resize(word_count(e), 0);
    words
}

/// Re-serialize the device's 64-bit word form into the 32-bit proof layout.
///
/// Each device word contributes its low half first, then its high half — a
/// pure little-endian reinterpretation. The device may hand over more words
/// than ⌈E/32⌉ requires; the excess must be zero.
pub fn from_device(host: &[u64], e: u32) -> Vec<u32> {
    let n = word_count(e);
    let mut words = Vec::with_capacity(host.len() * 2);
    for &w in host {
        words.push(w as u32);
        words.push((w >> 32) as u32);
    }
    debug_assert!(
        words.iter().skip(n).all(|&w| w == 0),
        "device residue has nonzero words beyond ⌈E/32⌉"
    );
    words.resize(n, 0);
    words
}

/// Low 64 bits of the residue — a display-only fingerprint.
pub fn res64(words: &[u32]) -> u64 {
    let lo = words.first().copied().unwrap_or(0) as u64;
    let hi = words.get(1).copied().unwrap_or(0) as u64;
    lo | (hi << 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn m127_round_trips() {
        // 2^127 - 1 in 32-bit words
        let words = vec![0xFFFF_FFFFu32, 0xFFFF_FFFF, 0xFFFF_FFFF, 0x7FFF_FFFF];
        let x = to_integer(&words);
        let m127 = (Integer::from(1u32) << 127u32) - 1u32;
        assert_eq!(x, m127);
        assert_eq!(from_integer(&x, 127), words);
    }

    #[test]
    fn trailing_zero_words_are_meaningless() {
        let x = Integer::from(9u32);
        let words = from_integer(&x, 127);
        assert_eq!(words.len(), 4);
        assert_eq!(words, vec![9, 0, 0, 0]);
        assert_eq!(to_integer(&words), x);
        // Shorter encodings of the same value agree
        assert_eq!(to_integer(&[9]), x);
    }

    #[test]
    fn device_form_reserializes_low_half_first() {
        // One device word 0x00000002_00000001 → 32-bit words [1, 2]
        let host = vec![0x0000_0002_0000_0001u64, 0];
        let words = from_device(&host, 89);
        assert_eq!(words.len(), word_count(89));
        assert_eq!(&words[..3], &[1, 2, 0]);
        assert_eq!(to_integer(&words), to_integer(&[1, 2]));
    }

    #[test]
    fn word_count_rounds_up() {
        assert_eq!(word_count(127), 4);
        assert_eq!(word_count(128), 4);
        assert_eq!(word_count(129), 5);
        assert_eq!(word_count(31), 1);
        assert_eq!(word_count(32), 1);
        assert_eq!(word_count(33), 2);
    }

    #[test]
    fn res64_fingerprint() {
        assert_eq!(res64(&[0xDEAD_BEEF, 0xCAFE_F00D, 7]), 0xCAFE_F00D_DEAD_BEEF);
        assert_eq!(res64(&[5]), 5);
        assert_eq!(res64(&[]), 0);
    }
}
