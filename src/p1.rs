//! Pollard's P−1 factoring for Mersenne cofactors.
//!
//! Every prime factor q of M_E satisfies q ≡ 1 (mod 2E), so 2E divides q−1
//! for free and the stage-1 exponent starts from 2E before accumulating the
//! B1-smooth part. A factor is found when q−1 is B1-smooth: then
//! `3^exponent ≡ 1 (mod q)` and `gcd(3^exponent − 1, M_E)` reveals q.
//!
//! Stage 1 costs one big modular exponentiation; the stage-2 continuation
//! (pairing primes in (B1, B2]) runs on the device and only its accumulator
//! persistence is handled here, through the backup manager's `.hq`/`.q`/
//! `.loop2` files.

use rug::Integer;

use crate::mersenne;
use crate::primes;

/// The stage-1 exponent `2·E·∏ q^⌊log_q B1⌋` over primes `q ≤ B1`.
///
/// Each prime enters with the largest power still ≤ B1, so one
/// exponentiation covers every B1-smooth q−1 at once.
pub fn stage1_exponent(e: u32, b1: u64) -> Integer {
    let mut exp = Integer::from(2u32) * e;
    for q in primes::generate_primes(b1) {
        let mut pk = q;
        while pk <= b1 / q {
            pk *= q;
        }
        exp *= pk;
    }
    exp
}

/// Run stage 1 on `M_E` with bound `b1`.
///
/// Returns `Some(factor)` for a non-trivial factor, `None` when no factor
/// with B1-smooth q−1 exists (or when every factor is smooth at once and
/// the gcd degenerates to M_E itself).
pub fn stage1(e: u32, b1: u64) -> Option<Integer> {
    if b1 < 2 || e < 3 {
        return None;
    }

    let exp = stage1_exponent(e, b1);
    let a = mersenne::powmod_big(&Integer::from(3u32), &exp, e);

    let m = mersenne::modulus(e);
    let g = Integer::from(&a - 1u32).gcd(&m);
    if g > 1u32 && g < m {
        Some(g)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_factor_of_m29() {
        // M29 = 233 * 1103 * 2089. 233 - 1 = 2^3 * 29: B1 = 8 covers the
        // 2^3 while leaving 1103 (needs 19) and 2089 (needs 3^2) out.
        let factor = stage1(29, 8).unwrap();
        assert_eq!(factor, Integer::from(233u32));
    }

    #[test]
    fn finds_factor_of_m67() {
        // Pollard's original example: 193707721 - 1 = 2^3 * 3^3 * 5 * 67 * 2677,
        // so B1 = 3000 exposes the factor of M67.
        let factor = stage1(67, 3000).unwrap();
        assert_eq!(factor, Integer::from(193707721u64));
    }

    #[test]
    fn gcd_degenerates_when_every_factor_is_smooth() {
        // At B1 = 20 all of 233-1, 1103-1 and 2089-1 divide the stage-1
        // exponent, the gcd collapses to M29 itself, and no factor is
        // reported.
        assert!(stage1(29, 20).is_none());
    }

    #[test]
    fn no_factor_below_smoothness_bound() {
        // With B1 = 2 the exponent is 2E * 2; M67's factors need far more.
        assert!(stage1(67, 2).is_none());
    }

    #[test]
    fn degenerate_inputs_return_none() {
        assert!(stage1(67, 1).is_none());
        assert!(stage1(2, 100).is_none());
    }

    #[test]
    fn exponent_contains_2e_and_prime_powers() {
        // B1 = 10: primes 2, 3, 5, 7 with max powers 8, 9, 5, 7.
        let exp = stage1_exponent(31, 10);
        assert_eq!(exp, Integer::from(2u32 * 31) * 8u32 * 9u32 * 5u32 * 7u32);
    }
}
