//! # Mersenne Arithmetic — Modular Operations mod 2^E − 1
//!
//! Arbitrary-precision arithmetic specialized for Mersenne moduli, used by the
//! proof builder and the P−1 pre-filter. The reduction never divides: it folds
//! the high bits onto the low bits using
//!
//! ```text
//! x ≡ (x mod 2^E) + (x div 2^E)   (mod 2^E − 1)
//! ```
//!
//! One fold plus a single conditional subtraction suffices for products of two
//! reduced residues, since `xlo + xhi < 2·2^E` in that case.
//!
//! ## Canonical Representative
//!
//! `reduce` does NOT normalize `2^E − 1` itself to 0: values whose bit length
//! is at most E+1 pass through unchanged. Callers comparing residues across
//! conversions must treat 0 and `2^E − 1` as arithmetically equivalent.

use rug::Integer;

/// The Mersenne modulus `2^E − 1`.
pub fn modulus(e: u32) -> Integer {
    let mut m = Integer::from(1u32);
    m <<= e;
    m -= 1u32;
    m
}

/// Reduce `x` modulo `2^E − 1` by folding high bits onto low bits.
///
/// Values of bit length ≤ E+1 are returned unchanged; in particular the
/// representative `2^E − 1` stays as-is rather than becoming 0.
pub fn reduce(mut x: Integer, e: u32) -> Integer {
    if x.significant_bits() <= e + 1 {
        return x;
    }

    let hi = Integer::from(&x >> e);
    x.keep_bits_mut(e);
    x += hi;

    let m = modulus(e);
    if x >= m {
        x -= m;
    }
    x
}

/// Compute `base^exp mod (2^E − 1)` by binary exponentiation, folding after
/// every multiply and square. The exponent is a single 64-bit value (the hash
/// chain only ever supplies 64 bits).
pub fn powmod(base: &Integer, mut exp: u64, e: u32) -> Integer {
    if exp == 0 {
        return Integer::from(1u32);
    }
    if exp == 1 {
        return reduce(base.clone(), e);
    }

    let mut result = Integer::from(1u32);
    let mut square = reduce(base.clone(), e);

    while exp > 0 {
        if exp & 1 == 1 {
            result = reduce(Integer::from(&result * &square), e);
        }
        exp >>= 1;
        if exp > 0 {
            square = reduce(Integer::from(&square * &square), e);
        }
    }

    result
}

/// `powmod` over an arbitrary-precision exponent, for the P−1 stage-1
/// accumulated exponent (far too large for u64).
pub fn powmod_big(base: &Integer, exp: &Integer, e: u32) -> Integer {
    if *exp == 0u32 {
        return Integer::from(1u32);
    }
    if *exp == 1u32 {
        return reduce(base.clone(), e);
    }

    let mut result = reduce(base.clone(), e);
    let bits = exp.significant_bits();
    // Left-to-right: the top bit is consumed by the initial assignment.
    for i in (0..bits - 1).rev() {
        result = reduce(Integer::from(&result * &result), e);
        if exp.get_bit(i) {
            result = reduce(Integer::from(&result * base), e);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::ops::Pow;

    #[test]
    fn reduce_folds_high_bits() {
        // 3*(2^127 - 1) + 5 ≡ 5 (mod 2^127 - 1)
        let m = modulus(127);
        let x = Integer::from(3u32) * &m + 5u32;
        assert_eq!(reduce(x, 127), Integer::from(5u32));
    }

    #[test]
    fn reduce_leaves_modulus_unnormalized() {
        // The representative 2^E - 1 itself is not folded to 0.
        let m = modulus(127);
        assert_eq!(reduce(m.clone(), 127), m);
    }

    #[test]
    fn reduce_passes_through_small_values() {
        // Bit length ≤ E+1 is returned unchanged, even above the modulus.
        let x = Integer::from(1u32) << 127u32;
        assert_eq!(reduce(x.clone(), 127), x);
        assert_eq!(reduce(Integer::from(42u32), 127), Integer::from(42u32));
    }

    #[test]
    fn reduce_is_congruent() {
        let m = modulus(89);
        for mult in [1u32, 7, 1000] {
            let x = Integer::from(mult) * &m + 12345u32;
            let r = reduce(x.clone(), 89);
            assert_eq!(Integer::from(&r % &m), Integer::from(&x % &m));
            assert!(r <= m);
        }
    }

    #[test]
    fn powmod_matches_generic_pow_mod() {
        let m = modulus(61);
        for (base, exp) in [(3u64, 0u64), (3, 1), (3, 2), (7, 12345), (12345, 61)] {
            let b = Integer::from(base);
            let got = powmod(&b, exp, 61);
            let want = b.pow_mod(&Integer::from(exp), &m).unwrap();
            assert_eq!(
                Integer::from(&got % &m),
                want,
                "powmod({}, {}, 61) mismatch",
                base,
                exp
            );
        }
    }

    #[test]
    fn powmod_big_matches_generic_pow_mod() {
        let m = modulus(61);
        let base = Integer::from(3u32);
        // Exponent wider than 64 bits
        let exp = Integer::from(2u32).pow(100) + 12345u32;
        let got = powmod_big(&base, &exp, 61);
        let want = base.clone().pow_mod(&exp, &m).unwrap();
        assert_eq!(Integer::from(&got % &m), want);
    }

    #[test]
    fn powmod_trivial_exponents() {
        let base = Integer::from(5u32);
        assert_eq!(powmod(&base, 0, 31), Integer::from(1u32));
        assert_eq!(powmod(&base, 1, 31), Integer::from(5u32));
        assert_eq!(powmod_big(&base, &Integer::from(0u32), 31), 1u32);
        assert_eq!(powmod_big(&base, &Integer::from(1u32), 31), 5u32);
    }
}
