//! # Squarer — Seam Between the Driver and the Accelerated Pipeline
//!
//! The GPU pipeline (NTT/IBDWT squaring kernels) is opaque to the host
//! control machinery: all it exposes is "advance the residue one iteration"
//! plus blocking residue transfers in the device's 64-bit word form. The
//! checkpoint store and the drivers program against this trait only.
//!
//! `CpuSquarer` is the reference implementation over plain big-integer
//! arithmetic. It is orders of magnitude slower than a device pipeline but
//! bit-exact, which makes it the backend for self-tests and for the proof
//! tests that need a real residue sequence.

use rug::integer::Order;
use rug::ops::RemRounding;
use rug::Integer;

use crate::mersenne;

/// One accelerated squaring pipeline for a fixed exponent.
///
/// Transfers are synchronous from the host's point of view: `read_words`
/// returns only after the device queue drained, and `write_words` (used only
/// on resume) blocks until the upload completes.
pub trait Squarer {
    /// Advance the residue by one iteration (one squaring, minus 2 in
    /// Lucas-Lehmer pipelines).
    fn advance(&mut self);

    /// Blocking copy of the current residue, device word form.
    fn read_words(&self) -> Vec<u64>;

    /// Blocking copy in the reverse direction.
    fn write_words(&mut self, host: &[u64]);

    /// Length of the device word vector.
    fn word_len(&self) -> usize;
}

/// Reference squarer: `x ← x² [− 2] mod 2^E − 1` on the CPU.
pub struct CpuSquarer {
    modulus: Integer,
    x: Integer,
    sub_two: bool,
    word_len: usize,
}

impl CpuSquarer {
    /// A PRP pipeline (plain squaring).
    pub fn prp(e: u32) -> Self {
        CpuSquarer::new(e, false)
    }

    /// A Lucas-Lehmer pipeline (`x ← x² − 2`).
    pub fn ll(e: u32) -> Self {
        CpuSquarer::new(e, true)
    }

    fn new(e: u32, sub_two: bool) -> Self {
        CpuSquarer {
            modulus: mersenne::modulus(e),
            x: Integer::new(),
            sub_two,
            word_len: (e as usize + 63) / 64,
        }
    }
}

impl Squarer for CpuSquarer {
    fn advance(&mut self) {
        // The device always holds a canonical residue in [0, M_E).
        let mut next = Integer::from(&self.x * &self.x);
        if self.sub_two {
            next -= 2u32;
        }
        self.x = next.rem_euc(&self.modulus);
    }

    fn read_words(&self) -> Vec<u64> {
        let mut words = self.x.to_digits::<u64>(Order::Lsf);
        words.resize(self.word_len, 0);
        words
    }

    fn write_words(&mut self, host: &[u64]) {
        self.x = Integer::from_digits(host, Order::Lsf);
    }

    fn word_len(&self) -> usize {
        self.word_len
    }
}
