//! # Schedule — Exponent-Parameterized Checkpoint Points
//!
//! The proof of a PRP run needs residue snapshots at 2^power iteration
//! indices chosen by repeated bisection of `[0, E]`. The set is a pure
//! function of `(E, power)`, so the squaring driver and the proof builder
//! agree on it without any shared state.
//!
//! ## Construction
//!
//! Spans are the first `power` values of `s_0 = ⌈E/2⌉, s_{i+1} = ⌈s_i/2⌉`.
//! Starting from `{0}`, each span doubles the set by adding `p + span` for
//! every existing point. The initial 0 is then replaced by `E` and the set
//! sorted; a `u32::MAX` sentinel simplifies range scans.
//!
//! Membership is also decidable without the array: walk down from
//! `(start = 0, span = ⌈E/2⌉)`, advancing `start` past spans that lie below
//! `k` and halving the span up to `power` times. Both views must agree for
//! every `k ∈ [0, E]`; a disagreement is a programming error surfaced as
//! [`ProofError::ScheduleInconsistency`].

use crate::error::ProofError;

/// Sorted checkpoint iteration indices for one `(E, power)` pair, with a
/// trailing `u32::MAX` sentinel.
pub struct ProofSchedule {
    e: u32,
    power: u32,
    points: Vec<u32>,
}

/// Recommended proof power for an exponent: one additional level per
/// fourfold increase of E. Power 10 covers the 60M–240M wavefront, 11 runs
/// up to ~960M, capped at 12, floored at 2.
pub fn best_power(e: u32) -> u32 {
    let power = 10 + ((e as f64 / 60e6).log2() / 2.0).floor() as i32;
    power.clamp(2, 12) as u32
}

/// Predicted proof-directory footprint in gigabytes. Heuristic, used only
/// for operator warnings before a run starts.
pub fn disk_usage_gb(e: u32, power: u32) -> f64 {
    if power == 0 {
        return 0.0;
    }
    e as f64 * (2.0f64).powi(power as i32 - 33) * 1.05
}

/// Membership test equivalent to scanning the constructed point set: `k` is
/// a checkpoint iff it is `E` or is reachable by the span walk within
/// `power` halvings.
pub fn is_checkpoint(e: u32, power: u32, k: u32) -> bool {
    if k == e {
        return true;
    }
    let k = k as u64;
    let mut start = 0u64;
    let mut span = (e as u64 + 1) / 2;
    for _ in 0..power {
        if k > start + span {
            start += span;
        } else if k == start + span {
            return true;
        }
        span = (span + 1) / 2;
    }
    false
}

impl ProofSchedule {
    /// Build the point set for `(E, power)` and cross-check it against the
    /// span-walk membership test.
    pub fn new(e: u32, power: u32) -> Result<Self, ProofError> {
        debug_assert!(e & 1 == 1, "exponent must be odd");

        let mut spans = Vec::with_capacity(power as usize);
        let mut span = (e as u64 + 1) / 2;
        while spans.len() < power as usize {
            spans.push(span);
            span = (span + 1) / 2;
        }

        let mut points: Vec<u64> = vec![0];
        for &span in &spans {
            for i in 0..points.len() {
                points.push(points[i] + span);
            }
        }

        points[0] = e as u64;
        points.sort_unstable();

        // Every constructed point must satisfy the walk, and vice versa the
        // walk must not claim anything outside the set; a mismatch means the
        // two views of the schedule have diverged.
        for &p in &points {
            if p > e as u64 || !is_checkpoint(e, power, p as u32) {
                return Err(ProofError::ScheduleInconsistency {
                    e,
                    power,
                    k: p.min(u32::MAX as u64) as u32,
                });
            }
        }

        let mut points: Vec<u32> = points.into_iter().map(|p| p as u32).collect();
        points.push(u32::MAX); // sentinel

        Ok(ProofSchedule { e, power, points })
    }

    pub fn exponent(&self) -> u32 {
        self.e
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    /// The sorted checkpoint indices, including the trailing sentinel.
    pub fn points(&self) -> &[u32] {
        &self.points
    }

    /// Checkpoint indices without the sentinel.
    pub fn checkpoints(&self) -> &[u32] {
        &self.points[..self.points.len() - 1]
    }

    pub fn is_checkpoint(&self, k: u32) -> bool {
        is_checkpoint(self.e, self.power, k)
    }
}
