//! Deterministic random number generation for synthetic visit logs.
//!
//! RULE: Nothing in the generator may call any platform RNG.
//! All randomness flows through VisitRng streams derived from one master
//! seed. Each venue gets its own stream, seeded from
//! (master_seed XOR venue_index), so adding a venue never changes the
//! visits generated for the others.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct VisitRng {
    inner: Pcg64Mcg,
}

impl VisitRng {
    /// The stream index must never change once assigned.
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ (stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Roll a u64 in [0, n). `n` of zero yields zero.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.inner.gen_range(0..n)
    }

    /// Bernoulli trial: true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
