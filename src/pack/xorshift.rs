//! 8-bit Xorshift pseudo-random generator for probabilistic rounding
//!
//! The rounding offsets must be uniform over 255 values, never zero, and
//! cheap enough to draw once per packed byte. This 8-bit Xorshift with shift
//! triple (7, 5, 3) cycles through every nonzero byte exactly once per
//! period, which gives both properties for free. An 8-bit LCG with low-bit
//! masking measured worse on real activation data, so the generator choice
//! is a correctness matter here, not an optimization: do not swap in a
//! wider or "better" generator.

/// Default seed for all rounding PRNGs.
pub const DEFAULT_SEED: u8 = 128;

/// Scalar 8-bit Xorshift with shift triple (7, 5, 3).
///
/// The state is a single nonzero byte; each call returns the current state
/// and then advances it. Seeded nonzero, the state can never reach zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Xorshift8 {
    state: u8,
}

impl Xorshift8 {
    pub fn new(seed: u8) -> Self {
        assert!(seed != 0, "Xorshift8 seed must be nonzero");
        Self { state: seed }
    }

    /// Returns a byte in [1, 255] and advances the state.
    #[inline]
    pub fn next_nonzero(&mut self) -> u8 {
        let result = self.state;
        let mut x = self.state;
        x ^= x << 7;
        x ^= x >> 5;
        x ^= x << 3;
        self.state = x;
        result
    }

    pub fn state(&self) -> u8 {
        self.state
    }
}

impl Default for Xorshift8 {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Sixteen distinct nonzero lane seeds derived from `seed`.
///
/// Sixteen successive states of a *different* Xorshift, shift triple
/// (7, 7, 1), so that the lanes of a vector generator start pairwise
/// distinct. Seeding all lanes from the same state, or from successive
/// states of the steady-state (7, 5, 3) permutation itself, would leave the
/// lanes perfectly correlated with each other.
pub fn lane_seeds(seed: u8) -> [u8; 16] {
    assert!(seed != 0, "lane seed must be nonzero");
    let mut seeds = [0u8; 16];
    let mut s = seed;
    for lane in seeds.iter_mut() {
        *lane = s;
        s ^= s << 7;
        s ^= s >> 7;
        s ^= s << 1;
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_is_a_permutation_of_nonzero_bytes() {
        let mut prng = Xorshift8::new(DEFAULT_SEED);
        let outputs: Vec<u8> = (0..256).map(|_| prng.next_nonzero()).collect();

        let mut seen = [false; 256];
        for &value in &outputs[..255] {
            assert_ne!(value, 0, "generator produced zero");
            assert!(!seen[value as usize], "value {} repeated within one period", value);
            seen[value as usize] = true;
        }
        // Period is exactly 255: the 256th output restarts the cycle.
        assert_eq!(outputs[255], outputs[0]);
    }

    #[test]
    fn test_full_period_from_any_seed() {
        for seed in [1u8, 2, 77, 128, 255] {
            let mut prng = Xorshift8::new(seed);
            for _ in 0..255 {
                prng.next_nonzero();
            }
            assert_eq!(prng.state(), seed);
        }
    }

    #[test]
    fn test_reproducibility() {
        let mut a = Xorshift8::new(42);
        let mut b = Xorshift8::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_nonzero(), b.next_nonzero());
        }
    }

    #[test]
    #[should_panic(expected = "must be nonzero")]
    fn test_zero_seed_rejected() {
        Xorshift8::new(0);
    }

    #[test]
    fn test_lane_seeds_distinct_and_nonzero() {
        let seeds = lane_seeds(DEFAULT_SEED);
        for (i, &a) in seeds.iter().enumerate() {
            assert_ne!(a, 0);
            for &b in &seeds[i + 1..] {
                assert_ne!(a, b, "lane seeds must be pairwise distinct");
            }
        }
    }

    #[test]
    fn test_lane_seeds_first_is_seed() {
        assert_eq!(lane_seeds(128)[0], 128);
        assert_eq!(lane_seeds(77)[0], 77);
    }
}
