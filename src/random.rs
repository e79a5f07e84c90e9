//! Random matrix generation utilities
//!
//! This module provides seeded generation of random byte matrices for
//! testing and benchmarking the packing paths. It is unrelated to the
//! rounding PRNG: rounding offsets come from the bespoke 8-bit Xorshift in
//! `pack::xorshift`, never from here.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Generate a `rows x cols` matrix of uniformly random bytes.
///
/// # Examples
/// ```
/// use lowp_gemm::random::generate_random_matrix;
///
/// let m = generate_random_matrix(4, 8, 42);
/// assert_eq!(m.len(), 32);
///
/// // Same seed, same matrix.
/// assert_eq!(m, generate_random_matrix(4, 8, 42));
/// ```
pub fn generate_random_matrix(rows: usize, cols: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows * cols).map(|_| rng.random()).collect()
}

/// Generate a matrix with entries drawn uniformly from `[low, high]`,
/// mimicking the concentrated value ranges of real activation data.
///
/// # Panics
/// Panics if `low > high`.
pub fn generate_random_matrix_in(
    rows: usize,
    cols: usize,
    low: u8,
    high: u8,
    seed: u64,
) -> Vec<u8> {
    assert!(low <= high, "empty value range [{}, {}]", low, high);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows * cols).map(|_| rng.random_range(low..=high)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let a = generate_random_matrix(16, 16, 123);
        let b = generate_random_matrix(16, 16, 123);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_random_matrix(16, 16, 1);
        let b = generate_random_matrix(16, 16, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_range_is_respected() {
        let m = generate_random_matrix_in(8, 8, 100, 140, 7);
        assert!(m.iter().all(|&v| (100..=140).contains(&v)));
    }

    #[test]
    #[should_panic(expected = "empty value range")]
    fn test_inverted_range_rejected() {
        generate_random_matrix_in(2, 2, 10, 5, 0);
    }
}
