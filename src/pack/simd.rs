//! SSE2 specializations of the packing inner loop
//!
//! Everything here operates on 128-bit registers: the lane-parallel
//! Xorshift for probabilistic rounding offsets, the 16-lane requantize, and
//! the 4x2-cell tile packers that transpose requantized source rows into
//! cell order with two rounds of byte/lane interleaves. SSE2 is part of the
//! x86-64 baseline, so there is no runtime feature dispatch; other targets
//! use the scalar path in `register_block`.
//!
//! The scalar and vector paths must emit identical bytes for identical
//! rounding offsets; the tests at the bottom hold them to that.

use std::arch::x86_64::*;

use super::bit_depth::BitDepth;
use super::format::{CellOrder, KernelSideFormat, REGISTER_SIZE};
use super::packed_block::PackedSideBlock;
use super::rounding::{
    NEAREST_ROUNDING_OFFSET, NearestRoundingOffsetGenerator, ProbabilisticRoundingOffsetGenerator,
};
use super::side_map::{SideMap, SideMapOrder};
use super::xorshift::lane_seeds;

/// Sixteen independent 8-bit Xorshift(7, 5, 3) streams in one register.
///
/// Lanes are seeded with sixteen distinct states of the (7, 7, 1) variant
/// so they never collapse onto one another.
pub struct SseXorshift {
    state: __m128i,
}

impl SseXorshift {
    pub fn new(seed: u8) -> Self {
        let seeds = lane_seeds(seed);
        let state = unsafe { _mm_loadu_si128(seeds.as_ptr() as *const __m128i) };
        Self { state }
    }

    /// Sixteen bytes, each in [1, 255]; every lane advances one step.
    #[inline]
    pub fn next_nonzero_lanes(&mut self) -> __m128i {
        unsafe {
            let result = self.state;
            let mut x = self.state;
            // 8-bit shifts synthesized from 16-bit shifts plus a lane mask.
            x = _mm_xor_si128(x, _mm_and_si128(_mm_slli_epi16::<7>(x), _mm_set1_epi8(0x80u8 as i8)));
            x = _mm_xor_si128(x, _mm_and_si128(_mm_srli_epi16::<5>(x), _mm_set1_epi8(0x07)));
            x = _mm_xor_si128(x, _mm_and_si128(_mm_slli_epi16::<3>(x), _mm_set1_epi8(0xf8u8 as i8)));
            self.state = x;
            result
        }
    }

    /// The current lane states, for inspection.
    pub fn lanes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        unsafe { _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, self.state) };
        out
    }
}

/// Vector counterpart of `RoundingOffsetGenerator`: sixteen per-lane
/// rounding offsets, each stored as offset + 1 so the divide by 255 below
/// saves a subtraction.
pub trait SseRoundingOffsets {
    fn offsets_plus_one(&mut self) -> __m128i;
}

impl SseRoundingOffsets for NearestRoundingOffsetGenerator {
    #[inline]
    fn offsets_plus_one(&mut self) -> __m128i {
        unsafe { _mm_set1_epi8((NEAREST_ROUNDING_OFFSET as i16 + 1) as i8) }
    }
}

impl SseRoundingOffsets for ProbabilisticRoundingOffsetGenerator {
    #[inline]
    fn offsets_plus_one(&mut self) -> __m128i {
        // Xorshift lanes are in [1, 255]: exactly offset + 1 for a uniform
        // offset in [0, 254].
        self.lane_prng.next_nonzero_lanes()
    }
}

/// Requantizes sixteen source bytes at once.
///
/// Bit-identical to the scalar `requantize` for equal offsets. With
/// `x = src * max_value + offset + 1`, the exact divide by 255 is
/// `(x + ((x - 1) >> 8)) >> 8`, valid for `x - 1` in [0, 65534]; storing
/// the offset pre-incremented folds the `+ 1` into the offset vector.
#[inline]
pub fn requantize_vector<D: BitDepth, G: SseRoundingOffsets>(
    raw: __m128i,
    generator: &mut G,
) -> __m128i {
    if D::BITS == 8 {
        return raw;
    }
    unsafe {
        let zero = _mm_setzero_si128();
        let one = _mm_set1_epi16(1);
        let max_value = _mm_set1_epi16(i16::from(D::MAX_VALUE));
        let offsets = generator.offsets_plus_one();

        let raw_lo = _mm_unpacklo_epi8(raw, zero);
        let raw_hi = _mm_unpackhi_epi8(raw, zero);
        let off_lo = _mm_unpacklo_epi8(offsets, zero);
        let off_hi = _mm_unpackhi_epi8(offsets, zero);

        let x_lo = _mm_add_epi16(_mm_mullo_epi16(raw_lo, max_value), off_lo);
        let x_hi = _mm_add_epi16(_mm_mullo_epi16(raw_hi, max_value), off_hi);

        let div_lo =
            _mm_srli_epi16::<8>(_mm_add_epi16(x_lo, _mm_srli_epi16::<8>(_mm_sub_epi16(x_lo, one))));
        let div_hi =
            _mm_srli_epi16::<8>(_mm_add_epi16(x_hi, _mm_srli_epi16::<8>(_mm_sub_epi16(x_hi, one))));

        _mm_packus_epi16(div_lo, div_hi)
    }
}

/// Stores a register holding two consecutive depth-slice cells of one cell
/// column at their (separated) tile offsets.
#[inline]
fn store_slice_pair<F: KernelSideFormat>(tile: &mut [u8], cell: usize, first_slice: usize, v: __m128i) {
    let lo = (first_slice * F::CELLS + cell) * F::CELL_SIZE;
    let hi = ((first_slice + 1) * F::CELLS + cell) * F::CELL_SIZE;
    debug_assert!(hi + F::CELL_SIZE <= tile.len());
    unsafe {
        if F::CELLS == 1 {
            // Adjacent slices are adjacent in the tile: one 16-byte store.
            _mm_storeu_si128(tile.as_mut_ptr().add(lo) as *mut __m128i, v);
        } else {
            _mm_storel_epi64(tile.as_mut_ptr().add(lo) as *mut __m128i, v);
            _mm_storel_epi64(
                tile.as_mut_ptr().add(hi) as *mut __m128i,
                _mm_unpackhi_epi64(v, v),
            );
        }
    }
}

/// Packs one complete kernel tile of 4x2 cells from a width-major source.
///
/// Per cell column: load the four source rows, requantize each, sum each
/// row for the rank-one update, then interleave the rows into cell order.
/// Depth-major cells keep each width's depth pair together, so the
/// transpose zips 16-bit lanes then 32-bit lanes; width-major cells keep
/// each depth's four widths together, so it zips bytes then 16-bit lanes.
/// Either way each result register holds two consecutive depth-slice cells.
pub fn pack_tile_4x2<D: BitDepth, F: KernelSideFormat, G: SseRoundingOffsets>(
    src: &SideMap<'_>,
    dst: &mut PackedSideBlock<F>,
    start_width: usize,
    generator: &mut G,
) {
    debug_assert_eq!(F::CELL_WIDTH, 4);
    debug_assert_eq!(F::CELL_DEPTH, 2);
    debug_assert_eq!(src.order(), SideMapOrder::WidthMajor);
    debug_assert_eq!(src.width(), F::WIDTH);
    debug_assert_eq!(src.depth(), REGISTER_SIZE);

    let multiplier = dst.rank_one_update_multiplier();
    let (tile, rank_one_update) = dst.current_tile_and_rank_one_update(F::WIDTH * REGISTER_SIZE);
    unsafe {
        let zero = _mm_setzero_si128();
        for cell in 0..F::CELLS {
            let mut rows = [zero; 4];
            for (w, row) in rows.iter_mut().enumerate() {
                let line = src.depth_run(cell * 4 + w, 0, REGISTER_SIZE);
                let raw = _mm_loadu_si128(line.as_ptr() as *const __m128i);
                *row = requantize_vector::<D, G>(raw, generator);

                let sums: [u16; 8] = core::mem::transmute(_mm_sad_epu8(*row, zero));
                let row_sum = i32::from(sums[0]) + i32::from(sums[4]);
                rank_one_update[start_width + cell * 4 + w] += row_sum * multiplier;
            }
            match F::CELL_ORDER {
                CellOrder::DepthMajor => {
                    let lo_01 = _mm_unpacklo_epi16(rows[0], rows[1]);
                    let lo_23 = _mm_unpacklo_epi16(rows[2], rows[3]);
                    let hi_01 = _mm_unpackhi_epi16(rows[0], rows[1]);
                    let hi_23 = _mm_unpackhi_epi16(rows[2], rows[3]);
                    store_slice_pair::<F>(tile, cell, 0, _mm_unpacklo_epi32(lo_01, lo_23));
                    store_slice_pair::<F>(tile, cell, 2, _mm_unpackhi_epi32(lo_01, lo_23));
                    store_slice_pair::<F>(tile, cell, 4, _mm_unpacklo_epi32(hi_01, hi_23));
                    store_slice_pair::<F>(tile, cell, 6, _mm_unpackhi_epi32(hi_01, hi_23));
                }
                CellOrder::WidthMajor => {
                    let lo_01 = _mm_unpacklo_epi8(rows[0], rows[1]);
                    let lo_23 = _mm_unpacklo_epi8(rows[2], rows[3]);
                    let hi_01 = _mm_unpackhi_epi8(rows[0], rows[1]);
                    let hi_23 = _mm_unpackhi_epi8(rows[2], rows[3]);
                    store_slice_pair::<F>(tile, cell, 0, _mm_unpacklo_epi16(lo_01, lo_23));
                    store_slice_pair::<F>(tile, cell, 2, _mm_unpackhi_epi16(lo_01, lo_23));
                    store_slice_pair::<F>(tile, cell, 4, _mm_unpacklo_epi16(hi_01, hi_23));
                    store_slice_pair::<F>(tile, cell, 6, _mm_unpackhi_epi16(hi_01, hi_23));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::bit_depth::{Bits4, Bits5, Bits7, Bits8};
    use crate::pack::format::{
        DepthMajor4x2Cells1, DepthMajor4x2Cells3, WidthMajor4x2Cells2,
    };
    use crate::pack::packed_block::BlockParams;
    use crate::pack::register_block::PackingRegisterBlock;
    use crate::pack::requantize::requantize;
    use crate::pack::rounding::RoundingOffsetGenerator;
    use crate::pack::xorshift::DEFAULT_SEED;

    fn load(bytes: &[u8; 16]) -> __m128i {
        unsafe { _mm_loadu_si128(bytes.as_ptr() as *const __m128i) }
    }

    fn store(v: __m128i) -> [u8; 16] {
        let mut out = [0u8; 16];
        unsafe { _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, v) };
        out
    }

    #[test]
    fn test_sse_xorshift_lanes_start_distinct() {
        let prng = SseXorshift::new(DEFAULT_SEED);
        let lanes = prng.lanes();
        for (i, &a) in lanes.iter().enumerate() {
            assert_ne!(a, 0);
            for &b in &lanes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_sse_xorshift_lanes_stay_nonzero() {
        let mut prng = SseXorshift::new(DEFAULT_SEED);
        for _ in 0..1000 {
            let lanes = store(prng.next_nonzero_lanes());
            assert!(lanes.iter().all(|&x| x != 0));
        }
    }

    #[test]
    fn test_sse_xorshift_lane_matches_scalar_permutation() {
        // Each lane runs the same (7, 5, 3) permutation as the scalar
        // generator, just from its own seed.
        let mut vector = SseXorshift::new(DEFAULT_SEED);
        let mut scalars: Vec<crate::pack::xorshift::Xorshift8> = lane_seeds(DEFAULT_SEED)
            .iter()
            .map(|&s| crate::pack::xorshift::Xorshift8::new(s))
            .collect();
        for _ in 0..300 {
            let lanes = store(vector.next_nonzero_lanes());
            for (lane, scalar) in lanes.iter().zip(scalars.iter_mut()) {
                assert_eq!(*lane, scalar.next_nonzero());
            }
        }
    }

    #[test]
    fn test_requantize_vector_matches_scalar_nearest() {
        for base in (0..=240u16).step_by(16) {
            let mut input = [0u8; 16];
            for (i, b) in input.iter_mut().enumerate() {
                *b = (base + i as u16) as u8;
            }
            let mut vector_gen = NearestRoundingOffsetGenerator;
            let mut scalar_gen = NearestRoundingOffsetGenerator;
            let got = store(requantize_vector::<Bits5, _>(load(&input), &mut vector_gen));
            for (i, &src) in input.iter().enumerate() {
                assert_eq!(got[i], requantize::<Bits5, _>(src, &mut scalar_gen), "lane {}", i);
            }
        }
    }

    #[test]
    fn test_requantize_vector_identity_at_eight_bits() {
        let input: [u8; 16] = core::array::from_fn(|i| (i * 17) as u8);
        let mut generator = NearestRoundingOffsetGenerator;
        assert_eq!(store(requantize_vector::<Bits8, _>(load(&input), &mut generator)), input);
    }

    #[test]
    fn test_requantize_vector_probabilistic_in_range() {
        let mut generator =
            ProbabilisticRoundingOffsetGenerator::from_seed(DEFAULT_SEED);
        let input = [200u8; 16];
        for _ in 0..500 {
            let got = store(requantize_vector::<Bits4, _>(load(&input), &mut generator));
            assert!(got.iter().all(|&x| x <= 15));
        }
    }

    #[test]
    fn test_requantize_vector_probabilistic_endpoints_fixed() {
        let mut generator =
            ProbabilisticRoundingOffsetGenerator::from_seed(DEFAULT_SEED);
        for _ in 0..100 {
            let zeros = store(requantize_vector::<Bits7, _>(load(&[0u8; 16]), &mut generator));
            assert_eq!(zeros, [0u8; 16]);
            let maxed = store(requantize_vector::<Bits7, _>(load(&[255u8; 16]), &mut generator));
            assert_eq!(maxed, [127u8; 16]);
        }
    }

    fn simd_against_scalar_tile<F: KernelSideFormat>() {
        // One kernel tile of a fixed pattern, packed by both paths in
        // nearest mode, must produce identical bytes and sums.
        let width = F::WIDTH;
        let src_bytes: Vec<u8> =
            (0..width * REGISTER_SIZE).map(|i| (i * 7 + 3) as u8).collect();
        let src = SideMap::new(&src_bytes, width, REGISTER_SIZE, REGISTER_SIZE, SideMapOrder::WidthMajor);

        let params = BlockParams::for_format::<F>(width, REGISTER_SIZE);
        let mut simd_dst = PackedSideBlock::<F>::new(params, -1);
        let mut scalar_dst = PackedSideBlock::<F>::new(params, -1);

        let mut generator = NearestRoundingOffsetGenerator;
        pack_tile_4x2::<Bits7, F, _>(&src, &mut simd_dst, 0, &mut generator);
        PackingRegisterBlock::<F>::pack_tile_scalar::<Bits7, _>(
            &src,
            &mut scalar_dst,
            0,
            &mut generator,
        );

        assert_eq!(simd_dst.data(), scalar_dst.data());
        assert_eq!(simd_dst.rank_one_update(), scalar_dst.rank_one_update());
    }

    #[test]
    fn test_tile_matches_scalar_depth_major_one_cell() {
        simd_against_scalar_tile::<DepthMajor4x2Cells1>();
    }

    #[test]
    fn test_tile_matches_scalar_depth_major_three_cells() {
        simd_against_scalar_tile::<DepthMajor4x2Cells3>();
    }

    #[test]
    fn test_tile_matches_scalar_width_major_two_cells() {
        simd_against_scalar_tile::<WidthMajor4x2Cells2>();
    }
}
