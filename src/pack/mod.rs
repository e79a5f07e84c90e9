//! Packing of source matrix blocks into kernel-ready storage
//!
//! Packing transforms a block of a source matrix into the cell layout a
//! compute kernel consumes, requantizing each byte to the side's bit depth
//! on the way through and accumulating the per-width sums the kernel needs
//! for its rank-one correction.

pub mod bit_depth;
pub mod driver;
pub mod format;
pub mod packed_block;
pub mod register_block;
pub mod requantize;
pub mod rounding;
pub mod side_map;
pub mod xorshift;

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
pub mod simd;

// Re-export the main types
pub use bit_depth::{BitDepth, Bits1, Bits2, Bits3, Bits4, Bits5, Bits6, Bits7, Bits8};
pub use driver::PackSideBlockImpl;
pub use format::{
    CellFormat, CellOrder, DepthMajor4x2Cells1, DepthMajor4x2Cells2, DepthMajor4x2Cells3,
    DepthMajor4x2Cells4, DepthMajorCell4x2, KernelSideFormat, REGISTER_SIZE, WidthMajor4x2Cells1,
    WidthMajor4x2Cells2, WidthMajor4x2Cells3, WidthMajor4x2Cells4, WidthMajorCell4x2,
};
pub use packed_block::{BlockParams, PackedSideBlock};
pub use rounding::{RoundingMode, choose_rounding_mode};
pub use side_map::{SideMap, SideMapOrder};
pub use xorshift::{DEFAULT_SEED, Xorshift8};

use crate::matrix::{MapOrder, MatrixMap};

/// Packs a left-hand-side block: width runs along the rows, depth along the
/// columns, so a row-major source becomes a width-major side map.
pub fn pack_lhs<D: BitDepth, F: KernelSideFormat>(
    dst: &mut PackedSideBlock<F>,
    src: &MatrixMap<'_>,
) {
    pack_lhs_with_seed::<D, F>(dst, src, DEFAULT_SEED);
}

/// [`pack_lhs`] with an explicit PRNG seed for reproducible probabilistic
/// rounding.
pub fn pack_lhs_with_seed<D: BitDepth, F: KernelSideFormat>(
    dst: &mut PackedSideBlock<F>,
    src: &MatrixMap<'_>,
    seed: u8,
) {
    let order = match src.order() {
        MapOrder::RowMajor => SideMapOrder::WidthMajor,
        MapOrder::ColMajor => SideMapOrder::DepthMajor,
    };
    let side = SideMap::new(src.data(), src.rows(), src.cols(), src.stride(), order);
    PackSideBlockImpl::<D, F>::new(side, dst).pack_l2_seeded(seed);
}

/// Packs a right-hand-side block: width runs along the columns, depth along
/// the rows, so a column-major source becomes a width-major side map.
pub fn pack_rhs<D: BitDepth, F: KernelSideFormat>(
    dst: &mut PackedSideBlock<F>,
    src: &MatrixMap<'_>,
) {
    pack_rhs_with_seed::<D, F>(dst, src, DEFAULT_SEED);
}

/// [`pack_rhs`] with an explicit PRNG seed for reproducible probabilistic
/// rounding.
pub fn pack_rhs_with_seed<D: BitDepth, F: KernelSideFormat>(
    dst: &mut PackedSideBlock<F>,
    src: &MatrixMap<'_>,
    seed: u8,
) {
    let order = match src.order() {
        MapOrder::ColMajor => SideMapOrder::WidthMajor,
        MapOrder::RowMajor => SideMapOrder::DepthMajor,
    };
    let side = SideMap::new(src.data(), src.cols(), src.rows(), src.stride(), order);
    PackSideBlockImpl::<D, F>::new(side, dst).pack_l2_seeded(seed);
}
