//! Low-precision matrix packing core
//!
//! A matrix multiplication over unsigned 8-bit entries can run with
//! narrower accumulators, and therefore higher SIMD throughput, if the
//! operands are stored internally at fewer than 8 bits per entry. This
//! crate implements the packing stage of such a multiplication: it
//! rearranges a block of a source matrix into the cell layout a compute
//! kernel reads, requantizes every byte from [0, 255] to the side's bit
//! depth with an unbiased rounding policy, and accumulates the per-width
//! sums the kernel applies as a rank-one correction to the accumulator.
//!
//! Inputs and outputs of the overall multiplication stay 8-bit; the narrow
//! representation is internal, and the later unpack stage rescales results
//! by 255 * 255 / (max_lhs * max_rhs).

mod common;

pub mod matrix;   // Strided read-only matrix views
pub mod pack;     // Requantizing block packer
pub mod random;   // Seeded test/bench data generation

// Re-export the main types
pub use matrix::{MapOrder, MatrixMap};
pub use pack::{
    BitDepth, Bits1, Bits2, Bits3, Bits4, Bits5, Bits6, Bits7, Bits8, BlockParams, CellFormat,
    CellOrder, KernelSideFormat, PackSideBlockImpl, PackedSideBlock, REGISTER_SIZE, RoundingMode,
    SideMap, SideMapOrder, Xorshift8, choose_rounding_mode, pack_lhs, pack_lhs_with_seed,
    pack_rhs, pack_rhs_with_seed,
};
