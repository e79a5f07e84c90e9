//! Packed destination block and tiling parameters
//!
//! A [`PackedSideBlock`] owns the packed byte buffer for one L2-sized block
//! of one side, plus the rank-one-update vector the kernel adds into the
//! accumulator to correct for the unsigned quantization offset of the other
//! operand. Writes are sequential through a cursor; the kernel reads back
//! in the same order.

use std::marker::PhantomData;

use crate::common::round_up;

use super::format::{KernelSideFormat, REGISTER_SIZE};

/// Default width of an L1 tile before rounding to the kernel width.
pub const DEFAULT_L1_WIDTH: usize = 64;
/// Default depth of an L1 tile; a multiple of the register depth.
pub const DEFAULT_L1_DEPTH: usize = 256;

/// L1/L2 tile sizes used by the pack traversal.
///
/// All four values are rounded: widths to the kernel width, depths to the
/// register depth. The L2 values size the packed buffer; the L1 values set
/// the traversal granularity and the run length of the packed layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockParams {
    pub l1_width: usize,
    pub l1_depth: usize,
    pub l2_width: usize,
    pub l2_depth: usize,
}

impl BlockParams {
    /// Parameters for packing a `width x depth` source block in format `F`,
    /// with the default L1 tile sizes clipped to the block.
    pub fn for_format<F: KernelSideFormat>(width: usize, depth: usize) -> Self {
        let l2_width = round_up(width, F::WIDTH);
        let l2_depth = round_up(depth, REGISTER_SIZE);
        Self {
            l1_width: l2_width.min(round_up(DEFAULT_L1_WIDTH, F::WIDTH)),
            l1_depth: l2_depth.min(DEFAULT_L1_DEPTH),
            l2_width,
            l2_depth,
        }
    }

    /// Overrides the L1 tile sizes, keeping the same rounding rules.
    pub fn with_l1<F: KernelSideFormat>(mut self, l1_width: usize, l1_depth: usize) -> Self {
        self.l1_width = self.l2_width.min(round_up(l1_width, F::WIDTH));
        self.l1_depth = self.l2_depth.min(round_up(l1_depth, REGISTER_SIZE));
        self
    }
}

/// Packed bytes and rank-one-update sums for one side of one L2 block.
pub struct PackedSideBlock<F: KernelSideFormat> {
    data: Vec<u8>,
    rank_one_update: Vec<i32>,
    rank_one_update_multiplier: i32,
    params: BlockParams,
    pos: usize,
    _format: PhantomData<F>,
}

impl<F: KernelSideFormat> PackedSideBlock<F> {
    /// Reserves a packed block of `params.l2_width * params.l2_depth` bytes
    /// plus `params.l2_width` rank-one-update entries.
    ///
    /// The multiplier scales every rank-one-update sum; its sign follows
    /// the sign convention of the other operand's quantization zero.
    pub fn new(params: BlockParams, rank_one_update_multiplier: i32) -> Self {
        assert!(
            params.l2_width % F::WIDTH == 0 && params.l1_width % F::WIDTH == 0,
            "block widths must be multiples of the kernel width {}",
            F::WIDTH
        );
        assert!(
            params.l2_depth % REGISTER_SIZE == 0 && params.l1_depth % REGISTER_SIZE == 0,
            "block depths must be multiples of the register depth {}",
            REGISTER_SIZE
        );
        assert!(
            params.l1_width <= params.l2_width && params.l1_depth <= params.l2_depth,
            "L1 tile larger than L2 block"
        );
        Self {
            data: vec![0; params.l2_width * params.l2_depth],
            rank_one_update: vec![0; params.l2_width],
            rank_one_update_multiplier,
            params,
            pos: 0,
            _format: PhantomData,
        }
    }

    pub fn params(&self) -> BlockParams {
        self.params
    }

    /// The packed bytes, in the cursor order the kernel consumes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Per-width sums of packed entries, times the multiplier.
    pub fn rank_one_update(&self) -> &[i32] {
        &self.rank_one_update
    }

    pub fn rank_one_update_multiplier(&self) -> i32 {
        self.rank_one_update_multiplier
    }

    /// Repositions the cursor to the start of the kernel-width run at
    /// (start_width, start_depth).
    ///
    /// The packed layout is a sequence of L1-depth slices, each a sequence
    /// of kernel-width runs, so a run starts after `start_depth` full-width
    /// slices plus the preceding runs of its own slice.
    pub fn seek_run(&mut self, start_width: usize, start_depth: usize) {
        debug_assert!(start_width % F::WIDTH == 0);
        debug_assert!(start_depth % self.params.l1_depth == 0);
        let kernel_run_depth = self.params.l1_depth.min(self.params.l2_depth - start_depth);
        self.pos = start_depth * self.params.l2_width + start_width * kernel_run_depth;
    }

    /// Advances the cursor by `n` cells.
    pub fn seek_forward_n_cells(&mut self, n: usize) {
        self.pos += n * F::CELL_SIZE;
    }

    pub(crate) fn reset_for_pack(&mut self) {
        self.pos = 0;
        self.rank_one_update.fill(0);
    }

    /// The next `tile_len` destination bytes at the cursor, together with
    /// the rank-one-update vector. Does not advance the cursor.
    pub(crate) fn current_tile_and_rank_one_update(
        &mut self,
        tile_len: usize,
    ) -> (&mut [u8], &mut [i32]) {
        assert!(
            self.pos + tile_len <= self.data.len(),
            "packed destination too small: cursor {} + tile {} > capacity {}",
            self.pos,
            tile_len,
            self.data.len()
        );
        (
            &mut self.data[self.pos..self.pos + tile_len],
            &mut self.rank_one_update[..],
        )
    }
}
