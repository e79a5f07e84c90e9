//! Packing of one register-sized tile
//!
//! A register tile is `kernel_width x REGISTER_SIZE` source bytes. Complete
//! tiles are packed straight from the source view; boundary tiles (at the
//! right or bottom edge of the block) are first zero-extended into a local
//! scratch buffer so that one tile-packing routine handles every case.
//! Requantization maps zero to zero under every rounding mode, so padding
//! before requantization leaves the padding zero in the packed output and
//! contributes nothing to the rank-one update.

use super::bit_depth::BitDepth;
use super::format::{KernelSideFormat, REGISTER_SIZE, TileBuffer, offset_into_cell};
use super::packed_block::PackedSideBlock;
use super::requantize::requantize;
use super::rounding::{PackOffsetGenerator, RoundingOffsetGenerator};
use super::side_map::{SideMap, SideMapOrder};

/// Packs register tiles into a destination block, owning the scratch
/// buffer used to complete boundary tiles.
pub struct PackingRegisterBlock<F: KernelSideFormat> {
    scratch: F::ScratchTile,
}

impl<F: KernelSideFormat> PackingRegisterBlock<F> {
    pub fn new() -> Self {
        Self {
            scratch: <F::ScratchTile as TileBuffer>::zeroed(),
        }
    }

    /// Packs a complete `F::WIDTH x REGISTER_SIZE` tile directly from the
    /// source view and advances the destination cursor past it.
    pub fn pack_complete<D: BitDepth, G: PackOffsetGenerator>(
        &mut self,
        src: &SideMap<'_>,
        dst: &mut PackedSideBlock<F>,
        start_width: usize,
        generator: &mut G,
    ) {
        debug_assert_eq!(src.width(), F::WIDTH);
        debug_assert_eq!(src.depth(), REGISTER_SIZE);
        Self::pack_tile::<D, G>(src, dst, start_width, generator);
    }

    /// Zero-extends an incomplete source tile into the scratch buffer, then
    /// packs the completed tile.
    pub fn pack_boundary<D: BitDepth, G: PackOffsetGenerator>(
        &mut self,
        src: &SideMap<'_>,
        dst: &mut PackedSideBlock<F>,
        start_width: usize,
        generator: &mut G,
    ) {
        debug_assert!(src.width() <= F::WIDTH);
        debug_assert!(src.depth() <= REGISTER_SIZE);
        let scratch = self.scratch.bytes_mut();
        scratch.fill(0);
        match src.order() {
            SideMapOrder::WidthMajor => {
                for w in 0..src.width() {
                    let row = src.depth_run(w, 0, src.depth());
                    scratch[w * REGISTER_SIZE..w * REGISTER_SIZE + src.depth()]
                        .copy_from_slice(row);
                }
            }
            SideMapOrder::DepthMajor => {
                for w in 0..src.width() {
                    for d in 0..src.depth() {
                        scratch[w * REGISTER_SIZE + d] = src.at(w, d);
                    }
                }
            }
        }
        let complete = SideMap::new(
            self.scratch.bytes(),
            F::WIDTH,
            REGISTER_SIZE,
            REGISTER_SIZE,
            SideMapOrder::WidthMajor,
        );
        Self::pack_tile::<D, G>(&complete, dst, start_width, generator);
    }

    fn pack_tile<D: BitDepth, G: PackOffsetGenerator>(
        src: &SideMap<'_>,
        dst: &mut PackedSideBlock<F>,
        start_width: usize,
        generator: &mut G,
    ) {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            if F::CELL_WIDTH == 4
                && F::CELL_DEPTH == 2
                && src.order() == SideMapOrder::WidthMajor
            {
                super::simd::pack_tile_4x2::<D, F, G>(src, dst, start_width, generator);
                dst.seek_forward_n_cells(F::CELLS * REGISTER_SIZE / F::CELL_DEPTH);
                return;
            }
        }
        Self::pack_tile_scalar::<D, G>(src, dst, start_width, generator);
        dst.seek_forward_n_cells(F::CELLS * REGISTER_SIZE / F::CELL_DEPTH);
    }

    /// Reference tile packer: one byte at a time through the scalar
    /// requantize, cells emitted depth slice by depth slice. Does not move
    /// the destination cursor.
    pub(crate) fn pack_tile_scalar<D: BitDepth, G: RoundingOffsetGenerator>(
        src: &SideMap<'_>,
        dst: &mut PackedSideBlock<F>,
        start_width: usize,
        generator: &mut G,
    ) {
        let multiplier = dst.rank_one_update_multiplier();
        let (tile, rank_one_update) =
            dst.current_tile_and_rank_one_update(F::WIDTH * REGISTER_SIZE);
        let mut cell_offset = 0;
        for cell_start_depth in (0..REGISTER_SIZE).step_by(F::CELL_DEPTH) {
            for cell in 0..F::CELLS {
                let cell_start_width = cell * F::CELL_WIDTH;
                for w in 0..F::CELL_WIDTH {
                    let mut sum = 0i32;
                    for d in 0..F::CELL_DEPTH {
                        let requantized = requantize::<D, G>(
                            src.at(cell_start_width + w, cell_start_depth + d),
                            generator,
                        );
                        tile[cell_offset + offset_into_cell::<F::Cell>(w, d)] = requantized;
                        sum += i32::from(requantized);
                    }
                    rank_one_update[start_width + cell_start_width + w] += sum * multiplier;
                }
                cell_offset += F::CELL_SIZE;
            }
        }
    }
}

impl<F: KernelSideFormat> Default for PackingRegisterBlock<F> {
    fn default() -> Self {
        Self::new()
    }
}
