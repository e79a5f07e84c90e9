//! L2 pack traversal
//!
//! Walks an L2-sized source block in L1 tiles, each L1 tile in kernel-width
//! runs, each run in register tiles, and streams the tiles through the
//! register-block packer. The rounding mode is selected once per L2 pack
//! from the full source depth, then the whole traversal runs monomorphized
//! over the chosen offset generator so requantization stays inlined.

use std::marker::PhantomData;

use crate::common::{CACHE_LINE_SIZE, prefetch, round_down};

use super::bit_depth::BitDepth;
use super::format::{KernelSideFormat, REGISTER_SIZE};
use super::packed_block::PackedSideBlock;
use super::register_block::PackingRegisterBlock;
use super::rounding::{
    NearestRoundingOffsetGenerator, PackOffsetGenerator, ProbabilisticRoundingOffsetGenerator,
    RoundingMode, choose_rounding_mode,
};
use super::side_map::{SideMap, SideMapOrder};
use super::xorshift::DEFAULT_SEED;

/// Packs one source side map into a packed side block.
pub struct PackSideBlockImpl<'s, 'd, D: BitDepth, F: KernelSideFormat> {
    src: SideMap<'s>,
    dst: &'d mut PackedSideBlock<F>,
    _bit_depth: PhantomData<D>,
}

impl<'s, 'd, D: BitDepth, F: KernelSideFormat> PackSideBlockImpl<'s, 'd, D, F> {
    pub fn new(src: SideMap<'s>, dst: &'d mut PackedSideBlock<F>) -> Self {
        assert!(
            src.width() <= dst.params().l2_width,
            "source width {} exceeds packed width {}",
            src.width(),
            dst.params().l2_width
        );
        assert!(
            src.depth() <= dst.params().l2_depth,
            "source depth {} exceeds packed depth {}",
            src.depth(),
            dst.params().l2_depth
        );
        Self {
            src,
            dst,
            _bit_depth: PhantomData,
        }
    }

    /// Packs the whole block with the default PRNG seed.
    pub fn pack_l2(&mut self) {
        self.pack_l2_seeded(DEFAULT_SEED);
    }

    /// Packs the whole block. With equal seeds and equal inputs, two packs
    /// produce identical output in either rounding mode.
    pub fn pack_l2_seeded(&mut self, seed: u8) {
        self.dst.reset_for_pack();
        if self.src.width() == 0 || self.src.depth() == 0 {
            return;
        }
        match choose_rounding_mode::<D>(self.src.depth()) {
            RoundingMode::Nearest => self.pack_all::<NearestRoundingOffsetGenerator>(seed),
            RoundingMode::Probabilistic => {
                self.pack_all::<ProbabilisticRoundingOffsetGenerator>(seed)
            }
        }
    }

    fn pack_all<G: PackOffsetGenerator>(&mut self, seed: u8) {
        let mut generator = G::from_seed(seed);
        let mut register_block = PackingRegisterBlock::<F>::new();
        let params = self.dst.params();
        let width = self.src.width();
        let depth = self.src.depth();

        let mut d = 0;
        while d < depth {
            let ds = params.l1_depth.min(depth - d);
            let mut w = 0;
            while w < width {
                let ws = params.l1_width.min(width - w);
                self.prefetch_l1_block(w, ws, d, ds);
                self.pack_l1(w, ws, d, ds, &mut register_block, &mut generator);
                w += params.l1_width;
            }
            d += params.l1_depth;
        }
    }

    fn pack_l1<G: PackOffsetGenerator>(
        &mut self,
        start_width: usize,
        width: usize,
        start_depth: usize,
        depth: usize,
        register_block: &mut PackingRegisterBlock<F>,
        generator: &mut G,
    ) {
        let mut w = 0;
        while w < width {
            let ws = F::WIDTH.min(width - w);
            self.dst.seek_run(start_width + w, start_depth);
            self.pack_run(start_width + w, ws, start_depth, depth, register_block, generator);
            w += F::WIDTH;
        }
    }

    /// Packs one kernel-width run of `depth` source rows. Interior runs go
    /// through the in-place path for every complete register tile; a depth
    /// remainder, or a strip narrower than the kernel width, is
    /// zero-extended by the register block.
    fn pack_run<G: PackOffsetGenerator>(
        &mut self,
        start_width: usize,
        width: usize,
        start_depth: usize,
        depth: usize,
        register_block: &mut PackingRegisterBlock<F>,
        generator: &mut G,
    ) {
        if width == F::WIDTH {
            let aligned_depth = round_down(depth, REGISTER_SIZE);
            let mut d = 0;
            while d < aligned_depth {
                let tile = self.src.block(start_width, start_depth + d, F::WIDTH, REGISTER_SIZE);
                register_block.pack_complete::<D, G>(&tile, self.dst, start_width, generator);
                d += REGISTER_SIZE;
            }
            if aligned_depth < depth {
                let tile = self.src.block(
                    start_width,
                    start_depth + aligned_depth,
                    width,
                    depth - aligned_depth,
                );
                register_block.pack_boundary::<D, G>(&tile, self.dst, start_width, generator);
            }
        } else {
            let mut d = 0;
            while d < depth {
                let ds = REGISTER_SIZE.min(depth - d);
                let tile = self.src.block(start_width, start_depth + d, width, ds);
                register_block.pack_boundary::<D, G>(&tile, self.dst, start_width, generator);
                d += REGISTER_SIZE;
            }
        }
    }

    /// Advisory prefetch of an L1 source tile: cache-line stride along the
    /// contiguous dimension, unit stride along the strided one.
    fn prefetch_l1_block(&self, start_width: usize, width: usize, start_depth: usize, depth: usize) {
        match self.src.order() {
            SideMapOrder::WidthMajor => {
                for w in 0..width {
                    let mut d = 0;
                    while d < depth {
                        prefetch(self.src.ptr_at(start_width + w, start_depth + d));
                        d += CACHE_LINE_SIZE;
                    }
                }
            }
            SideMapOrder::DepthMajor => {
                for d in 0..depth {
                    let mut w = 0;
                    while w < width {
                        prefetch(self.src.ptr_at(start_width + w, start_depth + d));
                        w += CACHE_LINE_SIZE;
                    }
                }
            }
        }
    }
}
