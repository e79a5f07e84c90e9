//! Cell and kernel side formats
//!
//! The packed layout is a grid of fixed-shape cells. A compute kernel
//! declares the cell shape, the cell-internal byte order, and how many
//! cells it consumes side by side along the width; the packer must emit
//! exactly that byte sequence. Formats are marker types so the packing
//! loops monomorphize per format.

/// Depth of one register tile: the number of depth levels a kernel consumes
/// per iteration, and the lane count of the 128-bit requantize path.
pub const REGISTER_SIZE: usize = 16;

/// Byte order inside a cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CellOrder {
    /// Byte (w, d) at offset `w * cell_depth + d`: depth contiguous.
    DepthMajor,
    /// Byte (w, d) at offset `d * cell_width + w`: width contiguous.
    WidthMajor,
}

/// Compile-time shape and internal order of one cell.
pub trait CellFormat: Copy {
    const WIDTH: usize;
    const DEPTH: usize;
    const ORDER: CellOrder;
    const SIZE: usize = Self::WIDTH * Self::DEPTH;
}

/// 4 wide, 2 deep, depth contiguous.
#[derive(Debug, Copy, Clone)]
pub struct DepthMajorCell4x2;

impl CellFormat for DepthMajorCell4x2 {
    const WIDTH: usize = 4;
    const DEPTH: usize = 2;
    const ORDER: CellOrder = CellOrder::DepthMajor;
}

/// 4 wide, 2 deep, width contiguous.
#[derive(Debug, Copy, Clone)]
pub struct WidthMajorCell4x2;

impl CellFormat for WidthMajorCell4x2 {
    const WIDTH: usize = 4;
    const DEPTH: usize = 2;
    const ORDER: CellOrder = CellOrder::WidthMajor;
}

/// Linear byte offset of coordinate (w, d) inside a cell of format `C`.
#[inline]
pub fn offset_into_cell<C: CellFormat>(w: usize, d: usize) -> usize {
    debug_assert!(w < C::WIDTH && d < C::DEPTH);
    match C::ORDER {
        CellOrder::DepthMajor => w * C::DEPTH + d,
        CellOrder::WidthMajor => d * C::WIDTH + w,
    }
}

/// Buffer holding one complete kernel-width by register-depth tile, used to
/// zero-extend boundary tiles without heap allocation.
pub trait TileBuffer {
    fn zeroed() -> Self;
    fn bytes(&self) -> &[u8];
    fn bytes_mut(&mut self) -> &mut [u8];
}

impl<const N: usize> TileBuffer for [u8; N] {
    fn zeroed() -> Self {
        [0; N]
    }

    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

/// One side's packed format: `CELLS` cells of shape `Cell` tiled along the
/// width. The kernel tile is `WIDTH x REGISTER_SIZE` bytes.
pub trait KernelSideFormat: Copy {
    type Cell: CellFormat;
    /// Scratch array of exactly `WIDTH * REGISTER_SIZE` bytes.
    type ScratchTile: TileBuffer;
    const CELLS: usize;
    const WIDTH: usize = <Self::Cell as CellFormat>::WIDTH * Self::CELLS;
    const CELL_WIDTH: usize = <Self::Cell as CellFormat>::WIDTH;
    const CELL_DEPTH: usize = <Self::Cell as CellFormat>::DEPTH;
    const CELL_SIZE: usize = <Self::Cell as CellFormat>::SIZE;
    const CELL_ORDER: CellOrder = <Self::Cell as CellFormat>::ORDER;
}

macro_rules! declare_kernel_side_format {
    ($(#[$meta:meta])* $name:ident, $cell:ty, $cells:expr) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone)]
        pub struct $name;

        impl KernelSideFormat for $name {
            type Cell = $cell;
            type ScratchTile = [u8; <$cell as CellFormat>::WIDTH * $cells * REGISTER_SIZE];
            const CELLS: usize = $cells;
        }
    };
}

declare_kernel_side_format!(
    /// Kernel width 4: one depth-major 4x2 cell per tile row.
    DepthMajor4x2Cells1,
    DepthMajorCell4x2,
    1
);
declare_kernel_side_format!(
    /// Kernel width 8: two depth-major 4x2 cells per tile row.
    DepthMajor4x2Cells2,
    DepthMajorCell4x2,
    2
);
declare_kernel_side_format!(
    /// Kernel width 12: three depth-major 4x2 cells per tile row.
    DepthMajor4x2Cells3,
    DepthMajorCell4x2,
    3
);
declare_kernel_side_format!(
    /// Kernel width 16: four depth-major 4x2 cells per tile row.
    DepthMajor4x2Cells4,
    DepthMajorCell4x2,
    4
);
declare_kernel_side_format!(
    /// Kernel width 4: one width-major 4x2 cell per tile row.
    WidthMajor4x2Cells1,
    WidthMajorCell4x2,
    1
);
declare_kernel_side_format!(
    /// Kernel width 8: two width-major 4x2 cells per tile row.
    WidthMajor4x2Cells2,
    WidthMajorCell4x2,
    2
);
declare_kernel_side_format!(
    /// Kernel width 12: three width-major 4x2 cells per tile row.
    WidthMajor4x2Cells3,
    WidthMajorCell4x2,
    3
);
declare_kernel_side_format!(
    /// Kernel width 16: four width-major 4x2 cells per tile row.
    WidthMajor4x2Cells4,
    WidthMajorCell4x2,
    4
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_major_cell_offsets() {
        // Depth is contiguous: (w, d) -> 2w + d.
        let expected = [
            ((0, 0), 0),
            ((0, 1), 1),
            ((1, 0), 2),
            ((1, 1), 3),
            ((2, 0), 4),
            ((2, 1), 5),
            ((3, 0), 6),
            ((3, 1), 7),
        ];
        for ((w, d), offset) in expected {
            assert_eq!(offset_into_cell::<DepthMajorCell4x2>(w, d), offset);
        }
    }

    #[test]
    fn test_width_major_cell_offsets() {
        // Width is contiguous: (w, d) -> 4d + w.
        let expected = [
            ((0, 0), 0),
            ((1, 0), 1),
            ((2, 0), 2),
            ((3, 0), 3),
            ((0, 1), 4),
            ((1, 1), 5),
            ((2, 1), 6),
            ((3, 1), 7),
        ];
        for ((w, d), offset) in expected {
            assert_eq!(offset_into_cell::<WidthMajorCell4x2>(w, d), offset);
        }
    }

    #[test]
    fn test_offsets_are_a_permutation() {
        let mut seen = [false; 8];
        for w in 0..4 {
            for d in 0..2 {
                seen[offset_into_cell::<WidthMajorCell4x2>(w, d)] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_kernel_format_derived_consts() {
        assert_eq!(DepthMajor4x2Cells3::WIDTH, 12);
        assert_eq!(DepthMajor4x2Cells3::CELL_SIZE, 8);
        assert_eq!(WidthMajor4x2Cells2::WIDTH, 8);
        assert_eq!(WidthMajor4x2Cells2::CELL_ORDER, CellOrder::WidthMajor);
    }

    fn scratch_len<F: KernelSideFormat>() -> usize {
        <F::ScratchTile as TileBuffer>::zeroed().bytes().len()
    }

    #[test]
    fn test_scratch_tile_sizes() {
        assert_eq!(scratch_len::<DepthMajor4x2Cells2>(), 8 * REGISTER_SIZE);
        assert_eq!(scratch_len::<WidthMajor4x2Cells4>(), 16 * REGISTER_SIZE);
    }
}
