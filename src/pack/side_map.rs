//! Strided (width, depth) views over source matrix memory
//!
//! Packing addresses both operands in the same coordinate system: `width`
//! is the non-accumulated dimension of a side and `depth` the accumulated
//! one. A [`SideMap`] is a non-owning view tagged with which of the two is
//! the major (strided) dimension, so the same packing code walks row-major
//! and column-major sources.

/// Which dimension of a side map is major, that is, strided.
///
/// `WidthMajor` means one stride step per width index and contiguous bytes
/// along depth; `DepthMajor` is the transpose.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SideMapOrder {
    WidthMajor,
    DepthMajor,
}

/// Non-owning view of a `width x depth` region of source bytes.
#[derive(Debug, Copy, Clone)]
pub struct SideMap<'a> {
    data: &'a [u8],
    width: usize,
    depth: usize,
    stride: usize,
    order: SideMapOrder,
}

impl<'a> SideMap<'a> {
    pub fn new(
        data: &'a [u8],
        width: usize,
        depth: usize,
        stride: usize,
        order: SideMapOrder,
    ) -> Self {
        let map = Self {
            data,
            width,
            depth,
            stride,
            order,
        };
        if width > 0 && depth > 0 {
            let minor = match order {
                SideMapOrder::WidthMajor => depth,
                SideMapOrder::DepthMajor => width,
            };
            assert!(
                stride >= minor,
                "stride {} shorter than minor dimension {}",
                stride,
                minor
            );
            let span = (width - 1) * map.width_stride() + (depth - 1) * map.depth_stride() + 1;
            assert!(
                span <= data.len(),
                "side map {}x{} with stride {} spans {} bytes, buffer holds {}",
                width,
                depth,
                stride,
                span,
                data.len()
            );
        }
        map
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn order(&self) -> SideMapOrder {
        self.order
    }

    #[inline]
    pub fn width_stride(&self) -> usize {
        match self.order {
            SideMapOrder::WidthMajor => self.stride,
            SideMapOrder::DepthMajor => 1,
        }
    }

    #[inline]
    pub fn depth_stride(&self) -> usize {
        match self.order {
            SideMapOrder::WidthMajor => 1,
            SideMapOrder::DepthMajor => self.stride,
        }
    }

    #[inline]
    fn offset(&self, w: usize, d: usize) -> usize {
        debug_assert!(w < self.width && d < self.depth);
        w * self.width_stride() + d * self.depth_stride()
    }

    /// The byte at (width, depth) coordinates.
    #[inline]
    pub fn at(&self, w: usize, d: usize) -> u8 {
        self.data[self.offset(w, d)]
    }

    /// A rectangular sub-view. No copy; the result shares this map's
    /// storage and stride.
    pub fn block(
        &self,
        start_width: usize,
        start_depth: usize,
        width: usize,
        depth: usize,
    ) -> SideMap<'a> {
        assert!(
            start_width + width <= self.width && start_depth + depth <= self.depth,
            "sub-view {}x{} at ({}, {}) outside parent {}x{}",
            width,
            depth,
            start_width,
            start_depth,
            self.width,
            self.depth
        );
        let start = start_width * self.width_stride() + start_depth * self.depth_stride();
        SideMap {
            data: &self.data[start..],
            width,
            depth,
            stride: self.stride,
            order: self.order,
        }
    }

    /// `len` contiguous bytes along depth starting at (w, d). Only valid on
    /// width-major maps, where depth is the contiguous dimension.
    #[inline]
    pub(crate) fn depth_run(&self, w: usize, d: usize, len: usize) -> &'a [u8] {
        debug_assert_eq!(self.depth_stride(), 1);
        debug_assert!(d + len <= self.depth);
        let start = self.offset(w, d);
        &self.data[start..start + len]
    }

    #[inline]
    pub(crate) fn ptr_at(&self, w: usize, d: usize) -> *const u8 {
        self.data[self.offset(w, d)..].as_ptr()
    }
}
