//! Read-only matrix views
//!
//! The packing entry points accept plain strided views over caller-owned
//! bytes. A [`MatrixMap`] carries no element semantics; the packer maps it
//! into (width, depth) side coordinates depending on which operand it is.

/// Storage order of a matrix view.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapOrder {
    RowMajor,
    ColMajor,
}

/// Non-owning view of a `rows x cols` matrix of bytes.
#[derive(Debug, Copy, Clone)]
pub struct MatrixMap<'a> {
    data: &'a [u8],
    rows: usize,
    cols: usize,
    stride: usize,
    order: MapOrder,
}

impl<'a> MatrixMap<'a> {
    pub fn new(data: &'a [u8], rows: usize, cols: usize, stride: usize, order: MapOrder) -> Self {
        if rows > 0 && cols > 0 {
            let (major, minor) = match order {
                MapOrder::RowMajor => (rows, cols),
                MapOrder::ColMajor => (cols, rows),
            };
            assert!(
                stride >= minor,
                "stride {} shorter than minor dimension {}",
                stride,
                minor
            );
            let span = (major - 1) * stride + minor;
            assert!(
                span <= data.len(),
                "matrix {}x{} with stride {} spans {} bytes, buffer holds {}",
                rows,
                cols,
                stride,
                span,
                data.len()
            );
        }
        Self {
            data,
            rows,
            cols,
            stride,
            order,
        }
    }

    /// A view with the tight stride for its order.
    pub fn contiguous(data: &'a [u8], rows: usize, cols: usize, order: MapOrder) -> Self {
        let stride = match order {
            MapOrder::RowMajor => cols,
            MapOrder::ColMajor => rows,
        };
        Self::new(data, rows, cols, stride, order)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn order(&self) -> MapOrder {
        self.order
    }

    /// The byte at (row, col).
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> u8 {
        debug_assert!(row < self.rows && col < self.cols);
        match self.order {
            MapOrder::RowMajor => self.data[row * self.stride + col],
            MapOrder::ColMajor => self.data[col * self.stride + row],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_addressing() {
        let data: Vec<u8> = (0..12).collect();
        let m = MatrixMap::contiguous(&data, 3, 4, MapOrder::RowMajor);
        assert_eq!(m.at(0, 0), 0);
        assert_eq!(m.at(1, 0), 4);
        assert_eq!(m.at(2, 3), 11);
    }

    #[test]
    fn test_col_major_addressing() {
        let data: Vec<u8> = (0..12).collect();
        let m = MatrixMap::contiguous(&data, 3, 4, MapOrder::ColMajor);
        assert_eq!(m.at(0, 0), 0);
        assert_eq!(m.at(1, 0), 1);
        assert_eq!(m.at(2, 3), 11);
    }

    #[test]
    fn test_padded_stride() {
        let data = [0u8; 20];
        let m = MatrixMap::new(&data, 3, 4, 6, MapOrder::RowMajor);
        assert_eq!(m.stride(), 6);
    }

    #[test]
    #[should_panic(expected = "spans")]
    fn test_undersized_buffer_rejected() {
        let data = [0u8; 11];
        MatrixMap::contiguous(&data, 3, 4, MapOrder::RowMajor);
    }
}
