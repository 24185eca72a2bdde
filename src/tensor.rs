use std::{fmt::Debug, sync::Arc};

use crate::device::{Device, DeviceBuffer, Element, Label, OperationError, OperationResult};

/// Row-major `rows x cols` matrix, used for log-probabilities, dense
/// labels and gradients.
pub struct DenseMatrix<D: Device, T: Element> {
    pub buf: D::Buffer<T>,
    pub rows: usize,
    pub cols: usize,
}

impl<D: Device, T: Element> Debug for DenseMatrix<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl<D: Device, T: Element> DenseMatrix<D, T> {
    pub fn zeroed(device: Arc<D>, rows: usize, cols: usize) -> Result<Self, D::DeviceError> {
        let buf = <D::Buffer<T>>::new(device, rows * cols)?;
        Ok(Self { buf, rows, cols })
    }

    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    pub fn load_from_slice(&mut self, buf: &[T]) -> Result<(), D::DeviceError> {
        if buf.len() != self.size() {
            return Err(D::DeviceError::default());
        }

        self.buf.load_from_slice(buf)
    }

    pub fn write_to_slice(&self, buf: &mut [T]) -> Result<(), D::DeviceError> {
        if buf.len() < self.size() {
            return Err(D::DeviceError::default());
        }

        self.buf.write_into_slice(buf, self.size())
    }
}

/// Per-sample class indices with their declared class dimension.
pub struct SparseLabels<D: Device, I: Label> {
    pub buf: D::Buffer<I>,
    pub len: usize,
    pub depth: usize,
}

impl<D: Device, I: Label> Debug for SparseLabels<D, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in [0, {})", self.len, self.depth)
    }
}

impl<D: Device, I: Label> SparseLabels<D, I> {
    pub fn zeroed(device: Arc<D>, len: usize, depth: usize) -> Result<Self, D::DeviceError> {
        Ok(Self { buf: <D::Buffer<I>>::new(device, len)?, len, depth })
    }

    /// Rejects any index outside `[0, depth)` that does not equal
    /// `ignore_index`.
    pub fn load_from_slice(&mut self, ignore_index: i64, vals: &[I]) -> OperationResult<D::DeviceError> {
        if vals.len() != self.len {
            return Err(OperationError::MismatchedBatchSizes);
        }

        for (index, &label) in vals.iter().enumerate() {
            let label = label.as_i64();

            if label != ignore_index && !(0..self.depth as i64).contains(&label) {
                return Err(OperationError::InvalidLabel { index, label, depth: self.depth });
            }
        }

        self.buf.load_from_slice(vals)?;

        Ok(())
    }

    /// #### Safety
    /// It is the responsibility of the user to ensure all indices fall
    /// within `[0, depth)` or equal the ignore index.
    pub unsafe fn load_from_slice_unchecked(&mut self, vals: &[I]) -> OperationResult<D::DeviceError> {
        if vals.len() != self.len {
            return Err(OperationError::MismatchedBatchSizes);
        }

        self.buf.load_from_slice(vals)?;

        Ok(())
    }
}
