use std::sync::Arc;

use crate::{
    device::{Device, DeviceBuffer, Float, Label, OperationError, OperationResult},
    tensor::{DenseMatrix, SparseLabels},
};

use super::{Reduction, DEFAULT_IGNORE_INDEX};

/// Cross-entropy loss against per-sample class indices, with optional
/// per-class weights and an ignored-sample sentinel.
///
/// Each call resolves per-sample effective weights and the normalization
/// factor on the device before running the loss or gradient kernel, so
/// the factor never leaves device memory.
pub struct SparseCrossEntropy<D: Device, T: Float> {
    device: Arc<D>,
    reduction: Reduction,
    ignore_index: i64,
    weights: D::Buffer<T>,
    factor: D::Buffer<T>,
    losses: D::Buffer<T>,
    total: D::Buffer<T>,
    output_grad: D::Buffer<T>,
}

impl<D: Device, T: Float> SparseCrossEntropy<D, T> {
    pub fn new(device: Arc<D>, reduction: Reduction) -> Result<Self, D::DeviceError> {
        Self::with_ignore_index(device, reduction, DEFAULT_IGNORE_INDEX)
    }

    pub fn with_ignore_index(
        device: Arc<D>,
        reduction: Reduction,
        ignore_index: i64,
    ) -> Result<Self, D::DeviceError> {
        Ok(Self {
            weights: <D::Buffer<T>>::new(device.clone(), 1)?,
            factor: <D::Buffer<T>>::new(device.clone(), 1)?,
            losses: <D::Buffer<T>>::new(device.clone(), 1)?,
            total: <D::Buffer<T>>::new(device.clone(), 1)?,
            output_grad: <D::Buffer<T>>::new(device.clone(), 1)?,
            device,
            reduction,
            ignore_index,
        })
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub fn ignore_index(&self) -> i64 {
        self.ignore_index
    }

    fn validate<I: Label>(
        log_probs: &DenseMatrix<D, T>,
        labels: &SparseLabels<D, I>,
        class_weights: Option<&D::Buffer<T>>,
    ) -> OperationResult<D::DeviceError> {
        if labels.len != log_probs.rows {
            return Err(OperationError::MismatchedBatchSizes);
        }

        if labels.depth != log_probs.cols {
            return Err(OperationError::MismatchedLabelDepth);
        }

        if let Some(weights) = class_weights {
            if weights.size() < log_probs.cols {
                return Err(OperationError::IndexOutOfBounds);
            }
        }

        Ok(())
    }

    /// Resolves per-sample weights and the normalization factor, leaving
    /// both device-resident.
    fn resolve_weights<I: Label>(
        &mut self,
        batch_size: usize,
        label_depth: usize,
        labels: &SparseLabels<D, I>,
        class_weights: Option<&D::Buffer<T>>,
    ) -> OperationResult<D::DeviceError> {
        if self.weights.size() < batch_size {
            self.weights = <D::Buffer<T>>::new(self.device.clone(), batch_size)?;
        }

        D::effective_weights(
            batch_size,
            label_depth,
            self.ignore_index,
            &labels.buf,
            class_weights,
            &mut self.weights,
        )?;

        match self.reduction {
            Reduction::Sum => self.factor.load_from_slice(&[T::one()])?,
            Reduction::Mean => D::reduce_sum(batch_size, &self.weights, &mut self.factor)?,
        }

        Ok(())
    }

    /// Computes the reduced loss over the batch and reads it back to the
    /// host.
    ///
    /// If every sample is ignored the total weight is zero and the loss
    /// comes back as zero rather than an error.
    pub fn forward<I: Label>(
        &mut self,
        log_probs: &DenseMatrix<D, T>,
        labels: &SparseLabels<D, I>,
        class_weights: Option<&D::Buffer<T>>,
    ) -> Result<T, OperationError<D::DeviceError>> {
        Self::validate(log_probs, labels, class_weights)?;

        let batch_size = log_probs.rows;
        let label_depth = log_probs.cols;

        self.resolve_weights(batch_size, label_depth, labels, class_weights)?;

        if self.losses.size() < batch_size {
            self.losses = <D::Buffer<T>>::new(self.device.clone(), batch_size)?;
        }

        D::sparse_crossentropy(
            batch_size,
            label_depth,
            &log_probs.buf,
            &labels.buf,
            &self.weights,
            &self.factor,
            &mut self.losses,
        )?;
        D::reduce_sum(batch_size, &self.losses, &mut self.total)?;

        let mut loss = [T::zero()];
        self.total.write_into_slice(&mut loss, 1)?;

        Ok(loss[0])
    }

    /// Computes the gradient of the reduced loss with respect to every
    /// log-probability, scaled by `output_grad` and overwriting
    /// `input_grad`. Rows for ignored samples are zeroed.
    pub fn backward<I: Label>(
        &mut self,
        output_grad: T,
        log_probs: &DenseMatrix<D, T>,
        labels: &SparseLabels<D, I>,
        class_weights: Option<&D::Buffer<T>>,
        input_grad: &mut DenseMatrix<D, T>,
    ) -> OperationResult<D::DeviceError> {
        Self::validate(log_probs, labels, class_weights)?;

        if input_grad.rows != log_probs.rows {
            return Err(OperationError::MismatchedBatchSizes);
        }

        if input_grad.cols != log_probs.cols {
            return Err(OperationError::MismatchedLabelDepth);
        }

        let batch_size = log_probs.rows;
        let label_depth = log_probs.cols;

        self.resolve_weights(batch_size, label_depth, labels, class_weights)?;

        self.output_grad.load_from_slice(&[output_grad])?;

        D::backprop_sparse_crossentropy(
            batch_size,
            label_depth,
            &self.output_grad,
            &log_probs.buf,
            &labels.buf,
            &self.weights,
            &self.factor,
            &mut input_grad.buf,
        )?;

        Ok(())
    }
}
