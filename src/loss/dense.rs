use std::sync::Arc;

use crate::{
    device::{Device, DeviceBuffer, Float, OperationError, OperationResult},
    tensor::DenseMatrix,
};

use super::Reduction;

/// Cross-entropy loss against dense per-class label weights.
///
/// Holds device scratch buffers, so it should be constructed once and
/// reused across batches. Scratch is grown on demand when a larger
/// batch comes through.
pub struct CrossEntropy<D: Device, T: Float> {
    device: Arc<D>,
    reduction: Reduction,
    terms: D::Buffer<T>,
    total: D::Buffer<T>,
    output_grad: D::Buffer<T>,
}

impl<D: Device, T: Float> CrossEntropy<D, T> {
    pub fn new(device: Arc<D>, reduction: Reduction) -> Result<Self, D::DeviceError> {
        Ok(Self {
            terms: <D::Buffer<T>>::new(device.clone(), 1)?,
            total: <D::Buffer<T>>::new(device.clone(), 1)?,
            output_grad: <D::Buffer<T>>::new(device.clone(), 1)?,
            device,
            reduction,
        })
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn normalize_factor(&self, batch_size: usize) -> T {
        match self.reduction {
            Reduction::Sum => T::one(),
            Reduction::Mean => T::from_usize(batch_size),
        }
    }

    fn validate(
        log_probs: &DenseMatrix<D, T>,
        labels: &DenseMatrix<D, T>,
    ) -> OperationResult<D::DeviceError> {
        if labels.rows != log_probs.rows {
            return Err(OperationError::MismatchedBatchSizes);
        }

        if labels.cols != log_probs.cols {
            return Err(OperationError::MismatchedLabelDepth);
        }

        Ok(())
    }

    /// Computes the reduced loss over the batch and reads it back to the
    /// host.
    pub fn forward(
        &mut self,
        log_probs: &DenseMatrix<D, T>,
        labels: &DenseMatrix<D, T>,
    ) -> Result<T, OperationError<D::DeviceError>> {
        Self::validate(log_probs, labels)?;

        let size = log_probs.size();
        let normalize_factor = self.normalize_factor(log_probs.rows);

        if self.terms.size() < size {
            self.terms = <D::Buffer<T>>::new(self.device.clone(), size)?;
        }

        D::crossentropy(size, &log_probs.buf, &labels.buf, normalize_factor, &mut self.terms)?;
        D::reduce_sum(size, &self.terms, &mut self.total)?;

        let mut loss = [T::zero()];
        self.total.write_into_slice(&mut loss, 1)?;

        Ok(loss[0])
    }

    /// Computes the gradient of the reduced loss with respect to every
    /// log-probability, scaled by `output_grad` and overwriting
    /// `input_grad`.
    pub fn backward(
        &mut self,
        output_grad: T,
        log_probs: &DenseMatrix<D, T>,
        labels: &DenseMatrix<D, T>,
        input_grad: &mut DenseMatrix<D, T>,
    ) -> OperationResult<D::DeviceError> {
        Self::validate(log_probs, labels)?;
        Self::validate(log_probs, input_grad)?;

        let size = log_probs.size();
        let normalize_factor = self.normalize_factor(log_probs.rows);

        self.output_grad.load_from_slice(&[output_grad])?;

        D::backprop_crossentropy(
            size,
            &self.output_grad,
            &log_probs.buf,
            &labels.buf,
            normalize_factor,
            &mut input_grad.buf,
        )?;

        Ok(())
    }
}
