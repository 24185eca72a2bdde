use std::sync::Arc;

use crate::{
    device::{Device, DeviceBuffer, Element, Float, Label, OperationError, OperationResult},
    loss::tests,
};

mod cmp;
mod kernels;

tests::make_tests! {
    CpuThread,
    dense_one_hot,
    dense_soft_labels,
    dense_backprop,
    dense_gradient_check,
    sparse_with_ignored_sample,
    sparse_matches_dense_one_hot,
    sparse_class_weights,
    sparse_all_ignored,
    sparse_sum_vs_mean,
    sparse_gradient_check,
    sparse_rejects_invalid_label,
    effective_weight_resolution,
}

#[derive(Debug, Default)]
pub struct CpuError;

pub struct CpuThread;

pub struct CpuBuffer<T: Element> {
    buf: Vec<T>,
    device: Arc<CpuThread>,
}

impl<T: Element> DeviceBuffer<CpuThread, T> for CpuBuffer<T> {
    type BufferError = CpuError;

    fn new(device: Arc<CpuThread>, size: usize) -> Result<Self, CpuError> {
        Ok(Self { buf: vec![T::default(); size], device })
    }

    fn size(&self) -> usize {
        self.buf.len()
    }

    fn device(&self) -> Arc<CpuThread> {
        self.device.clone()
    }

    fn set_zero(&mut self) -> Result<(), CpuError> {
        for elem in &mut self.buf {
            *elem = T::default();
        }

        Ok(())
    }

    fn load_from_device(&mut self, buf: &Self, num: usize) -> Result<(), CpuError> {
        self.buf[..num].copy_from_slice(&buf.buf[..num]);
        Ok(())
    }

    fn load_from_slice(&mut self, buf: &[T]) -> Result<(), CpuError> {
        self.buf[..buf.len()].copy_from_slice(buf);
        Ok(())
    }

    unsafe fn load_non_blocking_from_host(&mut self, buf: &[T]) -> Result<(), CpuError> {
        self.load_from_slice(buf)
    }

    fn write_into_slice(&self, buf: &mut [T], num: usize) -> Result<(), CpuError> {
        buf[..num].copy_from_slice(&self.buf[..num]);
        Ok(())
    }
}

impl Device for CpuThread {
    type IdType = ();
    type DeviceError = CpuError;
    type Buffer<T: Element> = CpuBuffer<T>;

    fn new(_id: Self::IdType) -> Result<Self, Self::DeviceError> {
        Ok(Self)
    }

    fn synchronise(&self) -> Result<(), Self::DeviceError> {
        Ok(())
    }

    fn get_last_device_error(&self) -> Result<(), Self::DeviceError> {
        Ok(())
    }

    fn reduce_sum<T: Float>(
        size: usize,
        input: &Self::Buffer<T>,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError> {
        if input.buf.len() < size || output.buf.is_empty() {
            return Err(OperationError::IndexOutOfBounds);
        }

        output.buf[0] = kernels::reduce_sum(&input.buf[..size]);

        Ok(())
    }

    fn effective_weights<T: Float, I: Label>(
        batch_size: usize,
        label_depth: usize,
        ignore_index: i64,
        labels: &Self::Buffer<I>,
        class_weights: Option<&Self::Buffer<T>>,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError> {
        if labels.buf.len() < batch_size || output.buf.len() < batch_size {
            return Err(OperationError::IndexOutOfBounds);
        }

        let class_weights = match class_weights {
            Some(weights) => {
                if weights.buf.len() < label_depth {
                    return Err(OperationError::IndexOutOfBounds);
                }

                Some(&weights.buf[..label_depth])
            }
            None => None,
        };

        kernels::effective_weights(
            label_depth,
            ignore_index,
            &labels.buf[..batch_size],
            class_weights,
            &mut output.buf[..batch_size],
        );

        Ok(())
    }

    fn crossentropy<T: Float>(
        size: usize,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<T>,
        normalize_factor: T,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError> {
        if log_probs.buf.len() < size || labels.buf.len() < size || output.buf.len() < size {
            return Err(OperationError::IndexOutOfBounds);
        }

        kernels::crossentropy(&log_probs.buf[..size], &labels.buf[..size], normalize_factor, &mut output.buf[..size]);

        Ok(())
    }

    fn backprop_crossentropy<T: Float>(
        size: usize,
        output_grad: &Self::Buffer<T>,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<T>,
        normalize_factor: T,
        input_grad: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError> {
        if output_grad.buf.is_empty()
            || log_probs.buf.len() < size
            || labels.buf.len() < size
            || input_grad.buf.len() < size
        {
            return Err(OperationError::IndexOutOfBounds);
        }

        kernels::backprop_crossentropy(
            output_grad.buf[0],
            &labels.buf[..size],
            normalize_factor,
            &mut input_grad.buf[..size],
        );

        Ok(())
    }

    fn sparse_crossentropy<T: Float, I: Label>(
        batch_size: usize,
        label_depth: usize,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<I>,
        weights: &Self::Buffer<T>,
        normalize_factor: &Self::Buffer<T>,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError> {
        if log_probs.buf.len() < batch_size * label_depth
            || labels.buf.len() < batch_size
            || weights.buf.len() < batch_size
            || normalize_factor.buf.is_empty()
            || output.buf.len() < batch_size
        {
            return Err(OperationError::IndexOutOfBounds);
        }

        kernels::sparse_crossentropy(
            label_depth,
            &log_probs.buf[..batch_size * label_depth],
            &labels.buf[..batch_size],
            &weights.buf[..batch_size],
            normalize_factor.buf[0],
            &mut output.buf[..batch_size],
        );

        Ok(())
    }

    fn backprop_sparse_crossentropy<T: Float, I: Label>(
        batch_size: usize,
        label_depth: usize,
        output_grad: &Self::Buffer<T>,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<I>,
        weights: &Self::Buffer<T>,
        normalize_factor: &Self::Buffer<T>,
        input_grad: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError> {
        if output_grad.buf.is_empty()
            || log_probs.buf.len() < batch_size * label_depth
            || labels.buf.len() < batch_size
            || weights.buf.len() < batch_size
            || normalize_factor.buf.is_empty()
            || input_grad.buf.len() < batch_size * label_depth
        {
            return Err(OperationError::IndexOutOfBounds);
        }

        kernels::backprop_sparse_crossentropy(
            label_depth,
            output_grad.buf[0],
            &labels.buf[..batch_size],
            &weights.buf[..batch_size],
            normalize_factor.buf[0],
            &mut input_grad.buf[..batch_size * label_depth],
        );

        Ok(())
    }
}

#[test]
fn sanity_check() {
    Arc::new(CpuThread).sanity_check();
}
