pub mod buffer;
pub mod error;

use std::{fmt::Debug, sync::Arc};

pub use buffer::{DeviceBuffer, Element, Float, Label};
pub use error::{OperationError, OperationResult};

use crate::cpu::CpuThread;

/// Execution device for the loss kernels.
///
/// Kernels issued on one device execute in issue order, so a kernel that
/// reads a device-resident `normalize_factor` sees the value written by an
/// earlier reduction on the same device.
#[allow(clippy::too_many_arguments)]
pub trait Device: Sized + 'static {
    type IdType;
    type DeviceError: Debug + Default;
    type Buffer<T: Element>: DeviceBuffer<Self, T, BufferError = Self::DeviceError>;

    fn new(id: Self::IdType) -> Result<Self, Self::DeviceError>;

    fn synchronise(&self) -> Result<(), Self::DeviceError>;

    fn get_last_device_error(&self) -> Result<(), Self::DeviceError>;

    fn sanity_check(self: Arc<Self>) {
        println!("\x1b[34;1mRunning Sanity Checks\x1b[0m");
        CpuThread::compare_reduce_sum(self.clone());
        CpuThread::compare_effective_weights(self.clone());
        CpuThread::compare_crossentropy(self.clone());
        CpuThread::compare_backprop_crossentropy(self.clone());
        CpuThread::compare_sparse_crossentropy(self.clone());
        CpuThread::compare_backprop_sparse_crossentropy(self);
    }

    /// Sums the first `size` elements of `input` into `output[0]`.
    fn reduce_sum<T: Float>(
        size: usize,
        input: &Self::Buffer<T>,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError>;

    /// Calculates `output[i] = 0` if `labels[i] == ignore_index`, else the
    /// class weight of `labels[i]` (1 if no weights are given).
    fn effective_weights<T: Float, I: Label>(
        batch_size: usize,
        label_depth: usize,
        ignore_index: i64,
        labels: &Self::Buffer<I>,
        class_weights: Option<&Self::Buffer<T>>,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError>;

    /// Calculates `output[k] = -labels[k] * log_probs[k] / normalize_factor`
    /// over all `size` entries, or zero if `normalize_factor == 0`.
    fn crossentropy<T: Float>(
        size: usize,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<T>,
        normalize_factor: T,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError>;

    /// Calculates `input_grad[k] = -output_grad[0] * labels[k] / normalize_factor`,
    /// or zero if `normalize_factor == 0`.
    fn backprop_crossentropy<T: Float>(
        size: usize,
        output_grad: &Self::Buffer<T>,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<T>,
        normalize_factor: T,
        input_grad: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError>;

    /// Calculates `output[i] = -weights[i] * log_probs[i * label_depth + labels[i]]
    /// / normalize_factor[0]` per sample, or zero for samples with zero weight.
    ///
    /// `normalize_factor` is a one-element device buffer, written by an
    /// earlier `reduce_sum` on the same device.
    fn sparse_crossentropy<T: Float, I: Label>(
        batch_size: usize,
        label_depth: usize,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<I>,
        weights: &Self::Buffer<T>,
        normalize_factor: &Self::Buffer<T>,
        output: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError>;

    /// Calculates `input_grad[i, c] = -output_grad[0] * weights[i] /
    /// normalize_factor[0]` where `c == labels[i]`, and zero everywhere else.
    fn backprop_sparse_crossentropy<T: Float, I: Label>(
        batch_size: usize,
        label_depth: usize,
        output_grad: &Self::Buffer<T>,
        log_probs: &Self::Buffer<T>,
        labels: &Self::Buffer<I>,
        weights: &Self::Buffer<T>,
        normalize_factor: &Self::Buffer<T>,
        input_grad: &mut Self::Buffer<T>,
    ) -> OperationResult<Self::DeviceError>;
}
