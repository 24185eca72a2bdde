use std::{fmt::Debug, iter::Sum, sync::Arc};

/// # Safety
/// Must be representable on all devices and valid
/// as zeroed bits.
pub unsafe trait Element: Copy + Debug + Default + Send + Sync + 'static {}

unsafe impl Element for f32 {}
unsafe impl Element for f64 {}
unsafe impl Element for i32 {}
unsafe impl Element for i64 {}

/// Floating-point element the loss kernels compute in.
pub trait Float: Element + num_traits::Float + Sum<Self> {
    fn from_usize(val: usize) -> Self;
}

impl Float for f32 {
    fn from_usize(val: usize) -> Self {
        val as f32
    }
}

impl Float for f64 {
    fn from_usize(val: usize) -> Self {
        val as f64
    }
}

/// Integer element used for sparse class indices.
pub trait Label: Element + num_traits::PrimInt {
    fn as_i64(self) -> i64;
}

impl Label for i32 {
    fn as_i64(self) -> i64 {
        i64::from(self)
    }
}

impl Label for i64 {
    fn as_i64(self) -> i64 {
        self
    }
}

pub trait DeviceBuffer<D, T>: Sized {
    type BufferError;

    fn new(device: Arc<D>, size: usize) -> Result<Self, Self::BufferError>;

    fn size(&self) -> usize;

    fn device(&self) -> Arc<D>;

    fn set_zero(&mut self) -> Result<(), Self::BufferError>;

    fn load_from_device(&mut self, buf: &Self, num: usize) -> Result<(), Self::BufferError>;

    fn load_from_slice(&mut self, buf: &[T]) -> Result<(), Self::BufferError>;

    /// # Safety
    /// Needs to be followed by a synchronise before `buf` is dropped!
    unsafe fn load_non_blocking_from_host(&mut self, buf: &[T]) -> Result<(), Self::BufferError>;

    /// Blocks until all work previously issued on the device has completed.
    fn write_into_slice(&self, buf: &mut [T], num: usize) -> Result<(), Self::BufferError>;
}
