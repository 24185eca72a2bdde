use std::fmt::Debug;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError<T: Debug> {
    #[error("buffer too small for the requested operation")]
    IndexOutOfBounds,
    #[error("mismatched batch sizes")]
    MismatchedBatchSizes,
    #[error("label depth does not match the class dimension")]
    MismatchedLabelDepth,
    #[error("label {label} at position {index} outside [0, {depth}) and not the ignore index")]
    InvalidLabel { index: usize, label: i64, depth: usize },
    #[error("operation not supported by this device")]
    UnsupportedOperation,
    #[error("device error: {0:?}")]
    DeviceError(Box<T>),
}

impl<T: Debug> From<T> for OperationError<T> {
    fn from(value: T) -> Self {
        Self::DeviceError(Box::new(value))
    }
}

pub type OperationResult<T> = Result<(), OperationError<T>>;
