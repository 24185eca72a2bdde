use std::sync::Arc;

use approx::assert_abs_diff_eq;

use crate::{
    device::{Device, OperationError, OperationResult},
    loss::{CrossEntropy, Reduction},
    rng,
    tensor::DenseMatrix,
};

pub fn dense_one_hot<D: Device>(device: D) -> OperationResult<D::DeviceError> {
    let device = Arc::new(device);

    let mut loss = CrossEntropy::<D, f32>::new(device.clone(), Reduction::Mean)?;

    let mut log_probs = DenseMatrix::zeroed(device.clone(), 2, 3)?;
    let mut labels = DenseMatrix::zeroed(device.clone(), 2, 3)?;
    log_probs.load_from_slice(&[-1.0, -0.5, -2.0, -0.25, -1.0, -4.0])?;
    labels.load_from_slice(&[0.0, 1.0, 0.0, 1.0, 0.0, 0.0])?;

    assert_eq!(loss.forward(&log_probs, &labels)?, 0.375);

    let mut loss = CrossEntropy::<D, f32>::new(device.clone(), Reduction::Sum)?;

    assert_eq!(loss.forward(&log_probs, &labels)?, 0.75);

    Ok(())
}

pub fn dense_soft_labels<D: Device>(device: D) -> OperationResult<D::DeviceError> {
    let device = Arc::new(device);

    let mut loss = CrossEntropy::<D, f32>::new(device.clone(), Reduction::Sum)?;

    let mut log_probs = DenseMatrix::zeroed(device.clone(), 2, 2)?;
    let mut labels = DenseMatrix::zeroed(device.clone(), 2, 2)?;
    log_probs.load_from_slice(&[-1.0, -2.0, -0.5, -4.0])?;
    labels.load_from_slice(&[0.75, 0.25, 0.5, 0.5])?;

    assert_eq!(loss.forward(&log_probs, &labels)?, 3.5);

    let wrong_batch = DenseMatrix::zeroed(device.clone(), 3, 2)?;
    assert!(matches!(loss.forward(&log_probs, &wrong_batch), Err(OperationError::MismatchedBatchSizes)));

    let wrong_depth = DenseMatrix::zeroed(device.clone(), 2, 3)?;
    assert!(matches!(loss.forward(&log_probs, &wrong_depth), Err(OperationError::MismatchedLabelDepth)));

    Ok(())
}

pub fn dense_backprop<D: Device>(device: D) -> OperationResult<D::DeviceError> {
    let device = Arc::new(device);

    let mut loss = CrossEntropy::<D, f32>::new(device.clone(), Reduction::Mean)?;

    let mut log_probs = DenseMatrix::zeroed(device.clone(), 2, 2)?;
    let mut labels = DenseMatrix::zeroed(device.clone(), 2, 2)?;
    log_probs.load_from_slice(&[-1.0, -2.0, -0.5, -4.0])?;
    labels.load_from_slice(&[0.75, 0.25, 0.5, 0.5])?;

    let mut grad = DenseMatrix::zeroed(device.clone(), 2, 2)?;
    grad.load_from_slice(&[9.0; 4])?;

    loss.backward(2.0, &log_probs, &labels, &mut grad)?;

    let mut buf = [0.0; 4];
    grad.write_to_slice(&mut buf)?;
    assert_eq!(buf, [-0.75, -0.25, -0.5, -0.5]);

    Ok(())
}

pub fn dense_gradient_check<D: Device>(device: D) -> OperationResult<D::DeviceError> {
    let device = Arc::new(device);

    let rows = 5;
    let cols = 7;
    let size = rows * cols;

    let logp_vals = rng::vec_f32(size, -1.5, 1.25, false);
    let label_vals = rng::vec_f32(size, 0.5, 0.5, false);

    let mut loss = CrossEntropy::<D, f32>::new(device.clone(), Reduction::Mean)?;

    let mut log_probs = DenseMatrix::zeroed(device.clone(), rows, cols)?;
    let mut labels = DenseMatrix::zeroed(device.clone(), rows, cols)?;
    log_probs.load_from_slice(&logp_vals)?;
    labels.load_from_slice(&label_vals)?;

    let mut analytic = DenseMatrix::zeroed(device.clone(), rows, cols)?;
    loss.backward(1.0, &log_probs, &labels, &mut analytic)?;

    let mut grad = vec![0.0; size];
    analytic.write_to_slice(&mut grad)?;

    // the loss is linear in the log-probs, so central differences are
    // exact up to rounding
    let step = 0.5;

    for k in 0..size {
        let mut up = logp_vals.clone();
        let mut down = logp_vals.clone();
        up[k] += step;
        down[k] -= step;

        log_probs.load_from_slice(&up)?;
        let up_loss = loss.forward(&log_probs, &labels)?;

        log_probs.load_from_slice(&down)?;
        let down_loss = loss.forward(&log_probs, &labels)?;

        assert_abs_diff_eq!((up_loss - down_loss) / (2.0 * step), grad[k], epsilon = 1e-3);
    }

    Ok(())
}
