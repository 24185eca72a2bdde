use rayon::prelude::*;

use crate::device::{Float, Label};

pub(super) fn reduce_sum<T: Float>(input: &[T]) -> T {
    input.par_iter().copied().sum()
}

pub(super) fn effective_weights<T: Float, I: Label>(
    label_depth: usize,
    ignore_index: i64,
    labels: &[I],
    class_weights: Option<&[T]>,
    output: &mut [T],
) {
    output.par_iter_mut().zip(labels.par_iter()).for_each(|(o, &label)| {
        let label = label.as_i64();

        *o = if label == ignore_index {
            T::zero()
        } else {
            debug_assert!(label >= 0 && (label as usize) < label_depth);
            match class_weights {
                Some(weights) => weights[label as usize],
                None => T::one(),
            }
        };
    });
}

pub(super) fn crossentropy<T: Float>(log_probs: &[T], labels: &[T], normalize_factor: T, output: &mut [T]) {
    if normalize_factor == T::zero() {
        output.par_iter_mut().for_each(|o| *o = T::zero());
        return;
    }

    output
        .par_iter_mut()
        .zip(log_probs.par_iter())
        .zip(labels.par_iter())
        .for_each(|((o, &p), &l)| *o = -(l * p) / normalize_factor);
}

pub(super) fn backprop_crossentropy<T: Float>(output_grad: T, labels: &[T], normalize_factor: T, input_grad: &mut [T]) {
    if normalize_factor == T::zero() {
        input_grad.par_iter_mut().for_each(|g| *g = T::zero());
        return;
    }

    input_grad
        .par_iter_mut()
        .zip(labels.par_iter())
        .for_each(|(g, &l)| *g = -(output_grad * l) / normalize_factor);
}

pub(super) fn sparse_crossentropy<T: Float, I: Label>(
    label_depth: usize,
    log_probs: &[T],
    labels: &[I],
    weights: &[T],
    normalize_factor: T,
    output: &mut [T],
) {
    output.par_iter_mut().zip(labels.par_iter()).zip(weights.par_iter()).enumerate().for_each(
        |(i, ((o, &label), &weight))| {
            *o = if weight == T::zero() || normalize_factor == T::zero() {
                T::zero()
            } else {
                let label = label.as_i64() as usize;
                debug_assert!(label < label_depth);
                -(weight * log_probs[i * label_depth + label]) / normalize_factor
            };
        },
    );
}

pub(super) fn backprop_sparse_crossentropy<T: Float, I: Label>(
    label_depth: usize,
    output_grad: T,
    labels: &[I],
    weights: &[T],
    normalize_factor: T,
    input_grad: &mut [T],
) {
    if label_depth == 0 {
        return;
    }

    input_grad.par_chunks_mut(label_depth).zip(labels.par_iter()).zip(weights.par_iter()).for_each(
        |((row, &label), &weight)| {
            row.fill(T::zero());

            if weight != T::zero() && normalize_factor != T::zero() {
                let label = label.as_i64() as usize;
                debug_assert!(label < label_depth);
                row[label] = -(output_grad * weight) / normalize_factor;
            }
        },
    );
}
