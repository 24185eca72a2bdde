use std::sync::Arc;

use crate::{
    device::{Device, DeviceBuffer, Element},
    rng,
};

use super::CpuThread;

impl CpuThread {
    pub fn compare_reduce_sum<D: Device>(device: Arc<D>) {
        for size in [13, 34, 257, 516] {
            print!("reduce_sum size={size}... ");
            display_passed(reduce_sum_equal(device.clone(), size));
        }
    }

    pub fn compare_effective_weights<D: Device>(device: Arc<D>) {
        for (batch_size, label_depth, with_weights, ignore_rate) in
            [(64, 10, false, 0.0), (64, 10, true, 0.0), (97, 31, false, 0.25), (97, 31, true, 0.25)]
        {
            print!(
                "effective_weights batch_size={batch_size} label_depth={label_depth} \
                 with_weights={with_weights} ignore_rate={ignore_rate}... "
            );
            display_passed(effective_weights_equal(device.clone(), batch_size, label_depth, with_weights, ignore_rate));
        }
    }

    pub fn compare_crossentropy<D: Device>(device: Arc<D>) {
        for (size, normalize_factor) in [(516, 1.0), (1027, 64.0), (1027, 0.0)] {
            print!("crossentropy size={size} normalize_factor={normalize_factor}... ");
            display_passed(crossentropy_equal(device.clone(), size, normalize_factor));
        }
    }

    pub fn compare_backprop_crossentropy<D: Device>(device: Arc<D>) {
        for (size, normalize_factor, output_grad) in [(516, 1.0, 1.0), (1027, 64.0, -0.5), (1027, 0.0, 1.0)] {
            print!("backprop_crossentropy size={size} normalize_factor={normalize_factor} output_grad={output_grad}... ");
            display_passed(backprop_crossentropy_equal(device.clone(), size, normalize_factor, output_grad));
        }
    }

    pub fn compare_sparse_crossentropy<D: Device>(device: Arc<D>) {
        for (batch_size, label_depth, with_weights, ignore_rate) in
            [(64, 10, false, 0.0), (64, 10, true, 0.25), (97, 31, true, 0.5)]
        {
            print!(
                "sparse_crossentropy batch_size={batch_size} label_depth={label_depth} \
                 with_weights={with_weights} ignore_rate={ignore_rate}... "
            );
            display_passed(sparse_crossentropy_equal(device.clone(), batch_size, label_depth, with_weights, ignore_rate));
        }
    }

    pub fn compare_backprop_sparse_crossentropy<D: Device>(device: Arc<D>) {
        for (batch_size, label_depth, with_weights, ignore_rate) in
            [(64, 10, false, 0.0), (64, 10, true, 0.25), (97, 31, true, 0.5)]
        {
            print!(
                "backprop_sparse_crossentropy batch_size={batch_size} label_depth={label_depth} \
                 with_weights={with_weights} ignore_rate={ignore_rate}... "
            );
            display_passed(backprop_sparse_crossentropy_equal(
                device.clone(),
                batch_size,
                label_depth,
                with_weights,
                ignore_rate,
            ));
        }
    }
}

fn reduce_sum_equal<D: Device>(device: Arc<D>, size: usize) -> bool {
    let input = rng::vec_f32(size, 1.0, 0.5, false);

    let expected: f32 = input.iter().sum();

    let ibuf = load(device.clone(), &input);
    let mut obuf = <D::Buffer<f32>>::new(device, 1).unwrap();

    D::reduce_sum(size, &ibuf, &mut obuf).unwrap();

    approx_equal(&[expected], &write::<D>(&obuf)).is_none()
}

fn effective_weights_equal<D: Device>(
    device: Arc<D>,
    batch_size: usize,
    label_depth: usize,
    with_weights: bool,
    ignore_rate: f32,
) -> bool {
    let labels = rng::vec_labels(batch_size, label_depth, -1, ignore_rate);
    let class_weights = with_weights.then(|| rng::vec_f32(label_depth, 1.0, 0.5, false));

    let expected: Vec<f32> = labels
        .iter()
        .map(|&l| if l == -1 { 0.0 } else { class_weights.as_ref().map_or(1.0, |w| w[l as usize]) })
        .collect();

    let lbuf = load(device.clone(), &labels);
    let wbuf = class_weights.as_ref().map(|w| load(device.clone(), w));
    let mut obuf = <D::Buffer<f32>>::new(device, batch_size).unwrap();

    D::effective_weights(batch_size, label_depth, -1, &lbuf, wbuf.as_ref(), &mut obuf).unwrap();

    approx_equal(&expected, &write::<D>(&obuf)).is_none()
}

fn crossentropy_equal<D: Device>(device: Arc<D>, size: usize, normalize_factor: f32) -> bool {
    let log_probs = rng::vec_f32(size, -2.0, 1.5, false);
    let labels = rng::vec_f32(size, 0.5, 0.5, false);

    let expected: Vec<f32> = log_probs
        .iter()
        .zip(labels.iter())
        .map(|(&p, &l)| if normalize_factor == 0.0 { 0.0 } else { -(l * p) / normalize_factor })
        .collect();

    let pbuf = load(device.clone(), &log_probs);
    let lbuf = load(device.clone(), &labels);
    let mut obuf = <D::Buffer<f32>>::new(device, size).unwrap();

    D::crossentropy(size, &pbuf, &lbuf, normalize_factor, &mut obuf).unwrap();

    approx_equal(&expected, &write::<D>(&obuf)).is_none()
}

fn backprop_crossentropy_equal<D: Device>(
    device: Arc<D>,
    size: usize,
    normalize_factor: f32,
    output_grad: f32,
) -> bool {
    let log_probs = rng::vec_f32(size, -2.0, 1.5, false);
    let labels = rng::vec_f32(size, 0.5, 0.5, false);

    let expected: Vec<f32> = labels
        .iter()
        .map(|&l| if normalize_factor == 0.0 { 0.0 } else { -(output_grad * l) / normalize_factor })
        .collect();

    let pbuf = load(device.clone(), &log_probs);
    let lbuf = load(device.clone(), &labels);
    let gbuf = load(device.clone(), &[output_grad]);
    let mut obuf = <D::Buffer<f32>>::new(device, size).unwrap();

    D::backprop_crossentropy(size, &gbuf, &pbuf, &lbuf, normalize_factor, &mut obuf).unwrap();

    approx_equal(&expected, &write::<D>(&obuf)).is_none()
}

fn sparse_crossentropy_equal<D: Device>(
    device: Arc<D>,
    batch_size: usize,
    label_depth: usize,
    with_weights: bool,
    ignore_rate: f32,
) -> bool {
    let log_probs = rng::vec_f32(batch_size * label_depth, -2.0, 1.5, false);
    let labels = rng::vec_labels(batch_size, label_depth, -1, ignore_rate);
    let class_weights = with_weights.then(|| rng::vec_f32(label_depth, 1.0, 0.5, false));

    let weights: Vec<f32> = labels
        .iter()
        .map(|&l| if l == -1 { 0.0 } else { class_weights.as_ref().map_or(1.0, |w| w[l as usize]) })
        .collect();
    let normalize_factor: f32 = weights.iter().sum();

    let expected: Vec<f32> = weights
        .iter()
        .zip(labels.iter())
        .enumerate()
        .map(|(i, (&w, &l))| {
            if w == 0.0 || normalize_factor == 0.0 {
                0.0
            } else {
                -(w * log_probs[i * label_depth + l as usize]) / normalize_factor
            }
        })
        .collect();

    let pbuf = load(device.clone(), &log_probs);
    let lbuf = load(device.clone(), &labels);
    let wbuf = class_weights.as_ref().map(|w| load(device.clone(), w));

    let mut ebuf = <D::Buffer<f32>>::new(device.clone(), batch_size).unwrap();
    let mut fbuf = <D::Buffer<f32>>::new(device.clone(), 1).unwrap();
    let mut obuf = <D::Buffer<f32>>::new(device, batch_size).unwrap();

    D::effective_weights(batch_size, label_depth, -1, &lbuf, wbuf.as_ref(), &mut ebuf).unwrap();
    D::reduce_sum(batch_size, &ebuf, &mut fbuf).unwrap();
    D::sparse_crossentropy(batch_size, label_depth, &pbuf, &lbuf, &ebuf, &fbuf, &mut obuf).unwrap();

    approx_equal(&expected, &write::<D>(&obuf)).is_none()
}

fn backprop_sparse_crossentropy_equal<D: Device>(
    device: Arc<D>,
    batch_size: usize,
    label_depth: usize,
    with_weights: bool,
    ignore_rate: f32,
) -> bool {
    let output_grad = 2.0;
    let log_probs = rng::vec_f32(batch_size * label_depth, -2.0, 1.5, false);
    let labels = rng::vec_labels(batch_size, label_depth, -1, ignore_rate);
    let class_weights = with_weights.then(|| rng::vec_f32(label_depth, 1.0, 0.5, false));

    let weights: Vec<f32> = labels
        .iter()
        .map(|&l| if l == -1 { 0.0 } else { class_weights.as_ref().map_or(1.0, |w| w[l as usize]) })
        .collect();
    let normalize_factor: f32 = weights.iter().sum();

    let mut expected = vec![0.0; batch_size * label_depth];
    for (i, (&w, &l)) in weights.iter().zip(labels.iter()).enumerate() {
        if w != 0.0 && normalize_factor != 0.0 {
            expected[i * label_depth + l as usize] = -(output_grad * w) / normalize_factor;
        }
    }

    let pbuf = load(device.clone(), &log_probs);
    let lbuf = load(device.clone(), &labels);
    let wbuf = class_weights.as_ref().map(|w| load(device.clone(), w));
    let gbuf = load(device.clone(), &[output_grad]);

    let mut ebuf = <D::Buffer<f32>>::new(device.clone(), batch_size).unwrap();
    let mut fbuf = <D::Buffer<f32>>::new(device.clone(), 1).unwrap();
    let mut obuf = <D::Buffer<f32>>::new(device, batch_size * label_depth).unwrap();

    D::effective_weights(batch_size, label_depth, -1, &lbuf, wbuf.as_ref(), &mut ebuf).unwrap();
    D::reduce_sum(batch_size, &ebuf, &mut fbuf).unwrap();
    D::backprop_sparse_crossentropy(batch_size, label_depth, &gbuf, &pbuf, &lbuf, &ebuf, &fbuf, &mut obuf).unwrap();

    approx_equal(&expected, &write::<D>(&obuf)).is_none()
}

fn approx_equal(a: &[f32], b: &[f32]) -> Option<usize> {
    if a.len() != b.len() {
        return Some(usize::MAX);
    }

    for (i, (&a, &b)) in a.iter().zip(b.iter()).enumerate() {
        if (a - b).abs() > 0.01 {
            print!("a={a} b={b} err={} ", (a - b).abs());
            return Some(i);
        }
    }

    None
}

fn load<D: Device, T: Element>(device: Arc<D>, a: &[T]) -> D::Buffer<T> {
    let mut buf = <D::Buffer<T>>::new(device, a.len()).unwrap();
    buf.load_from_slice(a).unwrap();
    buf
}

fn write<D: Device>(a: &D::Buffer<f32>) -> Vec<f32> {
    let mut buf = vec![0.0; a.size()];
    a.write_into_slice(&mut buf, a.size()).unwrap();
    buf
}

fn display_passed(pass: bool) {
    if pass {
        println!("\x1b[32;1mpass\x1b[0m");
    } else {
        println!("\x1b[31mfail\x1b[0m");
    }
}
