use std::sync::Arc;

use ndarray::{Array2, Axis};
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// 2D forward FFT: row-wise, then column-wise.
pub fn fft2d_forward(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut work = data.mapv(|v| Complex::new(v as f64, 0.0));
    transform_lines(&mut work, Axis(0), &fft_row);
    transform_lines(&mut work, Axis(1), &fft_col);
    work
}

/// 2D inverse FFT, returning the real part normalized by `1/(h*w)`.
pub fn ifft2d_real(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    transform_lines(&mut work, Axis(1), &ifft_col);
    transform_lines(&mut work, Axis(0), &ifft_row);

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|v| v.re * scale)
}

/// Swap quadrants so the zero-frequency term moves to `(h/2, w/2)`.
pub fn fft_shift<T: Clone>(data: &Array2<T>) -> Array2<T> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        data[[(r + h - h / 2) % h, (c + w - w / 2) % w]].clone()
    })
}

/// Apply `fft` to every lane of `work`.
///
/// `Axis(0)` yields rows, `Axis(1)` yields columns.
fn transform_lines(work: &mut Array2<Complex<f64>>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let (h, w) = work.dim();
    let lanes: Vec<_> = work.axis_iter(axis).map(|lane| lane.to_vec()).collect();

    let processed: Vec<Vec<Complex<f64>>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        lanes
            .into_par_iter()
            .map(|mut lane| {
                fft.process(&mut lane);
                lane
            })
            .collect()
    } else {
        lanes
            .into_iter()
            .map(|mut lane| {
                fft.process(&mut lane);
                lane
            })
            .collect()
    };

    for (mut lane, data) in work.axis_iter_mut(axis).zip(processed) {
        for (dst, src) in lane.iter_mut().zip(data) {
            *dst = src;
        }
    }
}
