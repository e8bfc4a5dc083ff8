use std::f64::consts::PI;

use ndarray::Array2;

use crate::compute::{fft2d_forward, fft_shift};

use super::resample::bilinear_sample;

/// Centred magnitude of the 2D Fourier transform.
pub fn magnitude_spectrum(band: &Array2<f32>) -> Array2<f32> {
    let magnitude = fft2d_forward(band).mapv(|c| c.norm() as f32);
    fft_shift(&magnitude)
}

/// Radial high-pass emphasis filter `(1 - x)(2 - x)` where `x` is the outer
/// product of two cosine ramps over `[-pi/2, pi/2]`.
///
/// The filter is 0 at the centre of the spectrum and approaches 2 at the edges.
pub fn highpass(rows: usize, cols: usize) -> Array2<f32> {
    let ramp = |n: usize| -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = if n > 1 {
                    -PI / 2.0 + PI * i as f64 / (n - 1) as f64
                } else {
                    0.0
                };
                t.cos()
            })
            .collect()
    };
    let ys = ramp(rows);
    let xs = ramp(cols);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let x = ys[r] * xs[c];
        ((1.0 - x) * (2.0 - x)) as f32
    })
}

/// Resample `image` onto a log-polar grid with the same shape.
///
/// Rows are angles `pi * i / rows` over `[0, pi)`, columns are radii
/// `base^j - 1` measured from `(rows / 2, cols / 2)`. Returns the grid and
/// `base`, chosen so the last radius reaches the image corner.
pub fn log_polar(image: &Array2<f32>) -> (Array2<f32>, f64) {
    let (rows, cols) = image.dim();
    let (angles, radii) = (rows, cols);
    let center_y = (rows / 2) as f64;
    let center_x = (cols / 2) as f64;

    let reach = (rows as f64 - center_y).hypot(cols as f64 - center_x);
    let log_base = reach.powf(1.0 / radii as f64);

    let radius: Vec<f64> = (0..radii).map(|j| log_base.powf(j as f64) - 1.0).collect();
    let trig: Vec<(f64, f64)> = (0..angles)
        .map(|i| (PI * i as f64 / angles as f64).sin_cos())
        .collect();

    let grid = Array2::from_shape_fn((angles, radii), |(i, j)| {
        let (sin_t, cos_t) = trig[i];
        let r = radius[j];
        bilinear_sample(image, center_y + r * sin_t, center_x + r * cos_t)
    });

    (grid, log_base)
}
