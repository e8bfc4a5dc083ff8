use ndarray::Array2;
use num_complex::Complex;

use crate::compute::{fft2d_forward, ifft2d_real};
use crate::consts::CROSS_POWER_EPSILON;
use crate::error::{ArrnormError, Result};

use super::subpixel::refine_peak_paraboloid;

/// Translation that moves a target band onto its reference.
///
/// Applying it means sampling the target at `(row - dy, col - dx)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Location of the correlation maximum, with wrap-around resolved to signed
/// offsets and sub-pixel refinement applied.
#[derive(Clone, Debug)]
pub struct CorrelationPeak {
    pub dy: f64,
    pub dx: f64,
    pub value: f64,
}

/// Compute the translation offset between two raw arrays using FFT phase correlation.
pub fn compute_offset_array(
    reference: &Array2<f32>,
    target: &Array2<f32>,
) -> Result<AlignmentOffset> {
    check_same_shape(reference, target)?;

    // Hann window reduces leakage from the non-periodic image borders
    let ref_windowed = apply_hann(reference);
    let tgt_windowed = apply_hann(target);

    let correlation = correlation_surface(&ref_windowed, &tgt_windowed);
    let peak = locate_peak(&correlation);

    Ok(AlignmentOffset {
        dx: peak.dx,
        dy: peak.dy,
    })
}

/// Inverse FFT of the normalized cross-power spectrum of two equal-shaped arrays.
///
/// For `target` equal to `reference` translated by `d`, the surface peaks at `-d`.
pub fn correlation_surface(reference: &Array2<f32>, target: &Array2<f32>) -> Array2<f64> {
    let ref_fft = fft2d_forward(reference);
    let tgt_fft = fft2d_forward(target);
    let cross_power = normalized_cross_power(&ref_fft, &tgt_fft);
    ifft2d_real(&cross_power)
}

/// Find the correlation peak and convert it to a signed, sub-pixel offset.
pub fn locate_peak(correlation: &Array2<f64>) -> CorrelationPeak {
    let (h, w) = correlation.dim();
    let (peak_row, peak_col, value) = find_peak(correlation);

    // Indices past the midpoint are negative offsets
    let dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    let (sub_dy, sub_dx) = refine_peak_paraboloid(correlation, peak_row, peak_col);

    CorrelationPeak {
        dy: dy + sub_dy,
        dx: dx + sub_dx,
        value,
    }
}

pub(crate) fn check_same_shape(reference: &Array2<f32>, target: &Array2<f32>) -> Result<()> {
    let (h, w) = reference.dim();
    let (th, tw) = target.dim();
    if h != th || w != tw {
        return Err(ArrnormError::ShapeMismatch {
            ref_rows: h,
            ref_cols: w,
            rows: th,
            cols: tw,
        });
    }
    Ok(())
}

fn apply_hann(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut result = Array2::<f32>::zeros((h, w));

    for row in 0..h {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        for col in 0..w {
            let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
            result[[row, col]] = data[[row, col]] * (wy * wx) as f32;
        }
    }

    result
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    ndarray::Zip::from(ref_fft)
        .and(tgt_fft)
        .map_collect(|&a, &b| {
            let cross = a * b.conj();
            let mag = cross.norm();
            if mag > CROSS_POWER_EPSILON {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            }
        })
}

fn find_peak(data: &Array2<f64>) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for ((row, col), &val) in data.indexed_iter() {
        if val > best.2 {
            best = (row, col, val);
        }
    }
    best
}
