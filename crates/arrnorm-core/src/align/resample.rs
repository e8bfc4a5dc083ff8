use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::raster::Window;

use super::similarity::SimilarityTransform;

/// Warp `band` by `transform` and return the `crop` region of the result.
///
/// Each output pixel `q` of the crop is mapped back into `band` (inverse
/// mapping): the pixel is placed at `q + (y_off, x_off)`, the shift is undone,
/// then rotation by `-angle` and zoom by `scale` are applied about the centre
/// of the crop window. Samples are bilinear; positions outside `band` read 0.
///
/// The identity transform with a full-size crop returns an exact copy.
pub fn resample(band: &Array2<f32>, transform: &SimilarityTransform, crop: Window) -> Array2<f32> {
    let pivot_y = crop.y_off as f64 + crop.rows as f64 / 2.0;
    let pivot_x = crop.x_off as f64 + crop.cols as f64 / 2.0;
    let (sin_a, cos_a) = transform.angle.to_radians().sin_cos();
    let scale = transform.scale;
    let (shift_y, shift_x) = transform.shift;

    let source_position = |row: usize, col: usize| -> (f64, f64) {
        let y = (crop.y_off + row) as f64 - shift_y - pivot_y;
        let x = (crop.x_off + col) as f64 - shift_x - pivot_x;
        let xr = cos_a * x + sin_a * y;
        let yr = cos_a * y - sin_a * x;
        (pivot_y + scale * yr, pivot_x + scale * xr)
    };

    let mut out = Array2::<f32>::zeros((crop.rows, crop.cols));
    let fill_row = |row: usize, mut line: ndarray::ArrayViewMut1<f32>| {
        for (col, value) in line.iter_mut().enumerate() {
            let (y, x) = source_position(row, col);
            *value = bilinear_sample(band, y, x);
        }
    };

    if crop.rows * crop.cols >= PARALLEL_PIXEL_THRESHOLD {
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, line)| fill_row(row, line));
    } else {
        out.axis_iter_mut(Axis(0))
            .enumerate()
            .for_each(|(row, line)| fill_row(row, line));
    }

    out
}

/// Bilinear interpolation at fractional `(y, x)`; neighbours outside the
/// array contribute 0.
pub fn bilinear_sample(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}
