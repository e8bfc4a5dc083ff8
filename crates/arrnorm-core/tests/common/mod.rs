#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use arrnorm_core::raster::{GeoTransform, PixelType, Projection, RasterDataset};

/// Gaussian blobs of varying size and brightness on a zero background.
///
/// All blob centres sit at least 25 pixels from the edges of a 100x100 grid
/// so small translations keep the content inside the frame.
pub fn blob_pattern(rows: usize, cols: usize) -> Array2<f32> {
    let blobs: [(f64, f64, f64, f64); 5] = [
        (0.30, 0.35, 4.0, 900.0),
        (0.62, 0.28, 3.0, 600.0),
        (0.45, 0.66, 5.0, 750.0),
        (0.70, 0.70, 2.5, 1000.0),
        (0.35, 0.55, 3.5, 450.0),
    ];
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        blobs
            .iter()
            .map(|&(fy, fx, sigma, amp)| {
                let dy = r as f64 - fy * rows as f64;
                let dx = c as f64 - fx * cols as f64;
                amp * (-(dy * dy + dx * dx) / (2.0 * sigma * sigma)).exp()
            })
            .sum::<f64>() as f32
    })
}

/// Many Gaussian blobs at pseudo-random positions inside the central half of a
/// `size x size` grid, so rotation and zoom about the centre keep them in frame.
pub fn texture_pattern(size: usize) -> Array2<f32> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    let blobs: Vec<(f64, f64, f64, f64)> = (0..24)
        .map(|_| {
            let fy = 0.25 + 0.5 * next();
            let fx = 0.25 + 0.5 * next();
            let sigma = 1.2 + 1.8 * next();
            let amp = 200.0 + 800.0 * next();
            (fy * size as f64, fx * size as f64, sigma, amp)
        })
        .collect();
    Array2::from_shape_fn((size, size), |(r, c)| {
        blobs
            .iter()
            .map(|&(cy, cx, sigma, amp)| {
                let dy = r as f64 - cy;
                let dx = c as f64 - cx;
                amp * (-(dy * dy + dx * dx) / (2.0 * sigma * sigma)).exp()
            })
            .sum::<f64>() as f32
    })
}

/// Move content by `(dy, dx)` whole pixels; vacated pixels become 0.
pub fn translate(data: &Array2<f32>, dy: usize, dx: usize) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut out = Array2::<f32>::zeros((h, w));
    for r in 0..h.saturating_sub(dy) {
        for c in 0..w.saturating_sub(dx) {
            out[[r + dy, c + dx]] = data[[r, c]];
        }
    }
    out
}

pub fn utm_transform() -> GeoTransform {
    GeoTransform::new(440_720.0, 3_751_320.0, 30.0, -30.0)
}

/// WGS 84 / UTM zone 18N as a minimal GeoKey directory.
pub fn utm_projection() -> Projection {
    Projection {
        geo_keys: vec![
            1, 1, 0, 3, //
            1024, 0, 1, 1, // GTModelTypeGeoKey = projected
            1025, 0, 1, 1, // GTRasterTypeGeoKey = PixelIsArea
            3072, 0, 1, 32618, // ProjectedCSTypeGeoKey
        ],
        double_params: Vec::new(),
        ascii_params: String::new(),
    }
}

/// Write a georeferenced raster into `dir` and return its path.
pub fn write_raster(
    dir: &Path,
    name: &str,
    bands: Vec<Array2<f32>>,
    pixel_type: PixelType,
) -> PathBuf {
    let mut raster = RasterDataset::from_bands(bands, pixel_type).expect("build raster");
    raster.geo_transform = Some(utm_transform());
    raster.projection = Some(utm_projection());
    let path = dir.join(name);
    raster.save(&path).expect("write raster");
    path
}

/// Three bands derived from one pattern with different gains.
pub fn three_bands(base: &Array2<f32>) -> Vec<Array2<f32>> {
    vec![base.clone(), base * 0.5 + 10.0, base * 2.0]
}

/// Mean absolute difference over the whole of two equal-shaped arrays.
pub fn full_mae(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    let (rows, cols) = a.dim();
    mean_abs_diff(a, b, rows, cols)
}

/// Mean absolute difference over `rows x cols` starting at the origin.
pub fn mean_abs_diff(a: &Array2<f32>, b: &Array2<f32>, rows: usize, cols: usize) -> f64 {
    let mut sum = 0.0;
    for r in 0..rows {
        for c in 0..cols {
            sum += (a[[r, c]] as f64 - b[[r, c]] as f64).abs();
        }
    }
    sum / (rows * cols) as f64
}
