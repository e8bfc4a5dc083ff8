use std::path::{Path, PathBuf};

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ArrnormError, Result};

/// Pixel storage type of a raster band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    pub fn bits(&self) -> u16 {
        match self {
            Self::UInt8 | Self::Int8 => 8,
            Self::UInt16 | Self::Int16 => 16,
            Self::UInt32 | Self::Int32 | Self::Float32 => 32,
            Self::Float64 => 64,
        }
    }

    /// Inclusive value range representable by this type.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::UInt8 => (0.0, u8::MAX as f64),
            Self::Int8 => (i8::MIN as f64, i8::MAX as f64),
            Self::UInt16 => (0.0, u16::MAX as f64),
            Self::Int16 => (i16::MIN as f64, i16::MAX as f64),
            Self::UInt32 => (0.0, u32::MAX as f64),
            Self::Int32 => (i32::MIN as f64, i32::MAX as f64),
            Self::Float32 => (f32::MIN as f64, f32::MAX as f64),
            Self::Float64 => (f64::MIN, f64::MAX),
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }

    /// Number of samples that will be clamped when `band` is written as this type.
    ///
    /// Integer types round first; NaN is written as 0 and not counted.
    pub fn count_saturated(&self, band: &Array2<f32>) -> usize {
        let (lo, hi) = self.range();
        let integer = self.is_integer();
        band.iter()
            .filter(|v| !v.is_nan())
            .map(|&v| if integer { (v as f64).round() } else { v as f64 })
            .filter(|&v| v < lo || v > hi)
            .count()
    }
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UInt8 => write!(f, "Byte"),
            Self::Int8 => write!(f, "Int8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::Int16 => write!(f, "Int16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::Int32 => write!(f, "Int32"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
        }
    }
}

/// Affine georeferencing coefficients in GDAL order.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    /// Usually negative for north-up images.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform with no rotation terms.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Transform of a sub-window whose upper-left pixel is `(x_off, y_off)`.
    ///
    /// Only the origin moves, along the pixel axes; rotation terms are kept.
    pub fn offset_by(&self, x_off: usize, y_off: usize) -> Self {
        Self {
            origin_x: self.origin_x + x_off as f64 * self.pixel_width,
            origin_y: self.origin_y + y_off as f64 * self.pixel_height,
            ..*self
        }
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10 && self.col_rotation.abs() < 1e-10
    }
}

/// Coordinate reference system as carried by GeoTIFF GeoKeys.
///
/// Kept verbatim so a projection can be copied from one raster to another
/// without interpreting it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub geo_keys: Vec<u16>,
    pub double_params: Vec<f64>,
    pub ascii_params: String,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.geo_keys.is_empty()
    }
}

/// Spatial sub-window in pixel coordinates: upper-left offset plus size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub x_off: usize,
    pub y_off: usize,
    pub cols: usize,
    pub rows: usize,
}

impl Window {
    pub fn new(x_off: usize, y_off: usize, cols: usize, rows: usize) -> Self {
        Self {
            x_off,
            y_off,
            cols,
            rows,
        }
    }

    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Fail unless the window lies inside a `width` x `height` raster.
    pub fn check_within(&self, width: usize, height: usize) -> Result<()> {
        let x_end = self.x_off.checked_add(self.cols);
        let y_end = self.y_off.checked_add(self.rows);
        if self.cols == 0
            || self.rows == 0
            || x_end.map_or(true, |end| end > width)
            || y_end.map_or(true, |end| end > height)
        {
            return Err(ArrnormError::WindowOutOfBounds {
                x_off: self.x_off,
                y_off: self.y_off,
                cols: self.cols,
                rows: self.rows,
                width,
                height,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{},{})", self.x_off, self.y_off, self.cols, self.rows)
    }
}

impl std::str::FromStr for Window {
    type Err = String;

    /// Parse `"(x0,y0,cols,rows)"`; parentheses and whitespace are optional.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s
            .trim()
            .trim_start_matches(['(', '['])
            .trim_end_matches([')', ']']);
        let parts: Vec<usize> = trimmed
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("invalid window '{s}': {e}"))?;
        if parts.len() != 4 {
            return Err(format!(
                "invalid window '{s}': expected 4 values (x0,y0,cols,rows), got {}",
                parts.len()
            ));
        }
        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

/// A georeferenced multi-band raster held in memory.
///
/// Band data is stored as `f32` regardless of `pixel_type`; the pixel type
/// only governs how the raster is written back to disk.
#[derive(Clone, Debug)]
pub struct RasterDataset {
    pub path: Option<PathBuf>,
    pub width: usize,
    pub height: usize,
    pub pixel_type: PixelType,
    pub geo_transform: Option<GeoTransform>,
    pub projection: Option<Projection>,
    pub nodata: Option<f64>,
    bands: Vec<Array2<f32>>,
}

impl RasterDataset {
    /// Create a zero-filled raster, the in-memory equivalent of a driver `Create`.
    pub fn create(
        width: usize,
        height: usize,
        band_count: usize,
        pixel_type: PixelType,
    ) -> Result<Self> {
        if width == 0 || height == 0 || band_count == 0 {
            return Err(ArrnormError::InvalidDimensions { width, height });
        }
        Ok(Self {
            path: None,
            width,
            height,
            pixel_type,
            geo_transform: None,
            projection: None,
            nodata: None,
            bands: vec![Array2::zeros((height, width)); band_count],
        })
    }

    /// Build a raster from already decoded bands, all of shape `(height, width)`.
    pub fn from_bands(bands: Vec<Array2<f32>>, pixel_type: PixelType) -> Result<Self> {
        let (height, width) = bands.first().map(|b| b.dim()).unwrap_or((0, 0));
        if width == 0 || height == 0 {
            return Err(ArrnormError::InvalidDimensions { width, height });
        }
        if let Some(bad) = bands.iter().find(|b| b.dim() != (height, width)) {
            let (rows, cols) = bad.dim();
            return Err(ArrnormError::ShapeMismatch {
                ref_rows: height,
                ref_cols: width,
                rows,
                cols,
            });
        }
        Ok(Self {
            path: None,
            width,
            height,
            pixel_type,
            geo_transform: None,
            projection: None,
            nodata: None,
            bands,
        })
    }

    /// Open a raster file, mapping any failure to `RasterOpen`.
    pub fn open(path: &Path) -> Result<Self> {
        crate::io::geotiff::read_geotiff(path).map_err(|e| match e {
            ArrnormError::RasterOpen { .. } => e,
            other => ArrnormError::RasterOpen {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }

    /// Write the raster to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::io::geotiff::write_geotiff(self, path)
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Borrow a band by 1-based index.
    pub fn band(&self, index: usize) -> Result<&Array2<f32>> {
        self.check_band(index)?;
        Ok(&self.bands[index - 1])
    }

    /// Read a band (1-based) as an owned array, optionally restricted to a window.
    pub fn read_band(&self, index: usize, window: Option<Window>) -> Result<Array2<f32>> {
        let band = self.band(index)?;
        match window {
            None => Ok(band.clone()),
            Some(w) => {
                w.check_within(self.width, self.height)?;
                Ok(band
                    .slice(s![w.y_off..w.y_off + w.rows, w.x_off..w.x_off + w.cols])
                    .to_owned())
            }
        }
    }

    /// Replace a band (1-based) with `data`, which must match the raster size.
    pub fn write_band(&mut self, index: usize, data: Array2<f32>) -> Result<()> {
        self.check_band(index)?;
        let (rows, cols) = data.dim();
        if (rows, cols) != (self.height, self.width) {
            return Err(ArrnormError::ShapeMismatch {
                ref_rows: self.height,
                ref_cols: self.width,
                rows,
                cols,
            });
        }
        self.bands[index - 1] = data;
        Ok(())
    }

    pub fn bands(&self) -> &[Array2<f32>] {
        &self.bands
    }

    pub fn bands_mut(&mut self) -> &mut [Array2<f32>] {
        &mut self.bands
    }

    fn check_band(&self, index: usize) -> Result<()> {
        if index == 0 || index > self.bands.len() {
            return Err(ArrnormError::BandOutOfRange {
                band: index,
                count: self.bands.len(),
            });
        }
        Ok(())
    }
}

/// `<dir>/<stem><suffix><ext>` beside `path`, the naming used for all
/// derived outputs (`_warp`, `_mask`).
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    dir.join(name)
}
