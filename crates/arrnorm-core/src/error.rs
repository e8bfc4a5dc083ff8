use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArrnormError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image {path} could not be read in: {reason}")]
    RasterOpen { path: PathBuf, reason: String },

    #[error("Unsupported raster: {0}")]
    UnsupportedRaster(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Band size mismatch: {ref_cols}x{ref_rows} vs {cols}x{rows}")]
    ShapeMismatch {
        ref_rows: usize,
        ref_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Band {band} out of range (raster has {count} bands)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Window ({x_off},{y_off},{cols},{rows}) exceeds raster size {width}x{height}")]
    WindowOutOfBounds {
        x_off: usize,
        y_off: usize,
        cols: usize,
        rows: usize,
        width: usize,
        height: usize,
    },

    #[error("Band has no contrast (all pixels equal {0})")]
    DegenerateBand(f32),

    #[error("Images are not compatible. Scale change {0:.3} is outside 1/1.8 to 1.8")]
    IncompatibleScale(f64),

    #[error("Failed to start {tool}: {reason}")]
    ToolSpawn { tool: String, reason: String },

    #[error("{tool} failed with return code {}: {stderr}", format_code(.code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} finished but did not produce {path}")]
    MissingToolOutput { tool: String, path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ArrnormError>;
