use std::path::Path;

use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{DEFAULT_CALCULATOR, MASK_NODATA};
use crate::error::{ArrnormError, Result};
use crate::raster::{PixelType, RasterDataset};
use crate::tools::run_tool;

/// Builds a no-data mask from a target image and applies it to a
/// normalized image.
pub trait MaskBuilder {
    /// Write a single-band mask: 1 where band 1 of `target` is positive, else 0.
    fn create_mask(&self, target: &Path, mask: &Path) -> Result<()>;

    /// Overwrite every band of `normalized` with `band * (mask == 1)`.
    fn apply_mask(&self, normalized: &Path, mask: &Path) -> Result<()>;
}

/// Where masks are computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskBackend {
    /// In-process through the raster library.
    Native,
    /// Through an external raster calculator with `gdal_calc.py` arguments.
    External { program: String },
}

impl Default for MaskBackend {
    fn default() -> Self {
        Self::Native
    }
}

impl MaskBackend {
    pub fn external_default() -> Self {
        Self::External {
            program: DEFAULT_CALCULATOR.to_string(),
        }
    }

    pub fn builder(&self) -> Box<dyn MaskBuilder> {
        match self {
            Self::Native => Box::new(NativeMask),
            Self::External { program } => Box::new(ExternalMask {
                program: program.clone(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeMask;

impl MaskBuilder for NativeMask {
    fn create_mask(&self, target: &Path, mask: &Path) -> Result<()> {
        let source = RasterDataset::open(target)?;
        let valid = source.band(1)?.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let valid_pixels = valid.iter().filter(|&&v| v > 0.0).count();

        let mut out = RasterDataset::from_bands(vec![valid], PixelType::UInt8)?;
        out.geo_transform = source.geo_transform;
        out.projection = source.projection.clone();
        out.nodata = Some(MASK_NODATA);
        out.save(mask)?;

        info!(
            mask = %mask.display(),
            valid_pixels,
            total_pixels = source.width * source.height,
            "Mask created"
        );
        Ok(())
    }

    fn apply_mask(&self, normalized: &Path, mask: &Path) -> Result<()> {
        let mut image = RasterDataset::open(normalized)?;
        let mask_raster = RasterDataset::open(mask)?;
        let keep = mask_raster.band(1)?;

        if keep.dim() != (image.height, image.width) {
            let (rows, cols) = keep.dim();
            return Err(ArrnormError::ShapeMismatch {
                ref_rows: image.height,
                ref_cols: image.width,
                rows,
                cols,
            });
        }

        for band in image.bands_mut() {
            Zip::from(band).and(keep).for_each(|v, &m| {
                if m != 1.0 {
                    *v = 0.0;
                }
            });
        }
        image.nodata = Some(MASK_NODATA);
        image.save(normalized)?;

        info!(image = %normalized.display(), bands = image.band_count(), "Mask applied");
        Ok(())
    }
}

/// Mask construction delegated to a `gdal_calc.py`-compatible calculator.
#[derive(Clone, Debug)]
pub struct ExternalMask {
    pub program: String,
}

impl ExternalMask {
    pub fn create_args(target: &Path, mask: &Path) -> Vec<String> {
        vec![
            "-A".to_string(),
            target.display().to_string(),
            format!("--outfile={}", mask.display()),
            "--calc=1*(A>0)".to_string(),
            "--NoDataValue=0".to_string(),
        ]
    }

    pub fn apply_args(normalized: &Path, mask: &Path) -> Vec<String> {
        vec![
            "-A".to_string(),
            normalized.display().to_string(),
            "-B".to_string(),
            mask.display().to_string(),
            format!("--outfile={}", normalized.display()),
            "--calc=A*(B==1)".to_string(),
            "--NoDataValue=0".to_string(),
            "--allBands=A".to_string(),
            "--overwrite".to_string(),
        ]
    }
}

impl MaskBuilder for ExternalMask {
    fn create_mask(&self, target: &Path, mask: &Path) -> Result<()> {
        run_tool(&self.program, &Self::create_args(target, mask))?;
        Ok(())
    }

    fn apply_mask(&self, normalized: &Path, mask: &Path) -> Result<()> {
        run_tool(&self.program, &Self::apply_args(normalized, mask))?;
        Ok(())
    }
}
