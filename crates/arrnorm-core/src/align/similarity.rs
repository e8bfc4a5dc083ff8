use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{MAX_SCALE_CHANGE, MIN_ESTIMATION_SIZE};
use crate::error::{ArrnormError, Result};
use crate::raster::Window;

use super::log_polar::{highpass, log_polar, magnitude_spectrum};
use super::phase_correlation::{
    check_same_shape, compute_offset_array, correlation_surface, locate_peak,
};
use super::resample::resample;

/// Scale, rotation and translation that map a target image onto a reference.
///
/// `angle` is in degrees, `shift` is `(dy, dx)` in pixels. Feeding the
/// transform to [`resample`] with the target produces an image aligned with
/// the reference.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub scale: f64,
    pub angle: f64,
    pub shift: (f64, f64),
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            angle: 0.0,
            shift: (0.0, 0.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for SimilarityTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scale={:.4} angle={:.3} shift=({:.3}, {:.3})",
            self.scale, self.angle, self.shift.0, self.shift.1
        )
    }
}

/// Estimate the similarity transform aligning `target` to `reference`.
///
/// Scale and rotation come from phase correlation of the log-polar
/// magnitude spectra; the translation is then measured between the reference
/// and the de-rotated, de-scaled target. Both arrays must have the same
/// shape, be at least `MIN_ESTIMATION_SIZE` on each side and not be constant.
pub fn estimate_similarity(
    reference: &Array2<f32>,
    target: &Array2<f32>,
) -> Result<SimilarityTransform> {
    check_same_shape(reference, target)?;
    let (rows, cols) = reference.dim();
    if rows < MIN_ESTIMATION_SIZE || cols < MIN_ESTIMATION_SIZE {
        return Err(ArrnormError::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    check_not_constant(reference)?;
    check_not_constant(target)?;

    let (scale, angle) = estimate_scale_rotation(reference, target)?;
    debug!(scale, angle, "Log-polar correlation");

    let derotated = resample(
        target,
        &SimilarityTransform {
            scale,
            angle,
            shift: (0.0, 0.0),
        },
        Window::full(cols, rows),
    );
    let offset = compute_offset_array(reference, &derotated)?;
    debug!(dy = offset.dy, dx = offset.dx, "Translation correlation");

    Ok(SimilarityTransform {
        scale,
        angle,
        shift: (offset.dy, offset.dx),
    })
}

fn estimate_scale_rotation(reference: &Array2<f32>, target: &Array2<f32>) -> Result<(f64, f64)> {
    let (rows, cols) = reference.dim();
    let filter = highpass(rows, cols);

    let ref_spectrum = magnitude_spectrum(reference) * &filter;
    let tgt_spectrum = magnitude_spectrum(target) * &filter;

    let (ref_lp, log_base) = log_polar(&ref_spectrum);
    let (tgt_lp, _) = log_polar(&tgt_spectrum);

    let peak = locate_peak(&correlation_surface(&ref_lp, &tgt_lp));
    debug!(row = peak.dy, col = peak.dx, strength = peak.value, "Log-polar peak");

    // Magnitude spectra repeat every 180 degrees
    let mut angle = 180.0 * peak.dy / rows as f64;
    if angle > 90.0 {
        angle -= 180.0;
    } else if angle <= -90.0 {
        angle += 180.0;
    }

    let scale = log_base.powf(peak.dx);
    if !(1.0 / MAX_SCALE_CHANGE..=MAX_SCALE_CHANGE).contains(&scale) {
        return Err(ArrnormError::IncompatibleScale(scale));
    }

    Ok((scale, angle))
}

fn check_not_constant(band: &Array2<f32>) -> Result<()> {
    let first = band.iter().next().copied().unwrap_or(0.0);
    if band.iter().all(|&v| v == first) {
        return Err(ArrnormError::DegenerateBand(first));
    }
    Ok(())
}
