use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::align::{estimate_similarity, resample};
use crate::consts::WARP_SUFFIX;
use crate::error::Result;
use crate::raster::{sibling_path, RasterDataset, Window};

use super::config::RegisterConfig;
use super::types::{NoOpReporter, PipelineStage, ProgressReporter, RegisterOutput};

/// Register `config.target` onto `config.reference`.
pub fn register(config: &RegisterConfig) -> Result<RegisterOutput> {
    register_reported(config, Arc::new(NoOpReporter))
}

/// Register with a thread-safe progress reporter.
///
/// The transform is estimated on the warp band inside the reference window,
/// then applied to every target band. The output has the window's size, the
/// reference geotransform shifted to the window origin, the reference
/// projection, and is written beside the target as `<stem>_warp<ext>`.
pub fn register_reported(
    config: &RegisterConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RegisterOutput> {
    let start = Instant::now();

    reporter.begin_stage(PipelineStage::Opening, Some(2));
    let reference = RasterDataset::open(&config.reference)?;
    reporter.advance(1);
    let target = RasterDataset::open(&config.target)?;
    reporter.advance(2);
    reporter.finish_stage();

    info!(
        reference = %config.reference.display(),
        target = %config.target.display(),
        warp_band = config.warp_band,
        bands = target.band_count(),
        "Registering"
    );

    let window = config
        .window
        .unwrap_or_else(|| Window::full(reference.width, reference.height));
    window.check_within(reference.width, reference.height)?;

    reporter.begin_stage(PipelineStage::Estimating, None);
    let ref_band = reference.read_band(config.warp_band, Some(window))?;
    let tgt_band = target.read_band(config.warp_band, Some(window))?;
    let transform = estimate_similarity(&ref_band, &tgt_band)?;
    reporter.finish_stage();
    info!(
        scale = transform.scale,
        angle = transform.angle,
        dy = transform.shift.0,
        dx = transform.shift.1,
        "Similarity transform estimated"
    );

    let band_count = target.band_count();
    let mut output =
        RasterDataset::create(window.cols, window.rows, band_count, config.output_type)?;
    output.geo_transform = reference
        .geo_transform
        .map(|gt| gt.offset_by(window.x_off, window.y_off));
    output.projection = reference.projection.clone();

    reporter.begin_stage(PipelineStage::Resampling, Some(band_count));
    let mut saturated = 0;
    for index in 1..=band_count {
        let warped = resample(target.band(index)?, &transform, window);
        saturated += config.output_type.count_saturated(&warped);
        output.write_band(index, warped)?;
        reporter.advance(index);
    }
    reporter.finish_stage();

    if saturated > 0 {
        warn!(
            saturated,
            pixel_type = %config.output_type,
            "Resampled values exceed the output type range and were clamped"
        );
    }

    let path = sibling_path(&config.target, WARP_SUFFIX);
    reporter.begin_stage(PipelineStage::Writing, None);
    output.save(&path)?;
    reporter.finish_stage();

    let elapsed = start.elapsed();
    info!(
        path = %path.display(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Registration complete"
    );

    Ok(RegisterOutput {
        path,
        transform,
        elapsed,
        saturated,
    })
}
