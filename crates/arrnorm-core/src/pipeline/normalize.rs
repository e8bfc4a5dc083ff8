use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::consts::MASK_SUFFIX;
use crate::error::{ArrnormError, Result};
use crate::mask::MaskBuilder;
use crate::raster::sibling_path;
use crate::tools::{Placeholders, ToolCommand};

use super::config::{NormalizeConfig, RegisterConfig};
use super::register::register_reported;
use super::types::{NormalizedImage, PipelineStage, ProgressReporter};

/// Multivariate change detection producing a no-change probability raster.
pub trait ChangeDetector {
    fn detect(&self, reference: &Path, target: &Path, iterations: u32) -> Result<PathBuf>;
}

/// Radiometric calibration of a target over the no-change pixels of an
/// iMAD raster, producing the normalized raster.
pub trait RadiometricCalibrator {
    fn calibrate(&self, target: &Path, imad: &Path, threshold: f64) -> Result<PathBuf>;
}

/// iMAD run as an external program.
#[derive(Clone, Debug)]
pub struct ExternalChangeDetector {
    pub command: ToolCommand,
}

impl ChangeDetector for ExternalChangeDetector {
    fn detect(&self, reference: &Path, target: &Path, iterations: u32) -> Result<PathBuf> {
        let values =
            Placeholders::for_pair(reference, target).with("iterations", iterations.to_string());
        let output = self.command.output_path(&values).ok_or_else(|| {
            ArrnormError::Config(format!("{} has no output template", self.command.program))
        })?;
        let values = values.with("output", output.display().to_string());
        self.command.execute(&values)?;
        Ok(output)
    }
}

/// radcal run as an external program.
#[derive(Clone, Debug)]
pub struct ExternalCalibrator {
    pub command: ToolCommand,
}

impl RadiometricCalibrator for ExternalCalibrator {
    fn calibrate(&self, target: &Path, imad: &Path, threshold: f64) -> Result<PathBuf> {
        let values = Placeholders::for_target(target)
            .with("imad", imad.display().to_string())
            .with("input", imad.display().to_string())
            .with("threshold", threshold.to_string());
        let output = self.command.output_path(&values).ok_or_else(|| {
            ArrnormError::Config(format!("{} has no output template", self.command.program))
        })?;
        let values = values.with("output", output.display().to_string());
        self.command.execute(&values)?;
        Ok(output)
    }
}

/// Normalize every target in `config.images` against `config.reference`.
///
/// Targets are processed one after another in the given order: optional
/// registration, iMAD, radcal, then optional mask creation and application.
/// The first failure aborts the batch; files already written are kept.
pub fn run_normalization(
    config: &NormalizeConfig,
    imad: &dyn ChangeDetector,
    radcal: &dyn RadiometricCalibrator,
    masker: &dyn MaskBuilder,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<Vec<NormalizedImage>> {
    config.validate()?;

    let total = config.images.len();
    let mut results = Vec::with_capacity(total);

    for (index, target) in config.images.iter().enumerate() {
        reporter.begin_image(index, total, target);
        info!(
            target = %target.display(),
            image = index + 1,
            total,
            "Processing image"
        );

        let registered = if config.register {
            let out = register_reported(
                &RegisterConfig::new(&config.reference, target),
                Arc::clone(&reporter),
            )?;
            Some(out.path)
        } else {
            None
        };
        let imad_input = registered.as_deref().unwrap_or(target);

        reporter.begin_stage(PipelineStage::ChangeDetection, None);
        let imad_path = imad.detect(&config.reference, imad_input, config.iterations)?;
        reporter.finish_stage();
        info!(imad = %imad_path.display(), "iMAD complete");

        reporter.begin_stage(PipelineStage::Calibration, None);
        let normalized = radcal.calibrate(imad_input, &imad_path, config.threshold)?;
        reporter.finish_stage();
        info!(normalized = %normalized.display(), "Radcal complete");

        let mask = if config.mask {
            // Built from the image radcal calibrated so both share one grid
            let mask_path = sibling_path(target, MASK_SUFFIX);

            reporter.begin_stage(PipelineStage::MaskCreation, None);
            masker.create_mask(imad_input, &mask_path)?;
            reporter.finish_stage();

            reporter.begin_stage(PipelineStage::MaskApplication, None);
            masker.apply_mask(&normalized, &mask_path)?;
            reporter.finish_stage();

            Some(mask_path)
        } else {
            None
        };

        let result = NormalizedImage {
            target: target.clone(),
            registered,
            imad: imad_path,
            normalized,
            mask,
        };
        reporter.finish_image(&result);
        results.push(result);
    }

    Ok(results)
}

/// Run the normalization with the external iMAD/radcal programs and the
/// mask backend named in `config`.
pub fn run_configured(
    config: &NormalizeConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<Vec<NormalizedImage>> {
    let imad = ExternalChangeDetector {
        command: config.tools.imad.clone(),
    };
    let radcal = ExternalCalibrator {
        command: config.tools.radcal.clone(),
    };
    let masker = config.mask_backend.builder();
    run_normalization(config, &imad, &radcal, masker.as_ref(), reporter)
}
