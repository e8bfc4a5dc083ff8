use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::align::SimilarityTransform;

/// Processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Opening,
    Estimating,
    Resampling,
    Writing,
    ChangeDetection,
    Calibration,
    MaskCreation,
    MaskApplication,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "Opening rasters"),
            Self::Estimating => write!(f, "Estimating transform"),
            Self::Resampling => write!(f, "Resampling bands"),
            Self::Writing => write!(f, "Writing output"),
            Self::ChangeDetection => write!(f, "iMAD change detection"),
            Self::Calibration => write!(f, "Radiometric calibration"),
            Self::MaskCreation => write!(f, "Making mask"),
            Self::MaskApplication => write!(f, "Applying mask"),
        }
    }
}

/// Result of registering one target onto the reference.
#[derive(Clone, Debug)]
pub struct RegisterOutput {
    pub path: PathBuf,
    pub transform: SimilarityTransform,
    pub elapsed: Duration,
    /// Pixels clamped to the output type's range, summed over all bands.
    pub saturated: usize,
}

/// Files produced while normalizing one target.
#[derive(Clone, Debug)]
pub struct NormalizedImage {
    pub target: PathBuf,
    pub registered: Option<PathBuf>,
    pub imad: PathBuf,
    pub normalized: PathBuf,
    pub mask: Option<PathBuf>,
}

/// Thread-safe progress reporting for the drivers.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g., band count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}

    /// Normalization of target `index` (0-based) out of `total` is starting.
    fn begin_image(&self, _index: usize, _total: usize, _target: &Path) {}

    /// Normalization of one target finished successfully.
    fn finish_image(&self, _result: &NormalizedImage) {}
}

/// Progress reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
