pub mod log_polar;
pub mod phase_correlation;
pub mod resample;
pub mod similarity;
pub mod subpixel;

pub use phase_correlation::{compute_offset_array, AlignmentOffset};
pub use resample::{bilinear_sample, resample};
pub use similarity::{estimate_similarity, SimilarityTransform};
