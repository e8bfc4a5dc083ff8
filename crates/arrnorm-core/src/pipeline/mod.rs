pub mod config;
mod normalize;
mod register;
mod types;

pub use config::{NormalizeConfig, RegisterConfig, ToolsConfig};
pub use normalize::{
    run_configured, run_normalization, ChangeDetector, ExternalCalibrator, ExternalChangeDetector,
    RadiometricCalibrator,
};
pub use register::{register, register_reported};
pub use types::{NoOpReporter, NormalizedImage, PipelineStage, ProgressReporter, RegisterOutput};
