use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_IMAD_ITERATIONS, DEFAULT_NCP_THRESHOLD, DEFAULT_WARP_BAND};
use crate::error::{ArrnormError, Result};
use crate::mask::MaskBackend;
use crate::raster::{PixelType, Window};
use crate::tools::ToolCommand;

/// Inputs of the registration driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterConfig {
    pub reference: PathBuf,
    pub target: PathBuf,
    /// 1-based band used to estimate the transform.
    #[serde(default = "default_warp_band")]
    pub warp_band: usize,
    /// Reference sub-window; the whole reference when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
    #[serde(default = "default_output_type")]
    pub output_type: PixelType,
}

impl RegisterConfig {
    pub fn new(reference: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            reference: reference.into(),
            target: target.into(),
            warp_band: DEFAULT_WARP_BAND,
            window: None,
            output_type: default_output_type(),
        }
    }
}

fn default_warp_band() -> usize {
    DEFAULT_WARP_BAND
}

fn default_output_type() -> PixelType {
    PixelType::Int16
}

/// External programs driven by the normalization pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub imad: ToolCommand,
    pub radcal: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            imad: ToolCommand::imad(),
            radcal: ToolCommand::radcal(),
        }
    }
}

/// Inputs of the `normalize` and `arrnorm` drivers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub reference: PathBuf,
    pub images: Vec<PathBuf>,
    /// iMAD iteration count.
    pub iterations: u32,
    /// radcal no-change probability threshold.
    pub threshold: f64,
    /// Create and apply a no-data mask after calibration.
    pub mask: bool,
    /// Register each target onto the reference before iMAD.
    pub register: bool,
    pub mask_backend: MaskBackend,
    pub tools: ToolsConfig,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            reference: PathBuf::new(),
            images: Vec::new(),
            iterations: DEFAULT_IMAD_ITERATIONS,
            threshold: DEFAULT_NCP_THRESHOLD,
            mask: true,
            register: false,
            mask_backend: MaskBackend::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl NormalizeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reference.as_os_str().is_empty() {
            return Err(ArrnormError::Config("no reference image given".into()));
        }
        if self.images.is_empty() {
            return Err(ArrnormError::Config("no target images given".into()));
        }
        if self.iterations == 0 {
            return Err(ArrnormError::Config("iterations must be at least 1".into()));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ArrnormError::Config(format!(
                "threshold {} is not a probability in (0, 1)",
                self.threshold
            )));
        }
        Ok(())
    }
}
