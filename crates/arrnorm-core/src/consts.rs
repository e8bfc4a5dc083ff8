/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon below which a cross-power magnitude is treated as zero.
pub const CROSS_POWER_EPSILON: f64 = 1e-12;

/// Largest scale change (either direction) the similarity estimator accepts.
pub const MAX_SCALE_CHANGE: f64 = 1.8;

/// Smallest band edge length the similarity estimator accepts.
pub const MIN_ESTIMATION_SIZE: usize = 8;

/// Default band used for estimating the registration transform (1-based).
pub const DEFAULT_WARP_BAND: usize = 1;

/// Default number of iMAD iterations.
pub const DEFAULT_IMAD_ITERATIONS: u32 = 25;

/// Default no-change probability threshold for radcal.
pub const DEFAULT_NCP_THRESHOLD: f64 = 0.95;

/// Suffix appended to the target stem for registered output.
pub const WARP_SUFFIX: &str = "_warp";

/// Suffix appended to the target stem for the no-data mask.
pub const MASK_SUFFIX: &str = "_mask";

/// No-data value written to masks and masked outputs.
pub const MASK_NODATA: f64 = 0.0;

/// Default raster-calculator executable for the external mask backend.
pub const DEFAULT_CALCULATOR: &str = "gdal_calc.py";
