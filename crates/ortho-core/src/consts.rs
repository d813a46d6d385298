/// Default minimum spacing between sampled video frames, in milliseconds.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 5000;

/// Default Laplacian-variance threshold below which a frame counts as blurred.
/// Measured on the 8-bit intensity scale.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// Default spectral band used for feature matching on multi-band imagery.
pub const DEFAULT_REFERENCE_BAND: u32 = 1;

/// Frame rate assumed when a video carries no timestamps and no rate metadata.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Scale applied to [0, 1] intensities before scoring so that blur thresholds
/// keep their 8-bit meaning.
pub const SHARPNESS_INTENSITY_SCALE: f64 = 255.0;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of decoded video frames scored together in one parallel batch.
pub const SCORING_BATCH_SIZE: usize = 8;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Number of channels in an RGB frame.
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Default minimum phase-correlation peak for a pair to count as matched.
pub const DEFAULT_MIN_MATCH_CONFIDENCE: f64 = 0.05;

/// Default minimum overlap, as a fraction of the smaller frame's area.
pub const DEFAULT_MIN_OVERLAP_FRACTION: f64 = 0.05;

/// Default working resolution for pairwise registration, in megapixels.
pub const DEFAULT_REGISTRATION_MEGAPIXELS: f64 = 0.6;

/// Canvas area above which a panorama is treated as a failed estimate.
pub const MAX_CANVAS_PIXELS: usize = 400_000_000;

/// Grayscale level (on [0, 1]) separating content from black padding.
pub const BORDER_THRESHOLD: f32 = 1.0 / 255.0;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;

/// Fixed output filename for the georeferenced mosaic.
pub const OUTPUT_FILENAME: &str = "stitched_georeferenced.tif";

/// Project config filename inside the project root.
pub const CONFIG_FILENAME: &str = "project_config.toml";

/// EPSG code of WGS84 geographic coordinates.
pub const EPSG_WGS84: u16 = 4326;
