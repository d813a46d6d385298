use ndarray::Array2;
use std::path::PathBuf;

use crate::consts::{COLOR_CHANNEL_COUNT, LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};

/// A single raster sample: one plane per channel.
/// Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug)]
pub struct Frame {
    /// Channel planes, row-major, each shape = (height, width)
    pub planes: Vec<Array2<f32>>,
    /// Original bit depth before conversion (8 or 16)
    pub original_bit_depth: u8,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(planes: Vec<Array2<f32>>, bit_depth: u8) -> Self {
        Self {
            planes,
            original_bit_depth: bit_depth,
            metadata: FrameMetadata::default(),
        }
    }

    /// Single-channel frame.
    pub fn mono(data: Array2<f32>, bit_depth: u8) -> Self {
        Self::new(vec![data], bit_depth)
    }

    pub fn with_metadata(mut self, metadata: FrameMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn width(&self) -> usize {
        self.planes.first().map_or(0, |p| p.ncols())
    }

    pub fn height(&self) -> usize {
        self.planes.first().map_or(0, |p| p.nrows())
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Grayscale view of the frame.
    pub fn luminance(&self) -> Array2<f32> {
        luminance(&self.planes)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameMetadata {
    /// Milliseconds since the start of the source video, or parsed from the
    /// filename for still captures.
    pub timestamp_ms: f64,
    /// Spectral band for multispectral/hyperspectral captures.
    pub band: Option<u32>,
    /// File the frame was read from or persisted to.
    pub source: PathBuf,
    /// Laplacian variance, when the frame went through blur filtering.
    pub sharpness: Option<f64>,
}

/// Storage type of a raster's samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelDepth {
    U8,
    U16,
}

impl PixelDepth {
    pub fn from_bit_depth(bits: u8) -> Self {
        if bits > 8 {
            Self::U16
        } else {
            Self::U8
        }
    }

    pub fn max_value(self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
        }
    }
}

impl std::fmt::Display for PixelDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "uint8"),
            Self::U16 => write!(f, "uint16"),
        }
    }
}

/// The stitched mosaic, before georeferencing.
#[derive(Clone, Debug)]
pub struct Composite {
    pub planes: Vec<Array2<f32>>,
    pub depth: PixelDepth,
}

impl Composite {
    pub fn new(planes: Vec<Array2<f32>>, depth: PixelDepth) -> Self {
        Self { planes, depth }
    }

    pub fn width(&self) -> usize {
        self.planes.first().map_or(0, |p| p.ncols())
    }

    pub fn height(&self) -> usize {
        self.planes.first().map_or(0, |p| p.nrows())
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn luminance(&self) -> Array2<f32> {
        luminance(&self.planes)
    }
}

/// BT.601 luminance for RGB, identity for mono, channel mean otherwise.
pub fn luminance(planes: &[Array2<f32>]) -> Array2<f32> {
    match planes.len() {
        0 => Array2::zeros((0, 0)),
        1 => planes[0].clone(),
        COLOR_CHANNEL_COUNT => {
            let (h, w) = planes[0].dim();
            let mut data = Array2::<f32>::zeros((h, w));
            for row in 0..h {
                for col in 0..w {
                    data[[row, col]] = LUMINANCE_R * planes[0][[row, col]]
                        + LUMINANCE_G * planes[1][[row, col]]
                        + LUMINANCE_B * planes[2][[row, col]];
                }
            }
            data
        }
        n => {
            let mut data = planes[0].clone();
            for plane in &planes[1..] {
                data += plane;
            }
            data / n as f32
        }
    }
}
