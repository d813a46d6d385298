use std::path::PathBuf;

use thiserror::Error;

use crate::stitch::StitchStatus;

#[derive(Error, Debug)]
pub enum OrthoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Project config not found at {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Invalid project config: {0}")]
    InvalidConfig(String),

    #[error("Project already exists at {} (use --force to overwrite its config)", .0.display())]
    ProjectExists(PathBuf),

    #[error("No usable frames: {0}")]
    NoUsableFrames(String),

    #[error("Need at least two frames to stitch, got {count}")]
    InsufficientFrames { count: usize },

    #[error("Stitching failed with status code {}: {reason}", .status.code())]
    StitchFailed { status: StitchStatus, reason: String },

    #[error("No flight log records: {0}")]
    NoFlightLog(String),

    #[error("Malformed flight log {}:{line}: {message}", .path.display())]
    FlightLog {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Degenerate geographic extent: {0}")]
    DegenerateExtent(String),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Video decoding error: {0}")]
    Video(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Unsupported raster layout: {0}")]
    UnsupportedRaster(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("TIFF encoding error: {0}")]
    Tiff(#[from] tiff::TiffError),
}

impl OrthoError {
    /// Expected conditions that end a run cleanly rather than crash it.
    pub fn is_stop_condition(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing(_)
                | Self::NoUsableFrames(_)
                | Self::InsufficientFrames { .. }
                | Self::StitchFailed { .. }
                | Self::NoFlightLog(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OrthoError>;
