//! Turn raw project media into the ordered frame list the stitcher consumes.

pub mod stills;
pub mod video;

pub use stills::{parse_band, parse_timestamp_ms, select_still_frames};
pub use video::{sample_decoder, select_video_frames, SamplingClock};

use tracing::{info, warn};

use crate::error::Result;
use crate::frame::Frame;
use crate::pipeline::config::{DataType, ProjectConfig};

/// Frames chosen for stitching. When nothing usable was found, `frames` is
/// empty and `stop_reason` says why.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub frames: Vec<Frame>,
    pub stop_reason: Option<String>,
}

impl Selection {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            stop_reason: None,
        }
    }

    pub fn stopped(reason: String) -> Self {
        Self {
            frames: Vec::new(),
            stop_reason: Some(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Select frames for the project's data type.
pub fn select_frames(config: &ProjectConfig) -> Result<Selection> {
    info!(data_type = %config.data_type, "Selecting frames");
    let params = &config.processing_params;
    match &config.data_type {
        DataType::RgbVideo => select_video_frames(
            &config.paths.rgb_video,
            &config.paths.frames,
            params.frame_extraction_interval_ms,
            params.blur_threshold,
        ),
        DataType::Multispectral => select_still_frames(&config.paths.multispectral),
        DataType::Hyperspectral => select_still_frames(&config.paths.hyperspectral),
        DataType::Other(tag) => {
            warn!(data_type = %tag, "Unsupported data type");
            Ok(Selection::stopped(format!("unsupported data type '{tag}'")))
        }
    }
}
