use std::path::PathBuf;
use std::time::Duration;

use crate::georef::Georeference;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    LoadingConfig,
    FrameSelection,
    Stitching,
    LoadingFlightLog,
    Georeferencing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadingConfig => write!(f, "Loading project config"),
            Self::FrameSelection => write!(f, "Selecting frames"),
            Self::Stitching => write!(f, "Stitching panorama"),
            Self::LoadingFlightLog => write!(f, "Reading flight logs"),
            Self::Georeferencing => write!(f, "Georeferencing"),
        }
    }
}

/// What a successful run produced.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    pub frames_selected: usize,
    pub frames_stitched: usize,
    pub composite_width: usize,
    pub composite_height: usize,
    pub channels: usize,
    pub flight_log_points: usize,
    pub georeference: Georeference,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
