use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{OrthoError, Result};
use crate::georef::georeference;
use crate::io::flight_log::load_flight_logs;
use crate::select::select_frames;
use crate::stitch::{reference_band_frames, stitch};

use super::config::ProjectConfig;
use super::types::{NoOpReporter, PipelineReport, PipelineStage, ProgressReporter};

/// Load the named project's config from `data_root` and run it.
pub fn run_project(
    data_root: &Path,
    project_name: &str,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineReport> {
    reporter.begin_stage(PipelineStage::LoadingConfig, None);
    let config_path = ProjectConfig::path_for(data_root, project_name);
    let config = ProjectConfig::load(&config_path);
    reporter.finish_stage();
    run_pipeline_reported(&config?, reporter)
}

/// Run selection, stitching and georeferencing without progress reporting.
pub fn run_pipeline(config: &ProjectConfig) -> Result<PipelineReport> {
    run_pipeline_reported(config, Arc::new(NoOpReporter))
}

/// Run the full processing pipeline with a thread-safe progress reporter.
///
/// Each stage must produce output for the next to start; the first stage
/// that comes up empty ends the run with its error and nothing is written.
pub fn run_pipeline_reported(
    config: &ProjectConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineReport> {
    let start = Instant::now();
    info!(
        project = %config.project_name,
        data_type = %config.data_type,
        "Starting pipeline"
    );

    let result = run_stages(config, &reporter, start);
    match &result {
        Ok(report) => info!(
            elapsed_secs = report.elapsed.as_secs_f64(),
            output = %report.output.display(),
            "Pipeline finished"
        ),
        Err(e) if e.is_stop_condition() => warn!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            reason = %e,
            "Pipeline stopped"
        ),
        Err(_) => {}
    }
    result
}

fn run_stages(
    config: &ProjectConfig,
    reporter: &Arc<dyn ProgressReporter>,
    start: Instant,
) -> Result<PipelineReport> {
    reporter.begin_stage(PipelineStage::FrameSelection, None);
    let selection = select_frames(config)?;
    reporter.finish_stage();
    if selection.is_empty() {
        return Err(OrthoError::NoUsableFrames(
            selection
                .stop_reason
                .unwrap_or_else(|| "frame selection returned nothing".into()),
        ));
    }
    let frames_selected = selection.frames.len();
    info!(count = frames_selected, "Frames selected");

    let frames = if config.data_type.is_still_imagery() {
        let band = config.processing_params.multispectral_band_for_stitching;
        let kept = reference_band_frames(selection.frames, band);
        info!(band, count = kept.len(), "Stitching reference band");
        kept
    } else {
        selection.frames
    };

    reporter.begin_stage(PipelineStage::Stitching, Some(frames.len()));
    let composite = stitch(&frames, &config.stitching)?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::LoadingFlightLog, None);
    let log = load_flight_logs(&config.paths.flight_logs)?;
    reporter.finish_stage();
    if log.is_empty() {
        return Err(OrthoError::NoFlightLog(format!(
            "no flight log records in {}",
            config.paths.flight_logs.display()
        )));
    }

    reporter.begin_stage(PipelineStage::Georeferencing, None);
    std::fs::create_dir_all(&config.paths.output)?;
    let output = config.output_path();
    let georeference = georeference(&composite, &log, &output)?;
    reporter.finish_stage();

    Ok(PipelineReport {
        frames_selected,
        frames_stitched: frames.len(),
        composite_width: composite.width(),
        composite_height: composite.height(),
        channels: composite.channels(),
        flight_log_points: log.len(),
        georeference,
        output,
        elapsed: start.elapsed(),
    })
}
