pub mod config;
mod orchestrator;
mod project;
mod types;

pub use config::{DataType, ProcessingParams, ProjectConfig, ProjectPaths};
pub use orchestrator::{run_pipeline, run_pipeline_reported, run_project};
pub use project::{init_project, InitializedProject};
pub use types::{PipelineReport, PipelineStage, ProgressReporter};
