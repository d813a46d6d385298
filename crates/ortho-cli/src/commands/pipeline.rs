use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ortho_core::pipeline::{
    run_pipeline_reported, PipelineStage, ProgressReporter, ProjectConfig,
};

#[derive(Args)]
pub struct RunArgs {
    /// Project to run, looked up under --data-root
    #[arg(long, conflicts_with = "config")]
    pub project_name: Option<String>,

    /// Root directory holding project folders
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Explicit project config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Spinner that shows the current pipeline stage.
struct SpinnerReporter {
    pb: ProgressBar,
}

impl SpinnerReporter {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
        Ok(Self { pb })
    }
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        match total_items {
            Some(n) => self.pb.set_message(format!("{stage} ({n} frames)")),
            None => self.pb.set_message(stage.to_string()),
        }
        self.pb.enable_steady_tick(Duration::from_millis(120));
    }

    fn finish_stage(&self) {
        self.pb.disable_steady_tick();
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config_path = match (&args.config, &args.project_name) {
        (Some(path), _) => path.clone(),
        (None, Some(name)) => ProjectConfig::path_for(&args.data_root, name),
        (None, None) => bail!("Either --project-name or --config is required"),
    };
    let config = ProjectConfig::load(&config_path)?;

    crate::summary::print_pipeline_summary(&config);

    let reporter = Arc::new(SpinnerReporter::new()?);
    let result = run_pipeline_reported(&config, reporter.clone());
    reporter.pb.finish_and_clear();

    let report = result?;
    crate::summary::print_report(&report);
    Ok(())
}
