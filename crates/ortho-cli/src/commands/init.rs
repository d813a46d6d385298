use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ortho_core::pipeline::init_project;

#[derive(Args)]
pub struct InitArgs {
    /// Name of the new project
    #[arg(long)]
    pub project_name: String,

    /// Root directory for raw project data
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Root directory for pipeline results
    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,

    /// Rewrite the config of an existing project (raw data is kept)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> Result<()> {
    let project = init_project(
        &args.project_name,
        &args.data_root,
        &args.output_root,
        args.force,
    )
    .with_context(|| format!("Failed to initialize project '{}'", args.project_name))?;

    crate::summary::print_init_summary(&project);
    Ok(())
}
