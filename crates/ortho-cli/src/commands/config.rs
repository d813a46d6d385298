use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ortho_core::pipeline::ProjectConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Project name written into the config
    #[arg(long, default_value = "my-project")]
    pub project_name: String,

    /// Root directory for raw project data
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Root directory for pipeline results
    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default ProjectConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = ProjectConfig::new_default(&args.project_name, &args.data_root, &args.output_root);
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
