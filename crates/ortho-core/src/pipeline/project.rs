use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{OrthoError, Result};

use super::config::ProjectConfig;

/// A freshly created project: its config and where the config was written.
#[derive(Clone, Debug)]
pub struct InitializedProject {
    pub config: ProjectConfig,
    pub config_path: PathBuf,
}

/// Create the project directory tree and a default config.
///
/// An existing config is left alone unless `force` is set; raw data already
/// in the tree is never removed.
pub fn init_project(
    name: &str,
    data_root: &Path,
    output_root: &Path,
    force: bool,
) -> Result<InitializedProject> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(OrthoError::InvalidConfig(format!(
            "invalid project name {name:?}"
        )));
    }

    let config_path = ProjectConfig::path_for(data_root, name);
    if config_path.exists() && !force {
        return Err(OrthoError::ProjectExists(data_root.join(name)));
    }

    let config = ProjectConfig::new_default(name, data_root, output_root);
    for dir in config.paths.data_dirs() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::create_dir_all(&config.paths.output)?;
    config.save(&config_path)?;

    info!(
        project = name,
        config = %config_path.display(),
        "Project initialized"
    );
    Ok(InitializedProject {
        config,
        config_path,
    })
}
