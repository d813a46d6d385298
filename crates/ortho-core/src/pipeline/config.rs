use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{
    CONFIG_FILENAME, DEFAULT_BLUR_THRESHOLD, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_REFERENCE_BAND,
};
use crate::error::{OrthoError, Result};
use crate::stitch::StitchConfig;

/// Kind of raw imagery a project holds.
///
/// Unrecognised tags are kept verbatim so a config round-trips and the run
/// can report what it was given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    RgbVideo,
    Multispectral,
    Hyperspectral,
    Other(String),
}

impl DataType {
    /// Band-separated still images rather than video.
    pub fn is_still_imagery(&self) -> bool {
        matches!(self, Self::Multispectral | Self::Hyperspectral)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RgbVideo => "rgb_video",
            Self::Multispectral => "multispectral",
            Self::Hyperspectral => "hyperspectral",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for DataType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "rgb_video" => Self::RgbVideo,
            "multispectral" => Self::Multispectral,
            "hyperspectral" => Self::Hyperspectral,
            _ => Self::Other(tag),
        }
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectPaths {
    pub project_root: PathBuf,
    pub rgb_video: PathBuf,
    pub multispectral: PathBuf,
    pub hyperspectral: PathBuf,
    pub flight_logs: PathBuf,
    pub frames: PathBuf,
    pub output: PathBuf,
}

impl ProjectPaths {
    /// Standard layout: raw data under `<data_root>/<name>`, results under
    /// `<output_root>/<name>`.
    pub fn standard(name: &str, data_root: &Path, output_root: &Path) -> Self {
        let project_root = data_root.join(name);
        Self {
            rgb_video: project_root.join("rgb_video"),
            multispectral: project_root.join("multispectral"),
            hyperspectral: project_root.join("hyperspectral"),
            flight_logs: project_root.join("flight_logs"),
            frames: project_root.join("frames"),
            output: output_root.join(name),
            project_root,
        }
    }

    /// Raw-data subdirectories created for a new project.
    pub fn data_dirs(&self) -> [&Path; 5] {
        [
            &self.rgb_video,
            &self.multispectral,
            &self.hyperspectral,
            &self.flight_logs,
            &self.frames,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    /// Minimum time between sampled video frames.
    pub frame_extraction_interval_ms: u64,
    /// Frames with a Laplacian variance at or below this are discarded.
    pub blur_threshold: f64,
    /// Band used for stitching multi-band imagery.
    pub multispectral_band_for_stitching: u32,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            frame_extraction_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            multispectral_band_for_stitching: DEFAULT_REFERENCE_BAND,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_name: String,
    pub data_type: DataType,
    pub paths: ProjectPaths,
    #[serde(default)]
    pub processing_params: ProcessingParams,
    #[serde(default)]
    pub stitching: StitchConfig,
}

impl ProjectConfig {
    pub fn new_default(name: &str, data_root: &Path, output_root: &Path) -> Self {
        Self {
            project_name: name.to_string(),
            data_type: DataType::RgbVideo,
            paths: ProjectPaths::standard(name, data_root, output_root),
            processing_params: ProcessingParams::default(),
            stitching: StitchConfig::default(),
        }
    }

    /// Where a project's config lives: `<data_root>/<name>/project_config.toml`.
    pub fn path_for(data_root: &Path, name: &str) -> PathBuf {
        data_root.join(name).join(CONFIG_FILENAME)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| OrthoError::InvalidConfig(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| OrthoError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(OrthoError::ConfigMissing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Directory holding the raw media for the configured data type.
    pub fn source_dir(&self) -> Option<&Path> {
        match self.data_type {
            DataType::RgbVideo => Some(&self.paths.rgb_video),
            DataType::Multispectral => Some(&self.paths.multispectral),
            DataType::Hyperspectral => Some(&self.paths.hyperspectral),
            DataType::Other(_) => None,
        }
    }

    /// Fixed GeoTIFF destination for this project.
    pub fn output_path(&self) -> PathBuf {
        self.paths.output.join(crate::consts::OUTPUT_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_data_type_is_preserved() {
        let dt = DataType::from("thermal".to_string());
        assert_eq!(dt, DataType::Other("thermal".into()));
        assert_eq!(String::from(dt), "thermal");
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let text = r#"
project_name = "field-a"
data_type = "multispectral"

[paths]
project_root = "data/field-a"
rgb_video = "data/field-a/rgb_video"
multispectral = "data/field-a/multispectral"
hyperspectral = "data/field-a/hyperspectral"
flight_logs = "data/field-a/flight_logs"
frames = "data/field-a/frames"
output = "output/field-a"
"#;
        let config = ProjectConfig::from_toml_str(text).unwrap();
        assert_eq!(config.data_type, DataType::Multispectral);
        assert_eq!(config.processing_params, ProcessingParams::default());
        assert_eq!(config.stitching, StitchConfig::default());
        assert_eq!(
            config.source_dir(),
            Some(Path::new("data/field-a/multispectral"))
        );
    }

    #[test]
    fn missing_paths_is_invalid() {
        let err = ProjectConfig::from_toml_str("project_name = \"x\"\ndata_type = \"rgb_video\"\n")
            .unwrap_err();
        assert!(matches!(err, OrthoError::InvalidConfig(_)));
    }
}
