use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::frame::Frame;
use crate::io::image_io::load_frame;

use super::Selection;

const RASTER_EXTENSIONS: [&str; 5] = ["tif", "tiff", "png", "jpg", "jpeg"];

pub fn is_raster_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RASTER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Splits a file stem into alphanumeric tokens: `img_0042_band3` →
/// `["img", "0042", "band3"]`.
fn stem_tokens(path: &Path) -> Vec<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Band id from a `bandN` token (case-insensitive).
pub fn parse_band(path: &Path) -> Option<u32> {
    stem_tokens(path).iter().find_map(|token| {
        let lower = token.to_ascii_lowercase();
        let digits = lower.strip_prefix("band")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    })
}

/// Capture time from the first all-digit token, else 0.
pub fn parse_timestamp_ms(path: &Path) -> f64 {
    stem_tokens(path)
        .iter()
        .find(|t| t.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|t| t.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Raster files in `dir`, sorted by file name.
pub fn list_rasters(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_raster_file(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every band image in `dir` without quality filtering.
pub fn select_still_frames(dir: &Path) -> Result<Selection> {
    let files = match list_rasters(dir) {
        Ok(f) => f,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read image directory");
            return Ok(Selection::stopped(format!(
                "cannot read image directory {}: {e}",
                dir.display()
            )));
        }
    };
    if files.is_empty() {
        warn!(dir = %dir.display(), "No raster images found");
        return Ok(Selection::stopped(format!(
            "no raster images found in {}",
            dir.display()
        )));
    }

    let mut frames = Vec::with_capacity(files.len());
    for path in &files {
        let mut frame: Frame = load_frame(path)?;
        frame.metadata.band = parse_band(path);
        frame.metadata.timestamp_ms = parse_timestamp_ms(path);
        frames.push(frame);
    }

    info!(count = frames.len(), dir = %dir.display(), "Loaded band images");
    Ok(Selection::new(frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_token() {
        assert_eq!(parse_band(Path::new("img_001_band3.tif")), Some(3));
        assert_eq!(parse_band(Path::new("IMG-7-Band12.TIF")), Some(12));
        assert_eq!(parse_band(Path::new("bandwidth_1.tif")), None);
        assert_eq!(parse_band(Path::new("capture.tif")), None);
    }

    #[test]
    fn band1_does_not_match_band10() {
        assert_eq!(parse_band(Path::new("x_band10.tif")), Some(10));
    }

    #[test]
    fn timestamp_token() {
        assert_eq!(parse_timestamp_ms(Path::new("img_0042_band1.tif")), 42.0);
        assert_eq!(parse_timestamp_ms(Path::new("band1.tif")), 0.0);
    }

    #[test]
    fn raster_extensions() {
        assert!(is_raster_file(Path::new("a.TIFF")));
        assert!(is_raster_file(Path::new("a.jpeg")));
        assert!(!is_raster_file(Path::new("a.csv")));
    }
}
