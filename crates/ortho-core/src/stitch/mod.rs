pub mod blend;
pub mod components;
pub mod crop;
pub mod graph;
pub mod homography;
pub mod registration;

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{
    DEFAULT_MIN_MATCH_CONFIDENCE, DEFAULT_MIN_OVERLAP_FRACTION, DEFAULT_REGISTRATION_MEGAPIXELS,
};
use crate::error::{OrthoError, Result};
use crate::frame::{Composite, Frame, PixelDepth};

pub use blend::{blend_frames, canvas_bounds, Canvas};
pub use crop::{content_rect, trim_borders, CropRect};
pub use graph::{place_frames, Placement};
pub use homography::Homography;
pub use registration::{
    downscale_area, register_pairs, registration_factor, PairMatch, Spectrum,
};

/// Diagnostic reported when stitching cannot produce a panorama.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StitchStatus {
    /// The match graph does not connect every frame.
    NeedMoreImages,
    /// Placement produced a non-finite or unreasonably large canvas.
    HomographyEstimationFailed,
    /// Frames disagree on channel layout.
    IncompatibleFrames,
}

impl StitchStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::NeedMoreImages => 1,
            Self::HomographyEstimationFailed => 2,
            Self::IncompatibleFrames => 3,
        }
    }
}

impl fmt::Display for StitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NeedMoreImages => "need more images",
            Self::HomographyEstimationFailed => "homography estimation failed",
            Self::IncompatibleFrames => "incompatible frames",
        };
        write!(f, "{name} (code {})", self.code())
    }
}

/// Tunables for pairwise matching and blending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Minimum phase-correlation peak for a pair to join the match graph.
    pub min_confidence: f64,
    /// Minimum overlap, as a fraction of the smaller frame.
    pub min_overlap: f64,
    /// Only match frames at most this far apart in input order; 0 matches all pairs.
    pub max_neighbors: usize,
    /// Distance-to-edge weighting in overlaps instead of a flat average.
    pub feather: bool,
    /// Frames are registered at roughly this many megapixels; 0 registers at
    /// full resolution.
    pub registration_megapixels: f64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_MATCH_CONFIDENCE,
            min_overlap: DEFAULT_MIN_OVERLAP_FRACTION,
            max_neighbors: 0,
            feather: true,
            registration_megapixels: DEFAULT_REGISTRATION_MEGAPIXELS,
        }
    }
}

/// Keep only frames captured in `band`.
pub fn reference_band_frames(frames: Vec<Frame>, band: u32) -> Vec<Frame> {
    frames
        .into_iter()
        .filter(|f| f.metadata.band == Some(band))
        .collect()
}

/// Index pairs to register, honouring `max_neighbors`.
pub fn candidate_pairs(count: usize, max_neighbors: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..count {
        for j in (i + 1)..count {
            if max_neighbors == 0 || j - i <= max_neighbors {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Stitch overlapping frames into a single composite on the first frame's
/// plane, then trim the black padding around the result.
pub fn stitch(frames: &[Frame], config: &StitchConfig) -> Result<Composite> {
    if frames.len() < 2 {
        return Err(OrthoError::InsufficientFrames {
            count: frames.len(),
        });
    }

    let channels = frames[0].channels();
    if let Some((idx, odd)) = frames
        .iter()
        .enumerate()
        .find(|(_, f)| f.channels() != channels)
    {
        return Err(OrthoError::StitchFailed {
            status: StitchStatus::IncompatibleFrames,
            reason: format!(
                "frame {idx} has {} channels, frame 0 has {channels}",
                odd.channels()
            ),
        });
    }
    if let Some(idx) = frames.iter().position(|f| f.width() == 0 || f.height() == 0) {
        return Err(OrthoError::StitchFailed {
            status: StitchStatus::IncompatibleFrames,
            reason: format!("frame {idx} is empty"),
        });
    }

    let dims: Vec<(usize, usize)> = frames.iter().map(|f| (f.height(), f.width())).collect();
    let factor = registration_factor(&dims, config.registration_megapixels);
    let grays: Vec<_> = frames
        .par_iter()
        .map(|f| downscale_area(&f.luminance(), factor))
        .collect();
    let fft_h = grays.iter().map(|g| g.nrows()).max().unwrap_or(0);
    let fft_w = grays.iter().map(|g| g.ncols()).max().unwrap_or(0);
    info!(
        frames = frames.len(),
        fft_width = fft_w,
        fft_height = fft_h,
        downscale = factor,
        "Registering frames"
    );

    let spectra: Vec<Spectrum> = grays
        .par_iter()
        .map(|g| Spectrum::new(g, fft_h, fft_w))
        .collect();
    drop(grays);
    let pairs = candidate_pairs(frames.len(), config.max_neighbors);
    let matches = register_pairs(&spectra, &pairs);
    drop(spectra);

    let scale = factor as f64;
    let accepted: Vec<PairMatch> = matches
        .into_iter()
        .map(|m| PairMatch {
            dx: m.dx * scale,
            dy: m.dy * scale,
            ..m
        })
        .filter(|m| {
            let keep = m.confidence >= config.min_confidence && m.overlap >= config.min_overlap;
            debug!(
                reference = m.reference,
                target = m.target,
                dx = m.dx,
                dy = m.dy,
                confidence = m.confidence,
                ncc = m.ncc,
                overlap = m.overlap,
                keep,
                "Pair registered"
            );
            keep
        })
        .collect();

    let placement = place_frames(frames.len(), &accepted);
    if !placement.is_connected() {
        let unplaced = placement.unplaced();
        warn!(?unplaced, "Frames could not be linked to the panorama");
        return Err(OrthoError::StitchFailed {
            status: StitchStatus::NeedMoreImages,
            reason: format!(
                "{} of {} frames share no reliable overlap with the rest",
                unplaced.len(),
                frames.len()
            ),
        });
    }

    let transforms: Vec<Homography> = placement.transforms.iter().flatten().copied().collect();
    if let Some(idx) = transforms.iter().position(|h| !h.is_finite()) {
        return Err(OrthoError::StitchFailed {
            status: StitchStatus::HomographyEstimationFailed,
            reason: format!("frame {idx} has a non-finite transform"),
        });
    }

    let canvas = canvas_bounds(frames, &transforms)?;
    let planes = blend_frames(frames, &transforms, &canvas, config.feather)?;
    let bit_depth = frames
        .iter()
        .map(|f| f.original_bit_depth)
        .max()
        .unwrap_or(8);
    let composite = trim_borders(Composite::new(planes, PixelDepth::from_bit_depth(bit_depth)));

    info!(
        width = composite.width(),
        height = composite.height(),
        channels = composite.channels(),
        depth = %composite.depth,
        links = placement.tree.len(),
        "Panorama stitched"
    );
    Ok(composite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn status_codes() {
        assert_eq!(StitchStatus::NeedMoreImages.code(), 1);
        assert_eq!(StitchStatus::HomographyEstimationFailed.code(), 2);
        assert_eq!(StitchStatus::IncompatibleFrames.code(), 3);
    }

    #[test]
    fn neighbour_window_limits_pairs() {
        assert_eq!(candidate_pairs(4, 0).len(), 6);
        assert_eq!(candidate_pairs(4, 1), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn mixed_channels_are_incompatible() {
        let mono = Frame::mono(Array2::from_elem((8, 8), 0.5), 8);
        let rgb = Frame::new(vec![Array2::from_elem((8, 8), 0.5); 3], 8);
        let err = stitch(&[mono, rgb], &StitchConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            OrthoError::StitchFailed {
                status: StitchStatus::IncompatibleFrames,
                ..
            }
        ));
    }
}
