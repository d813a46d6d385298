use std::ops::Range;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{MAX_CANVAS_PIXELS, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{OrthoError, Result};
use crate::frame::Frame;

use super::homography::Homography;
use super::StitchStatus;

/// Output raster extent on the common projection plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    /// Plane coordinate of the canvas's top-left pixel edge.
    pub origin_x: f64,
    pub origin_y: f64,
}

impl Canvas {
    /// Plane coordinate of a canvas pixel centre.
    fn plane_point(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 + 0.5,
            self.origin_y + row as f64 + 0.5,
        )
    }
}

/// Union bounding box of every frame's warped pixel-edge corners.
pub fn canvas_bounds(frames: &[Frame], transforms: &[Homography]) -> Result<Canvas> {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

    for (idx, (frame, h)) in frames.iter().zip(transforms).enumerate() {
        for (x, y) in frame_corners(frame) {
            let Some((px, py)) = h.apply(x, y).filter(|(px, py)| px.is_finite() && py.is_finite())
            else {
                return Err(estimation_failed(format!(
                    "frame {idx} corner maps to a non-finite point"
                )));
            };
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
    }

    let width = (max_x - min_x).round();
    let height = (max_y - min_y).round();
    if !width.is_finite() || !height.is_finite() || width < 1.0 || height < 1.0 {
        return Err(estimation_failed(format!(
            "canvas extent {width}x{height} is not usable"
        )));
    }
    if width * height > MAX_CANVAS_PIXELS as f64 {
        return Err(estimation_failed(format!(
            "canvas {width}x{height} exceeds {MAX_CANVAS_PIXELS} pixels"
        )));
    }

    Ok(Canvas {
        width: width as usize,
        height: height as usize,
        origin_x: min_x,
        origin_y: min_y,
    })
}

fn frame_corners(frame: &Frame) -> [(f64, f64); 4] {
    let (w, h) = (frame.width() as f64 - 0.5, frame.height() as f64 - 0.5);
    [(-0.5, -0.5), (w, -0.5), (-0.5, h), (w, h)]
}

fn estimation_failed(reason: String) -> OrthoError {
    OrthoError::StitchFailed {
        status: StitchStatus::HomographyEstimationFailed,
        reason,
    }
}

/// A frame ready to be resampled onto the canvas.
struct Placed<'a> {
    frame: &'a Frame,
    /// Plane → frame pixel mapping.
    inverse: Homography,
    rows: Range<usize>,
    cols: Range<usize>,
}

/// Warp every frame onto the canvas by inverse mapping with bilinear
/// sampling. Overlaps are averaged, weighted by distance to the frame edge
/// when `feather` is set.
pub fn blend_frames(
    frames: &[Frame],
    transforms: &[Homography],
    canvas: &Canvas,
    feather: bool,
) -> Result<Vec<Array2<f32>>> {
    let channels = frames.first().map_or(0, Frame::channels);
    let mut placed = Vec::with_capacity(frames.len());
    for (idx, (frame, h)) in frames.iter().zip(transforms).enumerate() {
        let inverse = h
            .inverse()
            .ok_or_else(|| estimation_failed(format!("frame {idx} transform is singular")))?;
        let (rows, cols) = footprint(frame, h, canvas);
        placed.push(Placed {
            frame,
            inverse,
            rows,
            cols,
        });
    }

    let (h, w) = (canvas.height, canvas.width);
    debug!(width = w, height = h, frames = frames.len(), feather, "Blending canvas");

    let rows: Vec<Vec<Vec<f32>>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h)
            .into_par_iter()
            .map(|row| blend_row(row, canvas, &placed, channels, feather))
            .collect()
    } else {
        (0..h)
            .map(|row| blend_row(row, canvas, &placed, channels, feather))
            .collect()
    };

    let mut planes = vec![Array2::<f32>::zeros((h, w)); channels];
    for (row, values) in rows.into_iter().enumerate() {
        for (plane, channel_row) in planes.iter_mut().zip(values) {
            for (col, v) in channel_row.into_iter().enumerate() {
                plane[[row, col]] = v;
            }
        }
    }
    Ok(planes)
}

/// Canvas rows and columns touched by a warped frame.
fn footprint(frame: &Frame, h: &Homography, canvas: &Canvas) -> (Range<usize>, Range<usize>) {
    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in frame_corners(frame) {
        if let Some((px, py)) = h.apply(x, y) {
            x0 = x0.min(px - canvas.origin_x);
            y0 = y0.min(py - canvas.origin_y);
            x1 = x1.max(px - canvas.origin_x);
            y1 = y1.max(py - canvas.origin_y);
        }
    }
    let clamp = |v: f64, n: usize| v.clamp(0.0, n as f64) as usize;
    (
        clamp(y0.floor(), canvas.height)..clamp(y1.ceil(), canvas.height),
        clamp(x0.floor(), canvas.width)..clamp(x1.ceil(), canvas.width),
    )
}

fn blend_row(
    row: usize,
    canvas: &Canvas,
    placed: &[Placed<'_>],
    channels: usize,
    feather: bool,
) -> Vec<Vec<f32>> {
    let w = canvas.width;
    let mut acc = vec![vec![0.0f32; w]; channels];
    let mut weights = vec![0.0f32; w];

    for p in placed.iter().filter(|p| p.rows.contains(&row)) {
        let (fw, fh) = (p.frame.width() as f64, p.frame.height() as f64);
        for col in p.cols.clone() {
            let (px, py) = canvas.plane_point(col, row);
            let Some((sx, sy)) = p.inverse.apply(px, py) else {
                continue;
            };
            if sx < -0.5 || sy < -0.5 || sx >= fw - 0.5 || sy >= fh - 0.5 {
                continue;
            }
            let weight = if feather {
                let edge = (sx + 0.5).min(fw - 0.5 - sx).min(sy + 0.5).min(fh - 0.5 - sy);
                (edge as f32).max(1e-3)
            } else {
                1.0
            };
            for (c, plane) in p.frame.planes.iter().enumerate() {
                acc[c][col] += weight * sample_clamped(plane, sy, sx);
            }
            weights[col] += weight;
        }
    }

    for channel in acc.iter_mut() {
        for (v, &wt) in channel.iter_mut().zip(&weights) {
            if wt > 0.0 {
                *v /= wt;
            }
        }
    }
    acc
}

/// Bilinear interpolation with clamp-to-edge addressing.
fn sample_clamped(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();
    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    data[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
        + data[[y0, x1]] * fx * (1.0 - fy)
        + data[[y1, x0]] * (1.0 - fx) * fy
        + data[[y1, x1]] * fx * fy
}
