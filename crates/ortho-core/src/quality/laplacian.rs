use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::SHARPNESS_INTENSITY_SCALE;
use crate::frame::Frame;

/// Compute Laplacian variance of an array. Higher means sharper.
///
/// Convolves with the 3x3 Laplacian kernel:
///   0  1  0
///   1 -4  1
///   0  1  0
/// Then returns the variance of the result over every pixel. Neighbours past
/// the edge are mirrored without repeating the edge pixel (`dcb|abcd|cba`).
pub fn laplacian_variance_array(data: &Array2<f32>) -> f64 {
    let (h, w) = data.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let count = (h * w) as f64;

    for row in 0..h {
        let up = reflect101(row as isize - 1, h);
        let down = reflect101(row as isize + 1, h);
        for col in 0..w {
            let left = reflect101(col as isize - 1, w);
            let right = reflect101(col as isize + 1, w);
            let lap = -4.0 * data[[row, col]] as f64
                + data[[up, col]] as f64
                + data[[down, col]] as f64
                + data[[row, left]] as f64
                + data[[row, right]] as f64;
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

fn reflect101(i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let i = if i < 0 { -i } else { i };
    let i = if i >= n { 2 * n - 2 - i } else { i };
    i as usize
}

/// Sharpness of a frame: Laplacian variance of its luminance on the 8-bit
/// intensity scale, so blur thresholds are independent of source bit depth.
pub fn sharpness(frame: &Frame) -> f64 {
    laplacian_variance_array(&frame.luminance()) * SHARPNESS_INTENSITY_SCALE.powi(2)
}

/// Score frames in parallel. Scores come back in input order.
pub fn score_frames(frames: &[Frame]) -> Vec<f64> {
    frames.par_iter().map(sharpness).collect()
}

/// Score all frames and return (index, score) sorted by sharpness descending.
pub fn rank_frames(frames: &[Frame]) -> Vec<(usize, f64)> {
    let mut scores: Vec<(usize, f64)> = score_frames(frames).into_iter().enumerate().collect();
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores
}
