use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;

/// Translation of a target frame relative to a reference frame: target pixel
/// (x, y) shows the same ground as reference pixel (x + dx, y + dy).
#[derive(Clone, Debug, PartialEq)]
pub struct PairMatch {
    pub reference: usize,
    pub target: usize,
    pub dx: f64,
    pub dy: f64,
    /// Height of the phase-correlation peak, in [0, 1].
    pub confidence: f64,
    /// Normalised cross-correlation over the overlap at the chosen shift.
    pub ncc: f64,
    /// Overlap area as a fraction of the smaller frame.
    pub overlap: f64,
}

/// Grayscale frame prepared for registration: zero-mean, zero-padded to the
/// shared FFT size, Hann-windowed and transformed.
pub struct Spectrum {
    gray: Array2<f32>,
    fft: Array2<Complex<f64>>,
}

impl Spectrum {
    pub fn new(gray: &Array2<f32>, fft_h: usize, fft_w: usize) -> Self {
        let (h, w) = gray.dim();
        let mean = if gray.is_empty() {
            0.0
        } else {
            gray.iter().map(|&v| v as f64).sum::<f64>() / gray.len() as f64
        };

        let mut padded = Array2::<f64>::zeros((fft_h, fft_w));
        for row in 0..h.min(fft_h) {
            let wy = hann(row, fft_h);
            for col in 0..w.min(fft_w) {
                padded[[row, col]] = (gray[[row, col]] as f64 - mean) * wy * hann(col, fft_w);
            }
        }

        Self {
            gray: gray.clone(),
            fft: fft2d(&padded),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.gray.dim()
    }
}

/// Integer downscale factor that brings the largest of `dims` to at most
/// `megapixels`, capped so no frame shrinks below one pixel. A non-positive
/// budget keeps full resolution.
pub fn registration_factor(dims: &[(usize, usize)], megapixels: f64) -> usize {
    let largest = dims.iter().map(|&(h, w)| h * w).max().unwrap_or(0);
    let smallest_side = dims.iter().map(|&(h, w)| h.min(w)).min().unwrap_or(1).max(1);
    if megapixels <= 0.0 || largest == 0 {
        return 1;
    }
    let budget = megapixels * 1e6;
    let factor = (largest as f64 / budget).sqrt().ceil().max(1.0) as usize;
    factor.min(smallest_side)
}

/// Average `factor`×`factor` blocks. Trailing rows and columns that do not
/// fill a block are dropped, so shifts scale by exactly `factor`.
pub fn downscale_area(data: &Array2<f32>, factor: usize) -> Array2<f32> {
    if factor <= 1 {
        return data.clone();
    }
    let (h, w) = data.dim();
    let (new_h, new_w) = ((h / factor).max(1), (w / factor).max(1));
    let norm = 1.0 / (factor * factor) as f32;
    Array2::from_shape_fn((new_h, new_w), |(r, c)| {
        let block = data.slice(ndarray::s![
            r * factor..((r + 1) * factor).min(h),
            c * factor..((c + 1) * factor).min(w)
        ]);
        block.sum() * norm
    })
}

fn hann(i: usize, n: usize) -> f64 {
    0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / n as f64).cos())
}

/// Register every requested pair in parallel. Results keep the order of `pairs`.
pub fn register_pairs(spectra: &[Spectrum], pairs: &[(usize, usize)]) -> Vec<PairMatch> {
    pairs
        .par_iter()
        .map(|&(i, j)| register(&spectra[i], &spectra[j], i, j))
        .collect()
}

/// Estimate the translation of `target` relative to `reference`.
pub fn register(reference: &Spectrum, target: &Spectrum, ref_idx: usize, tgt_idx: usize) -> PairMatch {
    let (fh, fw) = reference.fft.dim();
    let cross_power = normalized_cross_power(&reference.fft, &target.fft);
    let correlation = ifft2d(&cross_power);
    let (peak_row, peak_col, peak) = find_peak(&correlation);
    let (sub_dy, sub_dx) = refine_peak(&correlation, peak_row, peak_col);

    // The correlation surface is periodic: the peak at p stands for a shift
    // of p or p - N. Keep the candidate whose overlap agrees best.
    let (rh, rw) = reference.dim();
    let (th, tw) = target.dim();
    let mut best: Option<(f64, f64, f64, f64)> = None;
    for dy in wrap_candidates(peak_row, fh) {
        for dx in wrap_candidates(peak_col, fw) {
            let overlap = overlap_fraction(dx, dy, (rh, rw), (th, tw));
            if overlap <= 0.0 {
                continue;
            }
            let ncc = overlap_ncc(&reference.gray, &target.gray, dx, dy);
            if best.map_or(true, |(_, _, best_ncc, _)| ncc > best_ncc) {
                best = Some((dx, dy, ncc, overlap));
            }
        }
    }

    match best {
        Some((dx, dy, ncc, overlap)) => PairMatch {
            reference: ref_idx,
            target: tgt_idx,
            dx: dx + sub_dx,
            dy: dy + sub_dy,
            confidence: peak.clamp(0.0, 1.0),
            ncc,
            overlap,
        },
        None => PairMatch {
            reference: ref_idx,
            target: tgt_idx,
            dx: 0.0,
            dy: 0.0,
            confidence: 0.0,
            ncc: 0.0,
            overlap: 0.0,
        },
    }
}

fn wrap_candidates(peak: usize, n: usize) -> [f64; 2] {
    let p = peak as f64;
    [p, p - n as f64]
}

/// Overlap of the two frames' footprints at integer shift (dx, dy), as a
/// fraction of the smaller footprint.
pub fn overlap_fraction(dx: f64, dy: f64, reference: (usize, usize), target: (usize, usize)) -> f64 {
    let (rh, rw) = (reference.0 as f64, reference.1 as f64);
    let (th, tw) = (target.0 as f64, target.1 as f64);
    let ow = (rw.min(dx + tw) - dx.max(0.0)).max(0.0);
    let oh = (rh.min(dy + th) - dy.max(0.0)).max(0.0);
    let smaller = (rh * rw).min(th * tw);
    if smaller <= 0.0 {
        0.0
    } else {
        ow * oh / smaller
    }
}

/// Normalised cross-correlation of the overlapping pixels at an integer
/// shift, sampling at most ~64k pixels.
fn overlap_ncc(reference: &Array2<f32>, target: &Array2<f32>, dx: f64, dy: f64) -> f64 {
    let (rh, rw) = reference.dim();
    let (th, tw) = target.dim();
    let (dx, dy) = (dx.round() as i64, dy.round() as i64);

    let col0 = dx.max(0);
    let col1 = (rw as i64).min(dx + tw as i64);
    let row0 = dy.max(0);
    let row1 = (rh as i64).min(dy + th as i64);
    if col1 <= col0 || row1 <= row0 {
        return f64::NEG_INFINITY;
    }

    let area = ((col1 - col0) * (row1 - row0)) as f64;
    let step = ((area / 65_536.0).sqrt().ceil() as usize).max(1);

    let (mut n, mut sr, mut st, mut srr, mut stt, mut srt) = (0.0f64, 0.0, 0.0, 0.0, 0.0, 0.0);
    for row in (row0..row1).step_by(step) {
        for col in (col0..col1).step_by(step) {
            let r = reference[[row as usize, col as usize]] as f64;
            let t = target[[(row - dy) as usize, (col - dx) as usize]] as f64;
            n += 1.0;
            sr += r;
            st += t;
            srr += r * r;
            stt += t * t;
            srt += r * t;
        }
    }

    let cov = srt / n - (sr / n) * (st / n);
    let var_r = srr / n - (sr / n).powi(2);
    let var_t = stt / n - (st / n).powi(2);
    let denom = (var_r * var_t).sqrt();
    if denom <= 1e-12 {
        0.0
    } else {
        cov / denom
    }
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v, 0.0));

    for mut row in result.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        fft_row.process(&mut buf);
        row.assign(&ndarray::ArrayView1::from(&buf));
    }
    for mut col in result.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        fft_col.process(&mut buf);
        col.assign(&ndarray::ArrayView1::from(&buf));
    }

    result
}

/// Inverse 2D FFT, real part, normalised by the element count.
fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    for mut col in work.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        ifft_col.process(&mut buf);
        col.assign(&ndarray::ArrayView1::from(&buf));
    }
    for mut row in work.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        ifft_row.process(&mut buf);
        row.assign(&ndarray::ArrayView1::from(&buf));
    }

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = Array2::<Complex<f64>>::zeros(ref_fft.dim());
    ndarray::Zip::from(&mut result)
        .and(ref_fft)
        .and(tgt_fft)
        .for_each(|out, &r, &t| {
            let cross = r * t.conj();
            let mag = cross.norm();
            *out = if mag > 1e-12 {
                cross / mag
            } else {
                Complex::new(0.0, 0.0)
            };
        });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for ((row, col), &v) in data.indexed_iter() {
        if v > best.2 {
            best = (row, col, v);
        }
    }
    best
}

/// Sub-pixel peak offset from 1D parabola fits through the peak's
/// neighbours, wrapping around the periodic surface.
fn refine_peak(correlation: &Array2<f64>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (h, w) = correlation.dim();
    if h < 3 || w < 3 {
        return (0.0, 0.0);
    }
    let centre = correlation[[peak_row, peak_col]];
    let up = correlation[[(peak_row + h - 1) % h, peak_col]];
    let down = correlation[[(peak_row + 1) % h, peak_col]];
    let left = correlation[[peak_row, (peak_col + w - 1) % w]];
    let right = correlation[[peak_row, (peak_col + 1) % w]];

    (parabola_vertex(up, centre, down), parabola_vertex(left, centre, right))
}

fn parabola_vertex(prev: f64, curr: f64, next: f64) -> f64 {
    let denom = prev - 2.0 * curr + next;
    if denom.abs() > 1e-12 {
        ((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_fraction_of_offset_frames() {
        let f = overlap_fraction(100.0, 0.0, (480, 640), (480, 640));
        assert!((f - 540.0 / 640.0).abs() < 1e-12);
        assert_eq!(overlap_fraction(700.0, 0.0, (480, 640), (480, 640)), 0.0);
    }

    #[test]
    fn registration_factor_meets_budget() {
        assert_eq!(registration_factor(&[(480, 640)], 0.6), 1);
        assert_eq!(registration_factor(&[(1080, 1920)], 0.6), 2);
        assert_eq!(registration_factor(&[(2160, 3840)], 0.6), 4);
        assert_eq!(registration_factor(&[(2160, 3840)], 0.0), 1);
        assert_eq!(registration_factor(&[(2160, 3840), (3, 3)], 0.6), 3);
    }

    #[test]
    fn downscale_averages_blocks() {
        let data = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f32);
        let small = downscale_area(&data, 2);
        assert_eq!(small.dim(), (2, 2));
        assert_eq!(small[[0, 0]], (0.0 + 1.0 + 5.0 + 6.0) / 4.0);
        assert_eq!(small[[1, 1]], (12.0 + 13.0 + 17.0 + 18.0) / 4.0);
    }

    #[test]
    fn parabola_vertex_is_clamped() {
        assert_eq!(parabola_vertex(1.0, 1.0, 1.0), 0.0);
        assert!(parabola_vertex(0.5, 1.0, 0.9) > 0.0);
    }
}
