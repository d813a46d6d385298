#![allow(dead_code)]

use std::path::Path;

use ndarray::{s, Array2};
use ortho_core::frame::Frame;
use ortho_core::io::ser::SER_HEADER_SIZE;

fn hash(x: i64, y: i64, seed: u64) -> f32 {
    let mut z = (x as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ seed.wrapping_mul(0x1656_67B1_9E37_79F9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1u64 << 24) as f32
}

fn value_noise(x: usize, y: usize, cell: usize, seed: u64) -> f32 {
    let (gx, gy) = ((x / cell) as i64, (y / cell) as i64);
    let fx = (x % cell) as f32 / cell as f32;
    let fy = (y % cell) as f32 / cell as f32;
    let top = hash(gx, gy, seed) * (1.0 - fx) + hash(gx + 1, gy, seed) * fx;
    let bottom = hash(gx, gy + 1, seed) * (1.0 - fx) + hash(gx + 1, gy + 1, seed) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Deterministic textured ground: coarse and fine value noise plus per-pixel
/// grain, kept within [0.1, 0.9] so no pixel reads as black padding.
pub fn textured_scene(height: usize, width: usize, seed: u64) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(y, x)| {
        let coarse = value_noise(x, y, 32, seed);
        let mid = value_noise(x, y, 8, seed ^ 0x55);
        let grain = hash(x as i64, y as i64, seed ^ 0xAA);
        0.1 + 0.8 * (0.4 * coarse + 0.35 * mid + 0.25 * grain)
    })
}

/// Cut a mono 8-bit frame out of a scene.
pub fn view(scene: &Array2<f32>, top: usize, left: usize, height: usize, width: usize) -> Frame {
    Frame::mono(
        scene
            .slice(s![top..top + height, left..left + width])
            .to_owned(),
        8,
    )
}

/// Cut an RGB frame out of a scene; channels are scaled copies of the scene.
pub fn view_rgb(
    scene: &Array2<f32>,
    top: usize,
    left: usize,
    height: usize,
    width: usize,
) -> Frame {
    let base = scene
        .slice(s![top..top + height, left..left + width])
        .to_owned();
    Frame::new(
        vec![base.clone(), base.mapv(|v| v * 0.8), base.mapv(|v| v * 0.6)],
        8,
    )
}

/// Frame with no high-frequency content at all.
pub fn flat_frame(height: usize, width: usize, timestamp_ms: f64) -> Frame {
    let mut frame = Frame::mono(Array2::from_elem((height, width), 0.5), 8);
    frame.metadata.timestamp_ms = timestamp_ms;
    frame
}

/// Sharp textured frame carrying a timestamp.
pub fn sharp_frame(height: usize, width: usize, timestamp_ms: f64) -> Frame {
    let mut frame = Frame::mono(textured_scene(height, width, 7), 8);
    frame.metadata.timestamp_ms = timestamp_ms;
    frame
}

/// Save a plane as an 8-bit grayscale PNG.
pub fn write_gray_png(path: &Path, data: &Array2<f32>) {
    let (h, w) = data.dim();
    let pixels: Vec<u8> = data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let img = image::GrayImage::from_raw(w as u32, h as u32, pixels).expect("buffer size");
    img.save(path).expect("write png");
}

/// Write a flight log CSV with the standard header.
pub fn write_flight_log(path: &Path, rows: &[(f64, f64, f64)]) {
    let mut text = String::from("timestamp_ms,latitude,longitude\n");
    for (t, lat, lon) in rows {
        text.push_str(&format!("{t},{lat},{lon}\n"));
    }
    std::fs::write(path, text).expect("write flight log");
}

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID (4 bytes)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID (4 bytes)
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (little-endian per Siril convention)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // Width
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    // Height
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    // PixelDepth
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    // FrameCount
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC (8 bytes each)
    buf.extend_from_slice(&[0u8; 16]);

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Mono 8-bit SER with a timestamp trailer; `timestamps_ms` are written as
/// 100 ns ticks.
pub fn build_ser_with_timestamps(
    width: u32,
    height: u32,
    frames: &[Array2<f32>],
    timestamps_ms: &[u64],
) -> Vec<u8> {
    let mut buf = build_ser_header_full(width, height, 8, frames.len(), 0);
    for frame in frames {
        buf.extend(frame.iter().map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8));
    }
    for ts in timestamps_ms {
        buf.extend_from_slice(&(ts * 10_000).to_le_bytes());
    }
    buf
}
