use std::path::Path;

use image::{ColorType, GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;
use num_traits::ToPrimitive;

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::error::{OrthoError, Result};
use crate::frame::{Frame, FrameMetadata};

/// Load an image file into a Frame, keeping RGB as three planes and
/// everything else as one grayscale plane.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let sixteen_bit = matches!(
        img.color(),
        ColorType::L16
            | ColorType::La16
            | ColorType::Rgb16
            | ColorType::Rgba16
            | ColorType::Rgb32F
            | ColorType::Rgba32F
    );

    let planes = match (img.color().has_color(), sixteen_bit) {
        (true, true) => planes_from_interleaved(img.to_rgb16().as_raw(), w, h, 3, 65535.0)?,
        (true, false) => planes_from_interleaved(img.to_rgb8().as_raw(), w, h, 3, 255.0)?,
        (false, true) => planes_from_interleaved(img.to_luma16().as_raw(), w, h, 1, 65535.0)?,
        (false, false) => planes_from_interleaved(img.to_luma8().as_raw(), w, h, 1, 255.0)?,
    };

    let bit_depth = if sixteen_bit { 16 } else { 8 };
    Ok(Frame::new(planes, bit_depth).with_metadata(FrameMetadata {
        source: path.to_path_buf(),
        ..Default::default()
    }))
}

/// Split interleaved samples into per-channel planes normalised by `max_val`.
pub fn planes_from_interleaved<T: ToPrimitive + Copy>(
    raw: &[T],
    width: usize,
    height: usize,
    channels: usize,
    max_val: f32,
) -> Result<Vec<Array2<f32>>> {
    if raw.len() != width * height * channels {
        return Err(OrthoError::UnsupportedRaster(format!(
            "expected {} samples for {width}x{height}x{channels}, got {}",
            width * height * channels,
            raw.len()
        )));
    }

    let mut planes = vec![Array2::<f32>::zeros((height, width)); channels];
    for row in 0..height {
        for col in 0..width {
            let base = (row * width + col) * channels;
            for (ch, plane) in planes.iter_mut().enumerate() {
                let v = raw[base + ch].to_f32().unwrap_or(0.0);
                plane[[row, col]] = v / max_val;
            }
        }
    }
    Ok(planes)
}

/// Save a frame as 8-bit image, format chosen from the file extension.
/// RGB frames stay RGB; anything else is written as grayscale.
pub fn save_frame(frame: &Frame, path: &Path) -> Result<()> {
    let h = frame.height();
    let w = frame.width();

    if frame.channels() == COLOR_CHANNEL_COUNT {
        let mut img = RgbImage::new(w as u32, h as u32);
        for row in 0..h {
            for col in 0..w {
                let px = [0, 1, 2].map(|ch| to_u8(frame.planes[ch][[row, col]]));
                img.put_pixel(col as u32, row as u32, Rgb(px));
            }
        }
        img.save(path)?;
    } else {
        let gray = frame.luminance();
        let mut img = GrayImage::new(w as u32, h as u32);
        for row in 0..h {
            for col in 0..w {
                img.put_pixel(col as u32, row as u32, Luma([to_u8(gray[[row, col]])]));
            }
        }
        img.save(path)?;
    }
    Ok(())
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
