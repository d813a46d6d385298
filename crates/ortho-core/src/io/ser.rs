use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::FALLBACK_FRAME_RATE;
use crate::error::{OrthoError, Result};
use crate::frame::{Frame, FrameMetadata};

pub const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER timestamps count 100 ns ticks.
const TICKS_PER_MS: f64 = 10_000.0;

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
}

impl SerHeader {
    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 {
            1
        } else {
            2
        }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    fn is_bgr(&self) -> bool {
        self.color_id == 101
    }

    /// Total bytes per frame, or `None` when the header describes a frame
    /// larger than the address space.
    pub fn frame_byte_size(&self) -> Option<usize> {
        let pixels = (self.width as usize).checked_mul(self.height as usize)?;
        pixels.checked_mul(self.bytes_per_pixel_plane() * self.planes_per_pixel())
    }
}

/// Memory-mapped SER video reader.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
    frame_size: usize,
    data_size: usize,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and lives as long as the reader.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(OrthoError::InvalidSer("File too small for SER header".into()));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(OrthoError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;

        let frame_size = header.frame_byte_size().ok_or_else(|| {
            OrthoError::InvalidSer(format!(
                "Frame size overflows: {}x{} at {} bits",
                header.width, header.height, header.pixel_depth
            ))
        })?;
        let data_size = frame_size
            .checked_mul(header.frame_count as usize)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| {
                OrthoError::InvalidSer(format!(
                    "Data size overflows: {} frames of {frame_size} bytes",
                    header.frame_count
                ))
            })?;
        if mmap.len() < data_size {
            return Err(OrthoError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                data_size,
                mmap.len()
            )));
        }

        Ok(Self {
            mmap,
            header,
            frame_size,
            data_size,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    fn frame_raw(&self, index: usize) -> &[u8] {
        let offset = SER_HEADER_SIZE + index * self.frame_size;
        &self.mmap[offset..offset + self.frame_size]
    }

    /// Read a single frame, converting to f32 planes in [0.0, 1.0].
    /// RGB/BGR data is returned as R, G, B planes; mono and Bayer data as one plane.
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        if index >= self.frame_count() {
            return Err(OrthoError::Video(format!(
                "SER frame {index} out of range (total: {})",
                self.frame_count()
            )));
        }
        let raw = self.frame_raw(index);
        let h = self.header.height as usize;
        let w = self.header.width as usize;
        let planes = self.header.planes_per_pixel();

        let mut decoded: Vec<Array2<f32>> = (0..planes)
            .map(|plane| decode_plane(raw, h, w, planes, plane, &self.header))
            .collect();
        if self.header.is_bgr() {
            decoded.reverse();
        }

        let bit_depth = (self.header.bytes_per_pixel_plane() * 8) as u8;
        Ok(Frame::new(decoded, bit_depth).with_metadata(FrameMetadata {
            timestamp_ms: self.timestamp_ms(index),
            ..Default::default()
        }))
    }

    /// Milliseconds since the first frame, from the trailer when present,
    /// else derived from the frame index.
    pub fn timestamp_ms(&self, index: usize) -> f64 {
        match (self.read_timestamp(0), self.read_timestamp(index)) {
            (Some(first), Some(ts)) if ts >= first => (ts - first) as f64 / TICKS_PER_MS,
            _ => index as f64 * 1000.0 / FALLBACK_FRAME_RATE,
        }
    }

    /// Read per-frame timestamp from the optional trailer.
    fn read_timestamp(&self, index: usize) -> Option<u64> {
        let ts_offset = self.data_size.checked_add(index.checked_mul(8)?)?;
        if ts_offset.checked_add(8)? <= self.mmap.len() {
            let bytes = &self.mmap[ts_offset..ts_offset + 8];
            Some(u64::from_le_bytes(bytes.try_into().ok()?))
        } else {
            None
        }
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    if width == 0 || height == 0 {
        return Err(OrthoError::InvalidDimensions { width, height });
    }
    if pixel_depth == 0 || pixel_depth > 16 {
        return Err(OrthoError::InvalidSer(format!(
            "Unsupported pixel depth {pixel_depth}"
        )));
    }

    // Many writers store 0 here for little-endian data; follow Siril and
    // treat only 1 as big-endian.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
    })
}

fn decode_plane(
    raw: &[u8],
    height: usize,
    width: usize,
    planes: usize,
    plane_index: usize,
    header: &SerHeader,
) -> Array2<f32> {
    let bytes_per_sample = header.bytes_per_pixel_plane();
    let max_val = ((1u32 << header.pixel_depth) - 1) as f32;
    let mut data = Array2::<f32>::zeros((height, width));

    for row in 0..height {
        for col in 0..width {
            let idx = ((row * width + col) * planes + plane_index) * bytes_per_sample;
            let val = if bytes_per_sample == 1 {
                raw[idx] as f32
            } else {
                let pair = [raw[idx], raw[idx + 1]];
                if header.little_endian {
                    u16::from_le_bytes(pair) as f32
                } else {
                    u16::from_be_bytes(pair) as f32
                }
            };
            data[[row, col]] = val / max_val;
        }
    }

    data
}
