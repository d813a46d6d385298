use std::path::{Path, PathBuf};

use crate::error::{OrthoError, Result};
use crate::frame::Frame;

use super::ffmpeg::FfmpegDecoder;
use super::ser::SerReader;

/// Extensions decoded through ffmpeg.
const FFMPEG_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "m4v"];

/// Sequential, blocking source of timestamped frames.
///
/// Each returned frame carries `metadata.timestamp_ms`, non-decreasing within
/// one decoder. `Ok(None)` marks end of stream.
pub trait VideoDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Walks a memory-mapped SER file frame by frame.
pub struct SerDecoder {
    reader: SerReader,
    path: PathBuf,
    next: usize,
}

impl SerDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: SerReader::open(path)?,
            path: path.to_path_buf(),
            next: 0,
        })
    }
}

impl VideoDecoder for SerDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.reader.frame_count() {
            return Ok(None);
        }
        let mut frame = self.reader.read_frame(self.next)?;
        frame.metadata.source = self.path.clone();
        self.next += 1;
        Ok(Some(frame))
    }
}

/// Already-decoded frames replayed in order.
pub struct FrameSequence<I> {
    frames: I,
}

impl<I: Iterator<Item = Frame>> FrameSequence<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I: Iterator<Item = Frame>> VideoDecoder for FrameSequence<I> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}

pub fn is_video_file(path: &Path) -> bool {
    match extension(path) {
        Some(ext) => ext == "ser" || FFMPEG_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Open a decoder appropriate for the file's extension.
pub fn open_video(path: &Path) -> Result<Box<dyn VideoDecoder>> {
    match extension(path).as_deref() {
        Some("ser") => Ok(Box::new(SerDecoder::open(path)?)),
        Some(ext) if FFMPEG_EXTENSIONS.contains(&ext) => Ok(Box::new(FfmpegDecoder::open(path)?)),
        _ => Err(OrthoError::Video(format!(
            "Unsupported video container: {}",
            path.display()
        ))),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
