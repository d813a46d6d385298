use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::consts::FALLBACK_FRAME_RATE;
use crate::error::{OrthoError, Result};
use crate::frame::{Frame, FrameMetadata};

use super::image_io::planes_from_interleaved;
use super::video::VideoDecoder;

/// Stream geometry reported by ffprobe.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: usize,
    pub height: usize,
    pub framerate: f64,
    pub codec: String,
}

/// Probe the first video stream of a file.
pub fn probe(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path)
        .output()
        .map_err(|e| OrthoError::Video(format!("Failed to execute ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(OrthoError::Video(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    parse_probe_output(&output.stdout)
}

/// Parse ffprobe's JSON output into a [`VideoInfo`].
pub fn parse_probe_output(json: &[u8]) -> Result<VideoInfo> {
    let json: serde_json::Value = serde_json::from_slice(json)
        .map_err(|e| OrthoError::Video(format!("Invalid ffprobe output: {e}")))?;

    let stream = json["streams"]
        .as_array()
        .and_then(|s| s.first())
        .ok_or_else(|| OrthoError::Video("No video stream found".into()))?;

    let width = stream["width"].as_u64().unwrap_or(0) as usize;
    let height = stream["height"].as_u64().unwrap_or(0) as usize;
    if width == 0 || height == 0 {
        return Err(OrthoError::InvalidDimensions {
            width: width as u32,
            height: height as u32,
        });
    }

    let framerate = stream["avg_frame_rate"]
        .as_str()
        .and_then(parse_framerate)
        .or_else(|| stream["r_frame_rate"].as_str().and_then(parse_framerate))
        .unwrap_or(FALLBACK_FRAME_RATE);

    let codec = stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    Ok(VideoInfo {
        width,
        height,
        framerate,
        codec,
    })
}

/// Presentation times of every video packet, in milliseconds from the first,
/// ascending. Reads packet headers only; nothing is decoded.
pub fn probe_timestamps(path: &Path) -> Result<Vec<f64>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-select_streams",
            "v:0",
            "-show_entries",
            "packet=pts_time",
        ])
        .arg(path)
        .output()
        .map_err(|e| OrthoError::Video(format!("Failed to execute ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(OrthoError::Video(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    parse_packet_times(&output.stdout)
}

/// Parse ffprobe's packet listing into sorted millisecond offsets. Packets
/// arrive in decode order, so B-frame streams need the sort.
pub fn parse_packet_times(json: &[u8]) -> Result<Vec<f64>> {
    let json: serde_json::Value = serde_json::from_slice(json)
        .map_err(|e| OrthoError::Video(format!("Invalid ffprobe output: {e}")))?;

    let mut times: Vec<f64> = json["packets"]
        .as_array()
        .map(|packets| {
            packets
                .iter()
                .filter_map(|p| p["pts_time"].as_str()?.parse::<f64>().ok())
                .filter(|t| t.is_finite())
                .collect()
        })
        .unwrap_or_default();
    times.sort_by(f64::total_cmp);

    if let Some(&first) = times.first() {
        for t in &mut times {
            *t = (*t - first) * 1000.0;
        }
    }
    Ok(times)
}

/// Parse "30000/1001" or "30" into frames per second. Zero rates are rejected.
pub fn parse_framerate(fps: &str) -> Option<f64> {
    let rate = match fps.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => fps.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Decodes a compressed video by piping raw RGB24 frames out of ffmpeg.
///
/// Frames keep their stored orientation (`-noautorotate`) so they match the
/// probed geometry. Each frame is stamped with its packet presentation time;
/// when those are unavailable, with `index / fps`.
pub struct FfmpegDecoder {
    path: PathBuf,
    info: VideoInfo,
    timestamps: Vec<f64>,
    child: Child,
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
    index: usize,
    finished: bool,
}

impl FfmpegDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe(path)?;
        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.framerate,
            codec = %info.codec,
            "Probed video"
        );
        let timestamps = probe_timestamps(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "No packet timestamps, using frame rate");
            Vec::new()
        });

        // One output frame per decoded frame, so frame i pairs with the i-th
        // presentation time.
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-noautorotate", "-i"])
            .arg(path)
            .args(["-fps_mode", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OrthoError::Video(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OrthoError::Video("ffmpeg stdout unavailable".into()))?;

        Ok(Self {
            path: path.to_path_buf(),
            buf: vec![0u8; info.width * info.height * 3],
            info,
            timestamps,
            child,
            stdout: BufReader::new(stdout),
            index: 0,
            finished: false,
        })
    }

    fn timestamp_ms(&self, index: usize) -> f64 {
        self.timestamps
            .get(index)
            .copied()
            .unwrap_or_else(|| index as f64 * 1000.0 / self.info.framerate)
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        match self.stdout.read_exact(&mut self.buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finished = true;
                let status = self.child.wait()?;
                if !status.success() {
                    warn!(path = %self.path.display(), %status, "ffmpeg exited with an error");
                }
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let planes = planes_from_interleaved(&self.buf, self.info.width, self.info.height, 3, 255.0)?;
        let timestamp_ms = self.timestamp_ms(self.index);
        self.index += 1;

        Ok(Some(Frame::new(planes, 8).with_metadata(FrameMetadata {
            timestamp_ms,
            source: self.path.clone(),
            ..Default::default()
        })))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
