use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::SCORING_BATCH_SIZE;
use crate::error::Result;
use crate::frame::Frame;
use crate::io::image_io::save_frame;
use crate::io::video::{is_video_file, open_video, VideoDecoder};
use crate::quality::sharpness;

use super::Selection;

/// Decides which decoded frames are due for capture.
///
/// The first frame is always due; after a capture at `t`, the next frame is
/// due once its timestamp reaches `t + interval`.
#[derive(Clone, Copy, Debug)]
pub struct SamplingClock {
    interval_ms: f64,
    last_capture_ms: f64,
}

impl SamplingClock {
    pub fn new(interval_ms: u64) -> Self {
        let interval_ms = interval_ms as f64;
        Self {
            interval_ms,
            last_capture_ms: -interval_ms,
        }
    }

    pub fn is_due(&self, timestamp_ms: f64) -> bool {
        timestamp_ms >= self.last_capture_ms + self.interval_ms
    }

    pub fn record_capture(&mut self, timestamp_ms: f64) {
        self.last_capture_ms = timestamp_ms;
    }
}

/// Pull every frame from `decoder`, keeping those that are due and sharper
/// than `blur_threshold`. A blurred candidate does not advance the clock, so
/// the next frame is a candidate again.
///
/// Candidates are scored in parallel batches; the kept frames and their
/// order are the same as a one-by-one pass.
pub fn sample_decoder(
    decoder: &mut dyn VideoDecoder,
    interval_ms: u64,
    blur_threshold: f64,
) -> Result<Vec<Frame>> {
    let mut clock = SamplingClock::new(interval_ms);
    let mut accepted = Vec::new();
    let mut batch: Vec<Frame> = Vec::with_capacity(SCORING_BATCH_SIZE);
    let mut decoded = 0usize;

    loop {
        let next = decoder.next_frame()?;
        let exhausted = next.is_none();
        if let Some(frame) = next {
            decoded += 1;
            // The clock never moves backwards, so a frame that is not due now
            // never will be.
            if clock.is_due(frame.metadata.timestamp_ms) {
                batch.push(frame);
            }
        }

        if batch.len() >= SCORING_BATCH_SIZE || (exhausted && !batch.is_empty()) {
            let scores: Vec<f64> = batch.par_iter().map(sharpness).collect();
            for (mut frame, score) in batch.drain(..).zip(scores) {
                let t = frame.metadata.timestamp_ms;
                if !clock.is_due(t) {
                    continue;
                }
                if score > blur_threshold {
                    frame.metadata.sharpness = Some(score);
                    clock.record_capture(t);
                    accepted.push(frame);
                } else {
                    debug!(timestamp_ms = t, score, blur_threshold, "Rejected blurred frame");
                }
            }
        }

        if exhausted {
            break;
        }
    }

    debug!(decoded, accepted = accepted.len(), "Video sampled");
    Ok(accepted)
}

/// File name used to persist a sampled frame.
pub fn frame_file_name(video: &Path, timestamp_ms: f64) -> String {
    let video_name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("frame_{video_name}_{}.jpg", timestamp_ms.trunc() as i64)
}

/// Video files in `dir`, sorted by name.
pub fn list_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_video_file(p))
        .collect();
    videos.sort();
    Ok(videos)
}

/// Sample every video in `video_dir` and persist the accepted frames to
/// `frames_dir` as JPEG. Frames come back ordered by source video name, then
/// by the timestamp embedded in their file name.
pub fn select_video_frames(
    video_dir: &Path,
    frames_dir: &Path,
    interval_ms: u64,
    blur_threshold: f64,
) -> Result<Selection> {
    let videos = match list_videos(video_dir) {
        Ok(v) => v,
        Err(e) => {
            warn!(dir = %video_dir.display(), error = %e, "Cannot read video directory");
            return Ok(Selection::stopped(format!(
                "cannot read video directory {}: {e}",
                video_dir.display()
            )));
        }
    };
    if videos.is_empty() {
        warn!(dir = %video_dir.display(), "No video files found");
        return Ok(Selection::stopped(format!(
            "no video files found in {}",
            video_dir.display()
        )));
    }

    info!(count = videos.len(), interval_ms, blur_threshold, "Extracting frames from videos");
    std::fs::create_dir_all(frames_dir)?;

    let mut tagged: Vec<(String, Frame)> = Vec::new();
    for video in &videos {
        let mut decoder = match open_video(video) {
            Ok(d) => d,
            Err(e) => {
                warn!(video = %video.display(), error = %e, "Skipping unreadable video");
                continue;
            }
        };
        let sampled = match sample_decoder(decoder.as_mut(), interval_ms, blur_threshold) {
            Ok(s) => s,
            Err(e) => {
                warn!(video = %video.display(), error = %e, "Video decoding failed, skipping");
                continue;
            }
        };

        let video_name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for mut frame in sampled {
            let path = frames_dir.join(frame_file_name(video, frame.metadata.timestamp_ms));
            save_frame(&frame, &path)?;
            frame.metadata.source = path;
            tagged.push((video_name.clone(), frame));
        }
        info!(video = %video.display(), total = tagged.len(), "Video processed");
    }

    // Numeric, so 10000 ms sorts after 5000 ms.
    tagged.sort_by(|(va, a), (vb, b)| {
        va.cmp(vb).then_with(|| {
            a.metadata
                .timestamp_ms
                .trunc()
                .total_cmp(&b.metadata.timestamp_ms.trunc())
        })
    });
    let frames: Vec<Frame> = tagged.into_iter().map(|(_, frame)| frame).collect();
    info!(count = frames.len(), "Extracted high-quality frames");
    if frames.is_empty() {
        return Ok(Selection::stopped(
            "no frame passed the sampling and blur filters".to_string(),
        ));
    }
    Ok(Selection::new(frames))
}
