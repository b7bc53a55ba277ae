//! Video → still image extraction.
//!
//! Writes every decoded frame of a video as `frame_NNNN.jpg` into a frames
//! directory, creating it when absent. The frames directory source reads
//! these back in the same order.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use super::file_ffmpeg::VideoFileSource;
use super::FrameSource;

/// Extract all frames of `video` into `frames_dir`. Returns the frame count.
pub fn extract_frames(video: &str, frames_dir: impl AsRef<Path>) -> Result<u64> {
    let frames_dir = frames_dir.as_ref();
    std::fs::create_dir_all(frames_dir)
        .with_context(|| format!("failed to create frames directory {}", frames_dir.display()))?;

    let mut source = VideoFileSource::open(video)?;
    let mut written = 0u64;
    while let Some(frame) = source.next_frame()? {
        let image =
            image::RgbImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
                .ok_or_else(|| anyhow!("frame {} has inconsistent dimensions", frame.index()))?;
        let path = frames_dir.join(format!("frame_{:04}.jpg", frame.index()));
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written += 1;
        log::debug!("wrote {}", path.display());
    }

    log::info!("extracted {} frames to {}", written, frames_dir.display());
    Ok(written)
}
