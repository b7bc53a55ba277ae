//! Frame ingestion sources.
//!
//! This module provides different sources for decoded frames:
//! - Synthetic `stub://` frames (testing, dry runs)
//! - Directories of extracted still images (feature: ingest-image-dir)
//! - Local video files (feature: ingest-file-ffmpeg)
//!
//! Every source yields frames numbered 0..N-1 in read order and reports the
//! video frame rate. Sources are local-only; URL schemes other than `stub://`
//! are rejected.
//!
//! The ingestion layer MUST NOT:
//! - Log raw frame content
//! - Retain frames beyond handoff to the detector

#[cfg(all(feature = "ingest-file-ffmpeg", feature = "ingest-image-dir"))]
pub mod extract;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-image-dir")]
pub(crate) mod frame_dir;
mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

#[cfg(all(feature = "ingest-file-ffmpeg", feature = "ingest-image-dir"))]
pub use extract::extract_frames;
pub use file::{FileSource, SourceConfig};
#[cfg(feature = "ingest-file-ffmpeg")]
pub use file_ffmpeg::probe_frame_rate;
pub use synthetic::SyntheticSource;

/// An ordered stream of decoded frames from one video.
pub trait FrameSource {
    /// Frames per second of the underlying video. May be zero or negative when
    /// the container reports nonsense; the record builder rejects that.
    fn frame_rate(&self) -> f64;

    /// Next frame in read order, `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_read: u64,
    pub frames_skipped: u64,
    pub path: String,
}

/// Value of `result`, or `None` once the failure is logged and counted in
/// `skipped`. Used for per-frame read errors that must not end the stream.
#[cfg_attr(
    not(any(feature = "ingest-file-ffmpeg", feature = "ingest-image-dir")),
    allow(dead_code)
)]
pub(crate) fn skip_unreadable<T, E: std::fmt::Display>(
    result: std::result::Result<T, E>,
    what: impl std::fmt::Display,
    skipped: &mut u64,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            *skipped += 1;
            log::warn!("skipping unreadable {}: {:#}", what, e);
            None
        }
    }
}

pub(crate) fn is_local_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
