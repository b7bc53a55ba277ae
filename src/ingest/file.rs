//! Local frame source selection.
//!
//! `FileSource` picks a backend from the configured path:
//! - `stub://...` produces synthetic frames
//! - an existing directory is read as extracted still images
//!   (requires the ingest-image-dir feature)
//! - anything else is decoded as a local video file
//!   (requires the ingest-file-ffmpeg feature)
//!
//! A frame-rate override, when present, replaces whatever the backend reports.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::VideoFileSource;
#[cfg(feature = "ingest-image-dir")]
use super::frame_dir::FrameDirSource;
use super::synthetic::SyntheticSource;
use super::{is_local_path, FrameSource, SourceStats};
use crate::frame::Frame;

const DEFAULT_SYNTHETIC_FPS: f64 = 30.0;
const DEFAULT_SYNTHETIC_FRAMES: u64 = 300;

/// Configuration for a local frame source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Video file, frames directory, or `stub://` name.
    pub path: String,
    /// Video whose container frame rate applies to a frames directory.
    pub probe_path: Option<String>,
    /// Replaces the frame rate reported by the backend.
    pub fps_override: Option<f64>,
    /// Number of frames a `stub://` source produces.
    pub synthetic_frames: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            probe_path: None,
            fps_override: None,
            synthetic_frames: DEFAULT_SYNTHETIC_FRAMES,
        }
    }
}

/// Local frame source.
pub struct FileSource {
    backend: FileBackend,
    fps_override: Option<f64>,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-image-dir")]
    FrameDir(FrameDirSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(VideoFileSource),
}

impl FileSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if !is_local_path(&config.path) {
            return Err(anyhow!(
                "frame ingestion only supports local paths (no URL schemes)"
            ));
        }
        let backend = if config.path.starts_with("stub://") {
            FileBackend::Synthetic(SyntheticSource::new(
                config.path.clone(),
                config.fps_override.unwrap_or(DEFAULT_SYNTHETIC_FPS),
                config.synthetic_frames,
            ))
        } else if std::path::Path::new(&config.path).is_dir() {
            Self::open_frame_dir(&config)?
        } else {
            Self::open_video(&config)?
        };
        log::info!("frame source opened: {}", config.path);
        Ok(Self {
            backend,
            fps_override: config.fps_override,
        })
    }

    #[cfg(feature = "ingest-image-dir")]
    fn open_frame_dir(config: &SourceConfig) -> Result<FileBackend> {
        let fps = match (config.fps_override, config.probe_path.as_deref()) {
            (Some(fps), _) => fps,
            (None, Some(video)) => probe_for_frame_dir(video)?,
            (None, None) => {
                return Err(anyhow!(
                    "frames directory {} needs a frame rate: set an fps override or a video to probe",
                    config.path
                ))
            }
        };
        Ok(FileBackend::FrameDir(FrameDirSource::open(&config.path, fps)?))
    }

    #[cfg(not(feature = "ingest-image-dir"))]
    fn open_frame_dir(_config: &SourceConfig) -> Result<FileBackend> {
        Err(anyhow!(
            "frames directory ingestion requires the ingest-image-dir feature"
        ))
    }

    #[cfg(feature = "ingest-file-ffmpeg")]
    fn open_video(config: &SourceConfig) -> Result<FileBackend> {
        Ok(FileBackend::Ffmpeg(VideoFileSource::open(&config.path)?))
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    fn open_video(_config: &SourceConfig) -> Result<FileBackend> {
        Err(anyhow!(
            "video file ingestion requires the ingest-file-ffmpeg feature"
        ))
    }

    fn inner(&self) -> &dyn FrameSource {
        match &self.backend {
            FileBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-image-dir")]
            FileBackend::FrameDir(source) => source,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FrameSource {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-image-dir")]
            FileBackend::FrameDir(source) => source,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source,
        }
    }
}

impl FrameSource for FileSource {
    fn frame_rate(&self) -> f64 {
        self.fps_override
            .unwrap_or_else(|| self.inner().frame_rate())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.inner_mut().next_frame()
    }

    fn stats(&self) -> SourceStats {
        self.inner().stats()
    }
}

#[cfg(all(feature = "ingest-image-dir", feature = "ingest-file-ffmpeg"))]
fn probe_for_frame_dir(video: &str) -> Result<f64> {
    super::file_ffmpeg::probe_frame_rate(video)
}

#[cfg(all(feature = "ingest-image-dir", not(feature = "ingest-file-ffmpeg")))]
fn probe_for_frame_dir(video: &str) -> Result<f64> {
    Err(anyhow!(
        "probing the frame rate of {} requires the ingest-file-ffmpeg feature; set an fps override",
        video
    ))
}
