//! Frames directory source.
//!
//! Reads `*.jpg` stills from a directory in file-name order. Frame indices
//! follow the sorted listing, so a file that fails to decode is logged and
//! skipped while the index still advances past it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{skip_unreadable, FrameSource, SourceStats};
use crate::frame::Frame;

pub(crate) struct FrameDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    fps: f64,
    position: usize,
    frames_read: u64,
    frames_skipped: u64,
}

impl FrameDirSource {
    pub(crate) fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let files = list_frame_files(&dir)?;
        if files.is_empty() {
            log::warn!("frames directory {} contains no .jpg files", dir.display());
        }
        Ok(Self {
            dir,
            files,
            fps,
            position: 0,
            frames_read: 0,
            frames_skipped: 0,
        })
    }
}

impl FrameSource for FrameDirSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(path) = self.files.get(self.position) {
            let index = self.position as u64;
            self.position += 1;
            let decoded = skip_unreadable(
                image::open(path),
                format_args!("frame {}", path.display()),
                &mut self.frames_skipped,
            );
            if let Some(img) = decoded {
                let rgb = img.to_rgb8();
                let (width, height) = rgb.dimensions();
                self.frames_read += 1;
                return Ok(Some(Frame::new(index, width, height, rgb.into_raw())?));
            }
        }
        Ok(None)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            frames_skipped: self.frames_skipped,
            path: self.dir.display().to_string(),
        }
    }
}

fn list_frame_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("frames directory {} does not exist", dir.display()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to list frames directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "jpg") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_frames_are_skipped_but_keep_their_index() {
        let dir = tempfile::tempdir().unwrap();
        let good = image::RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        good.save(dir.path().join("frame_0000.jpg")).unwrap();
        std::fs::write(dir.path().join("frame_0001.jpg"), b"not a jpeg").unwrap();
        good.save(dir.path().join("frame_0002.jpg")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut source = FrameDirSource::open(dir.path(), 25.0).unwrap();
        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 2);
        assert_eq!((second.width(), second.height()), (4, 3));
        assert!(source.next_frame().unwrap().is_none());

        let stats = source.stats();
        assert_eq!(stats.frames_read, 2);
        assert_eq!(stats.frames_skipped, 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(FrameDirSource::open("/definitely/not/here", 25.0).is_err());
    }
}
