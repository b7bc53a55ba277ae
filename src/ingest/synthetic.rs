use anyhow::Result;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

/// Deterministic synthetic frames for `stub://` paths.
///
/// The scene changes every 25 frames so hash-driven stub detectors see
/// varied content.
pub struct SyntheticSource {
    path: String,
    fps: f64,
    total_frames: u64,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(path: impl Into<String>, fps: f64, total_frames: u64) -> Self {
        Self {
            path: path.into(),
            fps,
            total_frames,
            frame_count: 0,
        }
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let scene = self.frame_count / 25;
        let pixel_count = (WIDTH * HEIGHT * 3) as usize;
        (0..pixel_count)
            .map(|i| ((i as u64 + self.frame_count * 7 + scene * 31) % 256) as u8)
            .collect()
    }
}

impl FrameSource for SyntheticSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.total_frames {
            return Ok(None);
        }
        let pixels = self.generate_pixels();
        let frame = Frame::new(self.frame_count, WIDTH, HEIGHT, pixels)?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            frames_skipped: 0,
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_numbered_frames_then_ends() {
        let mut source = SyntheticSource::new("stub://test", 10.0, 3);
        let indices: Vec<u64> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|frame| frame.index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.stats().frames_read, 3);
        assert_eq!(source.frame_rate(), 10.0);
    }
}
