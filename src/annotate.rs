//! Annotated frame output.
//!
//! Draws every detection box onto a copy of the frame and saves it as
//! `detected_frame_NNNN.jpg` in the output directory. A frame that cannot be
//! written is logged and counted; it never stops detection.
//!
//! Needs the ingest-image-dir feature. Without it the writer cannot be created.

use std::path::{Path, PathBuf};

use crate::detect::DetectedObject;
use crate::error::{Result, TimelineError};
use crate::frame::Frame;

#[cfg(feature = "ingest-image-dir")]
const BOX_THICKNESS: u32 = 2;

#[cfg(feature = "ingest-image-dir")]
const PALETTE: [[u8; 3]; 6] = [
    [255, 56, 56],
    [56, 255, 56],
    [56, 56, 255],
    [255, 178, 29],
    [207, 210, 49],
    [255, 55, 199],
];

/// File an annotated frame is written to.
pub fn annotated_frame_path(output_dir: &Path, frame_index: u64) -> PathBuf {
    output_dir.join(format!("detected_frame_{:04}.jpg", frame_index))
}

pub struct AnnotatedFrameWriter {
    #[cfg_attr(not(feature = "ingest-image-dir"), allow(dead_code))]
    output_dir: PathBuf,
    written: u64,
    failed: u64,
}

impl AnnotatedFrameWriter {
    /// Creates `output_dir` when absent.
    #[cfg(feature = "ingest-image-dir")]
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            written: 0,
            failed: 0,
        })
    }

    #[cfg(not(feature = "ingest-image-dir"))]
    pub fn new(_output_dir: impl Into<PathBuf>) -> Result<Self> {
        Err(TimelineError::Configuration(
            "annotated frames require the ingest-image-dir feature".to_string(),
        ))
    }

    /// Write one annotated frame, logging instead of failing.
    pub fn write(&mut self, frame: &Frame, objects: &[DetectedObject]) {
        match self.try_write(frame, objects) {
            Ok(path) => {
                self.written += 1;
                log::debug!("annotated frame written to {}", path.display());
            }
            Err(e) => {
                self.failed += 1;
                log::warn!("could not write annotated frame {}: {}", frame.index(), e);
            }
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    #[cfg(feature = "ingest-image-dir")]
    fn try_write(&self, frame: &Frame, objects: &[DetectedObject]) -> Result<PathBuf> {
        let image = draw_detections(frame, objects)?;
        let path = annotated_frame_path(&self.output_dir, frame.index());
        image
            .save(&path)
            .map_err(|e| TimelineError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(path)
    }

    #[cfg(not(feature = "ingest-image-dir"))]
    fn try_write(&self, _frame: &Frame, _objects: &[DetectedObject]) -> Result<PathBuf> {
        Err(TimelineError::Configuration(
            "annotated frames require the ingest-image-dir feature".to_string(),
        ))
    }
}

/// Copy of `frame` with a hollow box per detection, coloured by class.
#[cfg(feature = "ingest-image-dir")]
pub fn draw_detections(frame: &Frame, objects: &[DetectedObject]) -> Result<image::RgbImage> {
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    let mut image =
        image::RgbImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
            .ok_or_else(|| {
                TimelineError::Frame(format!(
                    "frame {} does not match its dimensions",
                    frame.index()
                ))
            })?;
    if frame.width() == 0 || frame.height() == 0 {
        return Ok(image);
    }

    let max_x = f64::from(frame.width() - 1);
    let max_y = f64::from(frame.height() - 1);
    for object in objects {
        let b = object.bbox;
        let left = b.x0.min(b.x1).clamp(0.0, max_x) as u32;
        let right = b.x0.max(b.x1).clamp(0.0, max_x) as u32;
        let top = b.y0.min(b.y1).clamp(0.0, max_y) as u32;
        let bottom = b.y0.max(b.y1).clamp(0.0, max_y) as u32;
        let color = image::Rgb(class_color(&object.class_name));

        for t in 0..BOX_THICKNESS {
            let width = (right - left + 1).saturating_sub(2 * t);
            let height = (bottom - top + 1).saturating_sub(2 * t);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at((left + t) as i32, (top + t) as i32).of_size(width, height);
            draw_hollow_rect_mut(&mut image, rect, color);
        }
    }
    Ok(image)
}

#[cfg(feature = "ingest-image-dir")]
fn class_color(class_name: &str) -> [u8; 3] {
    let slot = class_name
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[slot % PALETTE.len()]
}
