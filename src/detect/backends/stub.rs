use std::collections::HashMap;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::COCO_CLASSES;
use crate::detect::result::{BoundingBox, DetectedObject};
use crate::frame::Frame;

const BIRD_CLASS_ID: usize = 14;

/// Stub backend for testing and dry runs.
///
/// Without a script, detections are derived from a hash of the frame pixels:
/// identical frames always yield identical detections, most of them "bird".
/// With a script, frames listed in it return exactly the scripted objects and
/// all other frames return nothing.
#[derive(Default)]
pub struct StubBackend {
    script: Option<HashMap<u64, Vec<DetectedObject>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay fixed detections keyed by frame index.
    pub fn scripted(script: HashMap<u64, Vec<DetectedObject>>) -> Self {
        Self {
            script: Some(script),
        }
    }

    fn hashed_detections(frame: &Frame) -> Vec<DetectedObject> {
        let digest: [u8; 32] = Sha256::digest(frame.pixels()).into();
        let count = (digest[0] % 4) as usize;
        let width = frame.width() as f64;
        let height = frame.height() as f64;

        (0..count)
            .map(|i| {
                let bytes = &digest[1 + i * 7..8 + i * 7];
                let class_id = if bytes[0] % 4 == 0 {
                    bytes[1] as usize % COCO_CLASSES.len()
                } else {
                    BIRD_CLASS_ID
                };
                let x0 = width * f64::from(bytes[2]) / 512.0;
                let y0 = height * f64::from(bytes[3]) / 512.0;
                let w = width * (0.05 + f64::from(bytes[4]) / 1024.0);
                let h = height * (0.05 + f64::from(bytes[5]) / 1024.0);
                let confidence = 0.25 + 0.75 * f32::from(bytes[6]) / 255.0;
                DetectedObject::new(
                    COCO_CLASSES[class_id],
                    BoundingBox::new(x0, y0, x0 + w, y0 + h).clamp_to(width, height),
                    confidence,
                )
            })
            .collect()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>> {
        match &self.script {
            Some(script) => Ok(script.get(&frame.index()).cloned().unwrap_or_default()),
            None => Ok(Self::hashed_detections(frame)),
        }
    }
}
