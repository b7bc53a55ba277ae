use anyhow::Result;

use crate::detect::result::DetectedObject;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Wraps an external object-detection capability: a frame goes in, zero or
/// more tagged detections come out. Order within a frame is not significant.
///
/// Backends must treat the frame as read-only and must not retain it past the
/// `detect` call. Confidence range and box ordering are the backend's contract.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
