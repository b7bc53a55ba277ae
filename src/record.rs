//! Detection records and the builder that derives their timestamps.
//!
//! A record's `timestamp` is a cached projection of `frame_index / fps`. It is
//! computed once here and carried verbatim by the tabular export and the store;
//! nothing downstream recomputes it.

use serde::Serialize;

use crate::detect::{BoundingBox, DetectedObject};
use crate::error::{Result, TimelineError};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// One detected object instance in one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionRecord {
    id: Option<i64>,
    class_name: String,
    timestamp: String,
    frame_index: u64,
    bbox: BoundingBox,
    confidence: f64,
}

impl DetectionRecord {
    /// Reassemble a record whose timestamp was already derived by a builder
    /// (tabular import and store reads).
    pub(crate) fn from_parts(
        id: Option<i64>,
        class_name: String,
        timestamp: String,
        frame_index: u64,
        bbox: BoundingBox,
        confidence: f64,
    ) -> Self {
        Self {
            id,
            class_name,
            timestamp,
            frame_index,
            bbox,
            confidence,
        }
    }

    pub(crate) fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Store-assigned identity. `None` until the record has been appended.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Case-insensitive class comparison used by filters.
    pub fn is_class(&self, class_name: &str) -> bool {
        self.class_name.to_lowercase() == class_name.to_lowercase()
    }
}

/// Builds records for one video. Holds the validated frame rate.
#[derive(Clone, Copy, Debug)]
pub struct RecordBuilder {
    fps: f64,
}

impl RecordBuilder {
    pub fn new(fps: f64) -> Result<Self> {
        validate_fps(fps)?;
        Ok(Self { fps })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn build(
        &self,
        frame_index: u64,
        class_name: impl Into<String>,
        bbox: BoundingBox,
        confidence: f64,
    ) -> DetectionRecord {
        DetectionRecord {
            id: None,
            class_name: class_name.into(),
            timestamp: format_elapsed(frame_index, self.fps),
            frame_index,
            bbox,
            confidence,
        }
    }

    /// Convert one detector output into a record for `frame_index`.
    pub fn build_from_detection(&self, frame_index: u64, object: DetectedObject) -> DetectionRecord {
        self.build(
            frame_index,
            object.class_name,
            object.bbox,
            f64::from(object.confidence),
        )
    }
}

/// Single-shot form of [`RecordBuilder::build`].
pub fn build(
    frame_index: u64,
    fps: f64,
    class_name: impl Into<String>,
    bbox: BoundingBox,
    confidence: f64,
) -> Result<DetectionRecord> {
    Ok(RecordBuilder::new(fps)?.build(frame_index, class_name, bbox, confidence))
}

/// Elapsed time of `frame_index` at `fps`, formatted as `H:MM:SS[.ffffff]`.
pub fn frame_timestamp(frame_index: u64, fps: f64) -> Result<String> {
    validate_fps(fps)?;
    Ok(format_elapsed(frame_index, fps))
}

fn validate_fps(fps: f64) -> Result<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(TimelineError::InvalidFrameRate(fps))
    }
}

fn format_elapsed(frame_index: u64, fps: f64) -> String {
    let micros = (frame_index as f64 / fps * MICROS_PER_SECOND as f64).round() as u64;
    let whole = micros / MICROS_PER_SECOND;
    let fraction = micros % MICROS_PER_SECOND;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = whole % 60;
    if fraction == 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(10.0, 20.0, 110.0, 220.0)
    }

    #[test]
    fn whole_seconds_have_no_fraction() {
        assert_eq!(frame_timestamp(0, 30.0).unwrap(), "0:00:00");
        assert_eq!(frame_timestamp(30, 30.0).unwrap(), "0:00:01");
        assert_eq!(frame_timestamp(30 * 3600, 30.0).unwrap(), "1:00:00");
    }

    #[test]
    fn fractions_use_six_digits() {
        assert_eq!(frame_timestamp(45, 30.0).unwrap(), "0:00:01.500000");
        assert_eq!(frame_timestamp(1, 29.97).unwrap(), "0:00:00.033367");
        assert_eq!(frame_timestamp(7447, 2.0).unwrap(), "1:02:03.500000");
    }

    #[test]
    fn hours_are_not_wrapped_into_days() {
        assert_eq!(frame_timestamp(25 * 3600, 1.0).unwrap(), "25:00:00");
    }

    #[test]
    fn non_positive_frame_rate_is_rejected() {
        for fps in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = frame_timestamp(10, fps).unwrap_err();
            assert!(matches!(err, TimelineError::InvalidFrameRate(_)));
            assert!(RecordBuilder::new(fps).is_err());
        }
    }

    #[test]
    fn timestamps_are_monotonic_in_frame_index() {
        let builder = RecordBuilder::new(29.97).unwrap();
        let mut last = 0.0;
        for frame in 0..5_000u64 {
            let record = builder.build(frame, "bird", bbox(), 0.5);
            let seconds = crate::timeseries::parse_timestamp(record.timestamp()).unwrap();
            assert!(seconds >= last, "frame {} went backwards", frame);
            last = seconds;
        }
    }

    #[test]
    fn builder_passes_values_through() {
        let odd_box = BoundingBox::new(50.0, 50.0, 10.0, 10.0);
        let record = build(3, 1.0, "Bird", odd_box, 1.7).unwrap();
        assert_eq!(record.id(), None);
        assert_eq!(record.class_name(), "Bird");
        assert_eq!(record.frame_index(), 3);
        assert_eq!(record.bbox(), odd_box);
        assert_eq!(record.confidence(), 1.7);
        assert_eq!(record.timestamp(), "0:00:03");
        assert!(record.is_class("bird"));
    }
}
