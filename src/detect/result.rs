use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates: (x0, y0) top-left, (x1, y1)
/// bottom-right. Ordering is the detector's contract and is not enforced here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build from centre/size form as produced by YOLO heads.
    pub fn from_center(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Clamp into a `width` x `height` image.
    pub fn clamp_to(&self, width: f64, height: f64) -> Self {
        Self::new(
            self.x0.clamp(0.0, width),
            self.y0.clamp(0.0, height),
            self.x1.clamp(0.0, width),
            self.y1.clamp(0.0, height),
        )
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix0 = self.x0.max(other.x0);
        let iy0 = self.y0.max(other.y0);
        let ix1 = self.x1.min(other.x1);
        let iy1 = self.y1.min(other.y1);
        let intersection = (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    pub fn coords(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// One object reported by a detector backend for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedObject {
    pub class_name: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl DetectedObject {
    pub fn new(class_name: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            class_name: class_name.into(),
            bbox,
            confidence,
        }
    }
}

/// Greedy class-wise non-maximum suppression. Keeps the highest-confidence
/// object of every overlapping group whose IoU exceeds `iou_threshold`.
pub fn non_max_suppression(objects: &mut Vec<DetectedObject>, iou_threshold: f64) {
    objects.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..objects.len() {
        let suppressed = (0..kept).any(|prev| {
            objects[prev].class_name == objects[index].class_name
                && objects[prev].bbox.iou(&objects[index].bbox) > iou_threshold
        });
        if !suppressed {
            objects.swap(kept, index);
            kept += 1;
        }
    }
    objects.truncate(kept);
}
