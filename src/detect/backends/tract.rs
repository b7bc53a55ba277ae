#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels;
use crate::detect::result::{non_max_suppression, BoundingBox, DetectedObject};
use crate::frame::Frame;

const CXYWH_OFFSET: usize = 4;

/// Tract-based backend for YOLOv8 ONNX detection models.
///
/// Frames are resized (nearest neighbour, no letterbox) to the square model
/// input. The `[1, 4 + classes, anchors]` output is decoded, thresholded,
/// class-wise NMS'd and scaled back to frame pixel coordinates.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f64,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        })
    }

    /// Override the default confidence and NMS IoU thresholds.
    pub fn with_thresholds(mut self, confidence: f32, iou: f64) -> Self {
        self.confidence_threshold = confidence;
        self.iou_threshold = iou;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(anyhow!("frame {} has zero size", frame.index()));
        }
        let side = self.input_size as usize;
        let scale_x = frame.width() as f32 / side as f32;
        let scale_y = frame.height() as f32 / side as f32;
        let max_x = frame.width() - 1;
        let max_y = frame.height() - 1;

        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            let src_x = ((x as f32 * scale_x) as u32).min(max_x);
            let src_y = ((y as f32 * scale_y) as u32).min(max_y);
            frame
                .pixel(src_x, src_y)
                .map(|rgb| rgb[c] as f32 / 255.0)
                .unwrap_or(0.0)
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<DetectedObject>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("YOLO output must be rank 3")?;
        let shape = preds.shape();
        if shape[1] <= CXYWH_OFFSET {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let channels = shape[1];
        let anchors = shape[2];
        let sx = f64::from(frame.width()) / f64::from(self.input_size);
        let sy = f64::from(frame.height()) / f64::from(self.input_size);

        let mut objects = Vec::new();
        for a in 0..anchors {
            let (class_id, confidence) = (CXYWH_OFFSET..channels)
                .map(|c| (c - CXYWH_OFFSET, preds[[0, c, a]]))
                .fold((0, f32::NEG_INFINITY), |best, x| if x.1 > best.1 { x } else { best });
            if confidence < self.confidence_threshold {
                continue;
            }
            let bbox = BoundingBox::from_center(
                f64::from(preds[[0, 0, a]]) * sx,
                f64::from(preds[[0, 1, a]]) * sy,
                f64::from(preds[[0, 2, a]]) * sx,
                f64::from(preds[[0, 3, a]]) * sy,
            )
            .clamp_to(f64::from(frame.width()), f64::from(frame.height()));
            objects.push(DetectedObject::new(
                labels::class_name(class_id),
                bbox,
                confidence,
            ));
        }

        non_max_suppression(&mut objects, self.iou_threshold);
        Ok(objects)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let blank = Frame::new(0, side, side, vec![0u8; (side as usize).pow(2) * 3])?;
        self.detect(&blank).map(|_| ())
    }
}
