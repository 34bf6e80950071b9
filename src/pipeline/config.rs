//! Post-processing configuration.

use crate::anchor::AnchorSpec;
use crate::image::ImageShape;
use crate::util::{YoloBoxError, YoloBoxResult};

/// Static configuration shared by every call of a `PostProcessor`.
#[derive(Clone, Debug, PartialEq)]
pub struct PostprocessConfig {
    /// Anchor priors and their per-resolution grouping.
    pub anchors: AnchorSpec,
    /// Number of class scores per anchor.
    pub num_classes: usize,
    /// Detector input shape the feature maps were computed for.
    pub input_shape: ImageShape,
    /// Minimum `objectness * class_confidence` kept by `process`.
    pub conf_thres: f32,
    /// IoU at which `process` suppresses a same-class box.
    pub nms_thres: f32,
    /// Decode and suppress batch elements in parallel (requires `rayon`).
    pub parallel: bool,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            anchors: AnchorSpec::yolov3(),
            num_classes: 80,
            input_shape: ImageShape::new(416, 416),
            conf_thres: 0.5,
            nms_thres: 0.4,
            parallel: false,
        }
    }
}

impl PostprocessConfig {
    pub(crate) fn validate(&self) -> YoloBoxResult<()> {
        self.input_shape.validate()?;
        validate_threshold("conf_thres", self.conf_thres)?;
        validate_threshold("nms_thres", self.nms_thres)?;
        Ok(())
    }
}

/// Fails with `InvalidThreshold` unless `value` lies in (0, 1].
pub(crate) fn validate_threshold(name: &'static str, value: f32) -> YoloBoxResult<f32> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(YoloBoxError::InvalidThreshold { name, value })
    }
}
