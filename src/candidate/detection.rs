//! Corner-form detections shared by filtering, NMS and rescaling.

use std::cmp::Ordering;

use crate::bbox::CornerBox;

/// Detection with a single predicted class.
///
/// Coordinates are normalized to the detector input until the detection
/// passes through `uncorrect_boxes`, after which they are image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Corner-form box.
    pub bbox: CornerBox,
    /// Objectness probability.
    pub objectness: f32,
    /// Probability of `class_index`, the best class.
    pub class_confidence: f32,
    /// Index of the best class.
    pub class_index: usize,
}

impl Detection {
    /// Joint confidence `objectness * class_confidence`.
    pub fn score(&self) -> f32 {
        self.objectness * self.class_confidence
    }
}

/// Orders `(original_index, detection)` pairs by descending score, lower
/// original index first on equal scores.
pub(crate) fn detection_cmp_desc(a: &(usize, Detection), b: &(usize, Detection)) -> Ordering {
    b.1.score()
        .total_cmp(&a.1.score())
        .then_with(|| a.0.cmp(&b.0))
}
