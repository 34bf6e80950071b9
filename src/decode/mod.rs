//! Decoding of raw detector heads into center-form predictions.
//!
//! `grid` handles a single resolution in feature-map units; `assemble`
//! runs it over every resolution and normalizes the result to the
//! detector input.

pub(crate) mod assemble;
pub(crate) mod grid;

use crate::bbox::CenterBox;

/// Decoded anchor prediction in center form.
///
/// Coordinates are in feature-map cells straight out of `decode_grid` and
/// in `[0, 1]` detector-input units after assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Center-form box.
    pub bbox: CenterBox,
    /// Probability that the anchor holds any object.
    pub objectness: f32,
    /// Per-class probabilities.
    pub class_scores: Vec<f32>,
}

impl Prediction {
    /// Rescales the box from feature-map cells to the unit square.
    pub(crate) fn normalized(self, grid_width: f32, grid_height: f32) -> Self {
        let CenterBox { cx, cy, w, h } = self.bbox;
        Self {
            bbox: CenterBox {
                cx: cx / grid_width,
                cy: cy / grid_height,
                w: w / grid_width,
                h: h / grid_height,
            },
            ..self
        }
    }
}
