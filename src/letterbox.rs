//! Mapping detections from detector-input space back to image pixels.
//!
//! Upstream letterboxing fits the image inside the detector input while
//! preserving its aspect ratio and centers it on a padded canvas. `Letterbox`
//! captures that geometry for one (input, image) pair; `uncorrect_boxes`
//! inverts it and scales normalized boxes to original pixels.

use crate::bbox::{CenterBox, CornerBox};
use crate::candidate::detection::Detection;
use crate::image::ImageShape;
use crate::util::YoloBoxResult;

/// Letterbox geometry for one image inside the detector input.
///
/// Offsets are expressed as a fraction of the input size; scales are
/// `input / content` per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    content_h: f32,
    content_w: f32,
    offset_y: f32,
    offset_x: f32,
    scale_y: f32,
    scale_x: f32,
}

impl Letterbox {
    /// Computes the geometry of fitting `image_shape` into `input_shape`.
    ///
    /// The content shape is `image * min(input / image)` rounded half to
    /// even. It is computed in `f64`; values such as `390 * 0.65` sit right
    /// at a half and round differently in `f32`.
    pub fn new(input_shape: ImageShape, image_shape: ImageShape) -> YoloBoxResult<Self> {
        let input_shape = input_shape.validate()?;
        let image_shape = image_shape.validate()?;

        let (in_h, in_w) = (input_shape.height as f64, input_shape.width as f64);
        let (img_h, img_w) = (image_shape.height as f64, image_shape.width as f64);
        let ratio = (in_h / img_h).min(in_w / img_w);
        // at least one pixel so tiny images cannot produce a zero scale
        let content_h = (img_h * ratio).round_ties_even().max(1.0);
        let content_w = (img_w * ratio).round_ties_even().max(1.0);

        Ok(Self {
            content_h: content_h as f32,
            content_w: content_w as f32,
            offset_y: ((in_h - content_h) / 2.0 / in_h) as f32,
            offset_x: ((in_w - content_w) / 2.0 / in_w) as f32,
            scale_y: (in_h / content_h) as f32,
            scale_x: (in_w / content_w) as f32,
        })
    }

    /// Returns the `(height, width)` of the resized image content.
    pub fn content_shape(&self) -> (f32, f32) {
        (self.content_h, self.content_w)
    }

    /// Returns the `(y, x)` padding offset as a fraction of the input.
    pub fn offset(&self) -> (f32, f32) {
        (self.offset_y, self.offset_x)
    }

    /// Returns the `(y, x)` scale from content to full input.
    pub fn scale(&self) -> (f32, f32) {
        (self.scale_y, self.scale_x)
    }

    /// Maps a center box from normalized input space to normalized image
    /// space, removing the padding.
    pub fn invert(&self, bbox: CenterBox) -> CenterBox {
        CenterBox {
            cx: (bbox.cx - self.offset_x) * self.scale_x,
            cy: (bbox.cy - self.offset_y) * self.scale_y,
            w: bbox.w * self.scale_x,
            h: bbox.h * self.scale_y,
        }
    }

    /// Maps a box in original image pixels to normalized input space, as the
    /// letterbox resize would place it.
    pub fn forward_box(&self, bbox: CornerBox, image_shape: ImageShape) -> CornerBox {
        let (img_h, img_w) = (image_shape.height_f32(), image_shape.width_f32());
        let map_x = |x: f32| x / img_w / self.scale_x + self.offset_x;
        let map_y = |y: f32| y / img_h / self.scale_y + self.offset_y;
        CornerBox {
            x1: map_x(bbox.x1),
            y1: map_y(bbox.y1),
            x2: map_x(bbox.x2),
            y2: map_y(bbox.y2),
        }
    }
}

/// Rescales normalized detections to pixels of the original image.
///
/// With `letterbox` set, the padding added for `input_shape` is removed
/// first; otherwise the input is treated as a plain resize of the image.
/// Scores and class indices are carried over unchanged.
pub fn uncorrect_boxes(
    detections: Vec<Detection>,
    input_shape: ImageShape,
    image_shape: ImageShape,
    letterbox: bool,
) -> YoloBoxResult<Vec<Detection>> {
    let image_shape = image_shape.validate()?;
    let geometry = if letterbox {
        Some(Letterbox::new(input_shape, image_shape)?)
    } else {
        None
    };
    let (img_h, img_w) = (image_shape.height_f32(), image_shape.width_f32());

    Ok(detections
        .into_iter()
        .map(|det| {
            let center = det.bbox.to_center();
            let center = match &geometry {
                Some(lb) => lb.invert(center),
                None => center,
            };
            let c = center.to_corners();
            Detection {
                bbox: CornerBox {
                    x1: c.x1 * img_w,
                    y1: c.y1 * img_h,
                    x2: c.x2 * img_w,
                    y2: c.y2 * img_h,
                },
                ..det
            }
        })
        .collect())
}
