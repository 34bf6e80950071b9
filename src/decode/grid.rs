//! Single-resolution anchor decoding.

use ndarray::ArrayView3;

use crate::anchor::Anchor;
use crate::bbox::CenterBox;
use crate::decode::Prediction;
use crate::image::ImageShape;
use crate::util::math::sigmoid;
use crate::util::{YoloBoxError, YoloBoxResult};

/// Attributes per anchor ahead of the class scores: x, y, w, h, objectness.
pub const BOX_ATTRS: usize = 5;

/// Decodes one image's feature map into feature-space predictions.
///
/// `map` has shape `(anchors.len() * (5 + num_classes), height, width)`;
/// channel `a * (5 + num_classes) + k` holds attribute `k` of anchor `a`.
/// Anchors are given in input pixels and rescaled by the stride of this
/// map, which may differ between the two axes.
///
/// Output is ordered anchor-major, then row, then column. Centers are the
/// sigmoid offset added to the cell's top-left corner; sizes are
/// `exp(raw) * scaled_anchor`.
pub fn decode_grid(
    map: ArrayView3<'_, f32>,
    input_shape: ImageShape,
    anchors: &[Anchor],
    num_classes: usize,
) -> YoloBoxResult<Vec<Prediction>> {
    let input_shape = input_shape.validate()?;
    let (channels, height, width) = map.dim();
    let attrs = BOX_ATTRS + num_classes;
    let expected = anchors.len() * attrs;
    if channels != expected {
        return Err(YoloBoxError::ShapeMismatch {
            context: "feature map channels",
            expected,
            got: channels,
        });
    }
    if height == 0 || width == 0 {
        return Err(YoloBoxError::InvalidShape { height, width });
    }

    let stride_h = input_shape.height_f32() / height as f32;
    let stride_w = input_shape.width_f32() / width as f32;

    let mut out = Vec::with_capacity(anchors.len() * height * width);
    for (anchor_idx, anchor) in anchors.iter().enumerate() {
        let scaled = anchor.scaled(stride_w, stride_h);
        let base = anchor_idx * attrs;
        for row in 0..height {
            for col in 0..width {
                let attr = |k: usize| map[[base + k, row, col]];
                let bbox = CenterBox {
                    cx: sigmoid(attr(0)) + col as f32,
                    cy: sigmoid(attr(1)) + row as f32,
                    w: attr(2).exp() * scaled.width,
                    h: attr(3).exp() * scaled.height,
                };
                let class_scores = (0..num_classes)
                    .map(|k| sigmoid(attr(BOX_ATTRS + k)))
                    .collect();
                out.push(Prediction {
                    bbox,
                    objectness: sigmoid(attr(4)),
                    class_scores,
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::decode_grid;
    use crate::anchor::Anchor;
    use crate::image::ImageShape;
    use crate::util::YoloBoxError;
    use ndarray::Array3;

    #[test]
    fn zero_logits_decode_to_cell_centers_and_anchor_sizes() {
        // one anchor, one class, 2x3 grid on a 8x12 input: stride 4 on both axes
        let map = Array3::<f32>::zeros((6, 2, 3));
        let anchors = [Anchor::new(8.0, 4.0)];
        let preds = decode_grid(map.view(), ImageShape::new(8, 12), &anchors, 1).unwrap();

        assert_eq!(preds.len(), 6);
        // row 1, col 2
        let p = &preds[5];
        assert!((p.bbox.cx - 2.5).abs() < 1e-6);
        assert!((p.bbox.cy - 1.5).abs() < 1e-6);
        assert!((p.bbox.w - 2.0).abs() < 1e-6);
        assert!((p.bbox.h - 1.0).abs() < 1e-6);
        assert!((p.objectness - 0.5).abs() < 1e-6);
        assert_eq!(p.class_scores.len(), 1);
    }

    #[test]
    fn channels_are_read_per_anchor() {
        // two anchors, no classes; raise objectness of anchor 1 only
        let mut map = Array3::<f32>::zeros((10, 1, 1));
        map[[9, 0, 0]] = 10.0;
        map[[7, 0, 0]] = 2.0f32.ln();
        let anchors = [Anchor::new(1.0, 1.0), Anchor::new(3.0, 5.0)];
        let preds = decode_grid(map.view(), ImageShape::new(1, 1), &anchors, 0).unwrap();

        assert_eq!(preds.len(), 2);
        assert!((preds[0].objectness - 0.5).abs() < 1e-6);
        assert!(preds[1].objectness > 0.9999);
        assert!((preds[1].bbox.w - 6.0).abs() < 1e-5);
        assert!((preds[1].bbox.h - 5.0).abs() < 1e-5);
    }

    #[test]
    fn non_square_strides_scale_anchors_per_axis() {
        // 16x32 input on a 2x2 grid: stride_h = 8, stride_w = 16
        let map = Array3::<f32>::zeros((6, 2, 2));
        let anchors = [Anchor::new(32.0, 32.0)];
        let preds = decode_grid(map.view(), ImageShape::new(16, 32), &anchors, 1).unwrap();
        assert!((preds[0].bbox.w - 2.0).abs() < 1e-6);
        assert!((preds[0].bbox.h - 4.0).abs() < 1e-6);
    }

    #[test]
    fn channel_count_must_match_anchor_layout() {
        let map = Array3::<f32>::zeros((7, 2, 2));
        let anchors = [Anchor::new(1.0, 1.0)];
        let err = decode_grid(map.view(), ImageShape::new(4, 4), &anchors, 1).unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::ShapeMismatch {
                context: "feature map channels",
                expected: 6,
                got: 7,
            }
        );
    }

    #[test]
    fn empty_grid_is_rejected() {
        let map = Array3::<f32>::zeros((6, 0, 2));
        let anchors = [Anchor::new(1.0, 1.0)];
        let err = decode_grid(map.view(), ImageShape::new(4, 4), &anchors, 1).unwrap_err();
        assert_eq!(err, YoloBoxError::InvalidShape { height: 0, width: 2 });
    }

    #[test]
    fn zero_input_shape_is_rejected() {
        let map = Array3::<f32>::zeros((6, 2, 2));
        let anchors = [Anchor::new(1.0, 1.0)];
        let err = decode_grid(map.view(), ImageShape::new(0, 4), &anchors, 1).unwrap_err();
        assert_eq!(err, YoloBoxError::InvalidShape { height: 0, width: 4 });
    }
}
