//! Joint objectness and class-confidence thresholding.

use crate::candidate::detection::Detection;
use crate::decode::Prediction;
use crate::util::math::argmax;

/// Keeps predictions whose `objectness * max(class_scores)` reaches
/// `conf_thres` and converts them to corner form.
///
/// The class index is the arg max of the class scores (lowest index on
/// ties). Predictions without class scores never pass. Input order is
/// preserved.
pub fn filter_by_confidence(predictions: Vec<Prediction>, conf_thres: f32) -> Vec<Detection> {
    predictions
        .into_iter()
        .filter_map(|pred| {
            let (class_index, class_confidence) = argmax(&pred.class_scores)?;
            let det = Detection {
                bbox: pred.bbox.to_corners(),
                objectness: pred.objectness,
                class_confidence,
                class_index,
            };
            (det.score() >= conf_thres).then_some(det)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::filter_by_confidence;
    use crate::bbox::{CenterBox, CornerBox};
    use crate::decode::Prediction;

    fn pred(objectness: f32, class_scores: Vec<f32>) -> Prediction {
        Prediction {
            bbox: CenterBox {
                cx: 0.5,
                cy: 0.5,
                w: 0.2,
                h: 0.4,
            },
            objectness,
            class_scores,
        }
    }

    #[test]
    fn requires_joint_confidence() {
        let preds = vec![
            pred(0.9, vec![0.1, 0.3]),
            pred(0.3, vec![0.95, 0.1]),
            pred(0.8, vec![0.2, 0.9]),
        ];
        let kept = filter_by_confidence(preds, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_index, 1);
        assert!((kept[0].class_confidence - 0.9).abs() < 1e-6);
        assert!((kept[0].objectness - 0.8).abs() < 1e-6);
    }

    #[test]
    fn threshold_is_inclusive() {
        let kept = filter_by_confidence(vec![pred(0.5, vec![1.0])], 0.5);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn survivors_are_in_corner_form() {
        let kept = filter_by_confidence(vec![pred(1.0, vec![1.0])], 0.5);
        let expected = CornerBox {
            x1: 0.4,
            y1: 0.3,
            x2: 0.6,
            y2: 0.7,
        };
        let got = kept[0].bbox;
        assert!((got.x1 - expected.x1).abs() < 1e-6);
        assert!((got.y1 - expected.y1).abs() < 1e-6);
        assert!((got.x2 - expected.x2).abs() < 1e-6);
        assert!((got.y2 - expected.y2).abs() < 1e-6);
    }

    #[test]
    fn nothing_passing_gives_empty_list() {
        let kept = filter_by_confidence(vec![pred(0.1, vec![0.1]), pred(0.9, vec![])], 0.5);
        assert!(kept.is_empty());
    }
}
