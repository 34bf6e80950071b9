//! Class-wise greedy non-maximum suppression.

use std::collections::BTreeMap;

use crate::bbox::iou;
use crate::candidate::detection::{detection_cmp_desc, Detection};

/// Greedy NMS over a single class.
///
/// Detections are visited by descending score (lower original index first
/// on ties) and kept unless their IoU with an already kept box is at least
/// `nms_thres`. Every kept pair therefore has IoU strictly below the
/// threshold.
fn nms_single_class(mut indexed: Vec<(usize, Detection)>, nms_thres: f32) -> Vec<Detection> {
    indexed.sort_by(detection_cmp_desc);
    let mut kept: Vec<Detection> = Vec::new();

    'outer: for (_, det) in indexed {
        for kept_det in kept.iter() {
            if iou(&det.bbox, &kept_det.bbox) >= nms_thres {
                continue 'outer;
            }
        }
        kept.push(det);
    }

    kept
}

/// Runs greedy NMS independently for every class present in `detections`.
///
/// Boxes of different classes never suppress each other. The result lists
/// classes in ascending index order, each by descending score.
pub fn classwise_nms(detections: Vec<Detection>, nms_thres: f32) -> Vec<Detection> {
    let mut by_class: BTreeMap<usize, Vec<(usize, Detection)>> = BTreeMap::new();
    for (idx, det) in detections.into_iter().enumerate() {
        by_class.entry(det.class_index).or_default().push((idx, det));
    }

    by_class
        .into_values()
        .flat_map(|group| nms_single_class(group, nms_thres))
        .collect()
}
