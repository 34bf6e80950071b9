//! End-to-end post-processing of detector outputs.
//!
//! `PostProcessor` owns a validated configuration and exposes the three
//! stages separately (`decode`, `suppress`, `rescale`) as well as the
//! combined `process`. Batch elements never share state, so with the
//! `rayon` feature and `parallel` set they are handled on the rayon pool.

mod config;

pub use config::PostprocessConfig;

use ndarray::ArrayView4;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::candidate::detection::Detection;
use crate::candidate::filter::filter_by_confidence;
use crate::candidate::nms::classwise_nms;
use crate::decode::assemble::assemble;
#[cfg(feature = "rayon")]
use crate::decode::assemble::assemble_par;
use crate::decode::Prediction;
use crate::image::ImageShape;
use crate::letterbox::uncorrect_boxes;
use crate::trace::{stage_count, stage_span};
use crate::util::{YoloBoxError, YoloBoxResult};
use config::validate_threshold;

/// One detection list per image, in batch order. An empty list means no
/// objects were found.
pub type DetectionBatch = Vec<Vec<Detection>>;

/// Confidence filtering followed by class-wise NMS for one image.
///
/// Thresholds are not validated here; see [`PostProcessor::suppress`].
pub fn suppress_image(
    predictions: Vec<Prediction>,
    conf_thres: f32,
    nms_thres: f32,
) -> Vec<Detection> {
    let candidates = filter_by_confidence(predictions, conf_thres);
    if candidates.is_empty() {
        return candidates;
    }
    classwise_nms(candidates, nms_thres)
}

/// Post-processor for a fixed detector configuration.
#[derive(Clone, Debug)]
pub struct PostProcessor {
    cfg: PostprocessConfig,
}

impl PostProcessor {
    /// Validates the configuration and builds a post-processor.
    pub fn new(cfg: PostprocessConfig) -> YoloBoxResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.cfg
    }

    /// Decodes raw feature maps into one normalized prediction list per
    /// image.
    ///
    /// `maps[i]` has shape `(batch, anchors * (5 + num_classes), h, w)` and
    /// uses mask group `i`. The list length per image is the sum of
    /// `anchors * h * w` over all maps.
    pub fn decode(&self, maps: &[ArrayView4<'_, f32>]) -> YoloBoxResult<Vec<Vec<Prediction>>> {
        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            return assemble_par(
                maps,
                &self.cfg.anchors,
                self.cfg.input_shape,
                self.cfg.num_classes,
            );
        }
        assemble(
            maps,
            &self.cfg.anchors,
            self.cfg.input_shape,
            self.cfg.num_classes,
        )
    }

    /// Filters by joint confidence and runs class-wise NMS on every image.
    ///
    /// Both thresholds must lie in (0, 1]; they are checked before any
    /// image is touched.
    pub fn suppress(
        &self,
        batch: Vec<Vec<Prediction>>,
        conf_thres: f32,
        nms_thres: f32,
    ) -> YoloBoxResult<DetectionBatch> {
        let conf_thres = validate_threshold("conf_thres", conf_thres)?;
        let nms_thres = validate_threshold("nms_thres", nms_thres)?;
        let _span = stage_span!("suppress", batch = batch.len()).entered();

        #[cfg(feature = "rayon")]
        let out: DetectionBatch = if self.cfg.parallel {
            batch
                .into_par_iter()
                .map(|preds| suppress_image(preds, conf_thres, nms_thres))
                .collect()
        } else {
            batch
                .into_iter()
                .map(|preds| suppress_image(preds, conf_thres, nms_thres))
                .collect()
        };
        #[cfg(not(feature = "rayon"))]
        let out: DetectionBatch = batch
            .into_iter()
            .map(|preds| suppress_image(preds, conf_thres, nms_thres))
            .collect();

        stage_count!("detections", out.iter().map(Vec::len).sum::<usize>());
        Ok(out)
    }

    /// Maps every image's detections to original-image pixels, using the
    /// same letterbox flag for the whole batch.
    pub fn rescale(
        &self,
        batch: DetectionBatch,
        image_shapes: &[ImageShape],
        letterbox: bool,
    ) -> YoloBoxResult<DetectionBatch> {
        let flags = vec![letterbox; batch.len()];
        self.rescale_each(batch, image_shapes, &flags)
    }

    /// Maps every image's detections to original-image pixels with a
    /// letterbox flag per image.
    pub fn rescale_each(
        &self,
        batch: DetectionBatch,
        image_shapes: &[ImageShape],
        letterbox: &[bool],
    ) -> YoloBoxResult<DetectionBatch> {
        if image_shapes.len() != batch.len() {
            return Err(YoloBoxError::ShapeMismatch {
                context: "image shape count",
                expected: batch.len(),
                got: image_shapes.len(),
            });
        }
        if letterbox.len() != batch.len() {
            return Err(YoloBoxError::ShapeMismatch {
                context: "letterbox flag count",
                expected: batch.len(),
                got: letterbox.len(),
            });
        }
        let _span = stage_span!("rescale", batch = batch.len()).entered();

        batch
            .into_iter()
            .zip(image_shapes.iter().zip(letterbox))
            .map(|(dets, (&shape, &lb))| uncorrect_boxes(dets, self.cfg.input_shape, shape, lb))
            .collect()
    }

    /// Runs decode, suppression with the configured thresholds, and
    /// rescaling.
    pub fn process(
        &self,
        maps: &[ArrayView4<'_, f32>],
        image_shapes: &[ImageShape],
        letterbox: bool,
    ) -> YoloBoxResult<DetectionBatch> {
        let predictions = self.decode(maps)?;
        if image_shapes.len() != predictions.len() {
            return Err(YoloBoxError::ShapeMismatch {
                context: "image shape count",
                expected: predictions.len(),
                got: image_shapes.len(),
            });
        }
        let kept = self.suppress(predictions, self.cfg.conf_thres, self.cfg.nms_thres)?;
        self.rescale(kept, image_shapes, letterbox)
    }
}

#[cfg(test)]
mod tests {
    use super::{PostProcessor, PostprocessConfig};
    use crate::anchor::{Anchor, AnchorMask, AnchorSpec};
    use crate::image::ImageShape;
    use crate::util::YoloBoxError;
    use ndarray::Array4;

    fn single_scale_cfg() -> PostprocessConfig {
        PostprocessConfig {
            anchors: AnchorSpec::new(vec![Anchor::new(4.0, 4.0)], AnchorMask::new(vec![vec![0]]))
                .unwrap(),
            num_classes: 1,
            input_shape: ImageShape::new(4, 4),
            ..PostprocessConfig::default()
        }
    }

    #[test]
    fn new_rejects_invalid_thresholds() {
        let err = PostProcessor::new(PostprocessConfig {
            conf_thres: 0.0,
            ..PostprocessConfig::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::InvalidThreshold {
                name: "conf_thres",
                value: 0.0,
            }
        );
    }

    #[test]
    fn suppress_validates_thresholds_up_front() {
        let pp = PostProcessor::new(single_scale_cfg()).unwrap();
        let err = pp.suppress(Vec::new(), 0.5, 1.2).unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::InvalidThreshold {
                name: "nms_thres",
                value: 1.2,
            }
        );
    }

    #[test]
    fn rescale_requires_one_shape_per_image() {
        let pp = PostProcessor::new(single_scale_cfg()).unwrap();
        let err = pp
            .rescale(vec![Vec::new(), Vec::new()], &[ImageShape::new(4, 4)], false)
            .unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::ShapeMismatch {
                context: "image shape count",
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn rescale_each_requires_one_flag_per_image() {
        let pp = PostProcessor::new(single_scale_cfg()).unwrap();
        let shapes = [ImageShape::new(4, 4), ImageShape::new(8, 8)];
        let err = pp
            .rescale_each(vec![Vec::new(), Vec::new()], &shapes, &[true])
            .unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::ShapeMismatch {
                context: "letterbox flag count",
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn process_requires_one_shape_per_image() {
        let pp = PostProcessor::new(single_scale_cfg()).unwrap();
        let map = Array4::<f32>::zeros((2, 6, 1, 1));
        let err = pp
            .process(&[map.view()], &[ImageShape::new(4, 4)], true)
            .unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::ShapeMismatch {
                context: "image shape count",
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn process_keeps_batch_order_and_empty_images() {
        let pp = PostProcessor::new(single_scale_cfg()).unwrap();
        let mut map = Array4::<f32>::from_elem((2, 6, 1, 1), -10.0);
        // image 1: confident single cell
        map[[1, 4, 0, 0]] = 10.0;
        map[[1, 5, 0, 0]] = 10.0;
        map[[1, 2, 0, 0]] = 0.0;
        map[[1, 3, 0, 0]] = 0.0;

        let shapes = [ImageShape::new(4, 4), ImageShape::new(8, 8)];
        let out = pp.process(&[map.view()], &shapes, false).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].is_empty());
        assert_eq!(out[1].len(), 1);
        assert_eq!(out[1][0].class_index, 0);
    }
}
