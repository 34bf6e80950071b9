//! Anchor priors and their assignment to feature-map resolutions.
//!
//! Anchors are stored once as a flat list in input-pixel units. An
//! `AnchorMask` assigns disjoint subsets of that list to each resolution,
//! in the same order as the feature maps handed to the decoder.

use crate::util::{YoloBoxError, YoloBoxResult};

/// YOLOv3 COCO anchors in input pixels, smallest first.
pub const YOLOV3_ANCHORS: [(f32, f32); 9] = [
    (10.0, 13.0),
    (16.0, 30.0),
    (33.0, 23.0),
    (30.0, 61.0),
    (62.0, 45.0),
    (59.0, 119.0),
    (116.0, 90.0),
    (156.0, 198.0),
    (373.0, 326.0),
];

/// Prior box shape in detector-input pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub width: f32,
    pub height: f32,
}

impl Anchor {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Expresses the anchor in feature-map cells for the given strides.
    pub fn scaled(self, stride_w: f32, stride_h: f32) -> ScaledAnchor {
        ScaledAnchor {
            width: self.width / stride_w,
            height: self.height / stride_h,
        }
    }
}

impl From<(f32, f32)> for Anchor {
    fn from((width, height): (f32, f32)) -> Self {
        Self { width, height }
    }
}

/// Anchor size in feature-map cells of one resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledAnchor {
    pub width: f32,
    pub height: f32,
}

/// Ordered list of anchor index groups, one group per resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorMask(Vec<Vec<usize>>);

impl AnchorMask {
    pub fn new(groups: Vec<Vec<usize>>) -> Self {
        Self(groups)
    }

    /// YOLOv3 mask: coarsest feature map gets the largest anchors.
    pub fn yolov3() -> Self {
        Self(vec![vec![6, 7, 8], vec![3, 4, 5], vec![0, 1, 2]])
    }

    /// Returns the number of resolutions described by the mask.
    pub fn num_scales(&self) -> usize {
        self.0.len()
    }

    /// Returns the anchor indices assigned to `scale`.
    pub fn group(&self, scale: usize) -> Option<&[usize]> {
        self.0.get(scale).map(Vec::as_slice)
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.0
    }

    fn validate(&self, num_anchors: usize) -> YoloBoxResult<()> {
        if self.0.is_empty() {
            return Err(YoloBoxError::InvalidAnchorMask {
                reason: "mask has no groups",
            });
        }
        let mut seen = vec![false; num_anchors];
        for group in &self.0 {
            if group.is_empty() {
                return Err(YoloBoxError::InvalidAnchorMask {
                    reason: "mask group is empty",
                });
            }
            for &idx in group {
                let slot = seen.get_mut(idx).ok_or(YoloBoxError::InvalidAnchorMask {
                    reason: "mask index out of range",
                })?;
                if *slot {
                    return Err(YoloBoxError::InvalidAnchorMask {
                        reason: "mask index used twice",
                    });
                }
                *slot = true;
            }
        }
        if seen.iter().any(|used| !used) {
            return Err(YoloBoxError::InvalidAnchorMask {
                reason: "anchor not assigned to any scale",
            });
        }
        Ok(())
    }
}

/// Anchor list together with its per-resolution partition.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorSpec {
    anchors: Vec<Anchor>,
    mask: AnchorMask,
}

impl AnchorSpec {
    /// Builds a spec, checking that `mask` partitions `anchors` exactly.
    pub fn new(anchors: Vec<Anchor>, mask: AnchorMask) -> YoloBoxResult<Self> {
        mask.validate(anchors.len())?;
        Ok(Self { anchors, mask })
    }

    /// The standard three-scale YOLOv3 configuration.
    pub fn yolov3() -> Self {
        Self {
            anchors: YOLOV3_ANCHORS.iter().copied().map(Anchor::from).collect(),
            mask: AnchorMask::yolov3(),
        }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn mask(&self) -> &AnchorMask {
        &self.mask
    }

    pub fn num_scales(&self) -> usize {
        self.mask.num_scales()
    }

    /// Returns the number of anchors per cell at `scale`.
    pub fn anchors_per_cell(&self, scale: usize) -> Option<usize> {
        self.mask.group(scale).map(<[usize]>::len)
    }

    /// Returns the anchors assigned to `scale`, in mask order.
    pub fn anchors_for_scale(&self, scale: usize) -> Option<Vec<Anchor>> {
        let group = self.mask.group(scale)?;
        group.iter().map(|&idx| self.anchors.get(idx).copied()).collect()
    }
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self::yolov3()
    }
}

#[cfg(test)]
mod tests {
    use super::{Anchor, AnchorMask, AnchorSpec};
    use crate::util::YoloBoxError;

    fn anchors(n: usize) -> Vec<Anchor> {
        (0..n).map(|i| Anchor::new(i as f32 + 1.0, i as f32 + 2.0)).collect()
    }

    #[test]
    fn yolov3_spec_is_a_valid_partition() {
        let spec = AnchorSpec::yolov3();
        let rebuilt = AnchorSpec::new(spec.anchors().to_vec(), spec.mask().clone()).unwrap();
        assert_eq!(rebuilt, spec);
        assert_eq!(spec.num_scales(), 3);
        assert_eq!(spec.anchors_per_cell(0), Some(3));
        let coarse = spec.anchors_for_scale(0).unwrap();
        assert_eq!(coarse[0], Anchor::new(116.0, 90.0));
        assert_eq!(coarse[2], Anchor::new(373.0, 326.0));
        assert!(spec.anchors_for_scale(3).is_none());
    }

    #[test]
    fn mask_must_cover_every_anchor_once() {
        let err = AnchorSpec::new(anchors(3), AnchorMask::new(vec![vec![0, 1]])).unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::InvalidAnchorMask {
                reason: "anchor not assigned to any scale",
            }
        );

        let err =
            AnchorSpec::new(anchors(2), AnchorMask::new(vec![vec![0, 1], vec![1]])).unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::InvalidAnchorMask {
                reason: "mask index used twice",
            }
        );

        let err = AnchorSpec::new(anchors(2), AnchorMask::new(vec![vec![0, 2]])).unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::InvalidAnchorMask {
                reason: "mask index out of range",
            }
        );

        let err =
            AnchorSpec::new(anchors(1), AnchorMask::new(vec![vec![0], vec![]])).unwrap_err();
        assert_eq!(
            err,
            YoloBoxError::InvalidAnchorMask {
                reason: "mask group is empty",
            }
        );
    }

    #[test]
    fn scaled_anchor_divides_per_axis() {
        let scaled = Anchor::new(32.0, 48.0).scaled(8.0, 16.0);
        assert_eq!(scaled.width, 4.0);
        assert_eq!(scaled.height, 3.0);
    }
}
