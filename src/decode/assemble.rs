//! Multi-resolution assembly of decoded predictions.
//!
//! Each feature map is decoded with its own anchor group, normalized to the
//! unit square of the detector input, and appended to one flat list per
//! image. Resolutions are concatenated in mask order.

use ndarray::{ArrayView4, Axis};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::anchor::{Anchor, AnchorSpec};
use crate::decode::grid::decode_grid;
use crate::decode::Prediction;
use crate::image::ImageShape;
use crate::trace::{stage_count, stage_span};
use crate::util::{YoloBoxError, YoloBoxResult};

/// Checks the feature maps against the anchor spec and returns the batch
/// size with the anchors of every scale.
fn prepare(
    maps: &[ArrayView4<'_, f32>],
    spec: &AnchorSpec,
) -> YoloBoxResult<(usize, Vec<Vec<Anchor>>)> {
    if maps.len() != spec.num_scales() {
        return Err(YoloBoxError::ShapeMismatch {
            context: "feature map count",
            expected: spec.num_scales(),
            got: maps.len(),
        });
    }

    let batch = maps.first().map_or(0, |map| map.len_of(Axis(0)));
    for map in maps {
        let got = map.len_of(Axis(0));
        if got != batch {
            return Err(YoloBoxError::ShapeMismatch {
                context: "batch size",
                expected: batch,
                got,
            });
        }
    }

    let anchors = (0..spec.num_scales())
        .map(|scale| {
            spec.anchors_for_scale(scale)
                .ok_or(YoloBoxError::InvalidAnchorMask {
                    reason: "mask index out of range",
                })
        })
        .collect::<YoloBoxResult<Vec<_>>>()?;

    Ok((batch, anchors))
}

/// Decodes every resolution for batch element `image`.
fn assemble_image(
    maps: &[ArrayView4<'_, f32>],
    anchors: &[Vec<Anchor>],
    image: usize,
    input_shape: ImageShape,
    num_classes: usize,
) -> YoloBoxResult<Vec<Prediction>> {
    let mut out = Vec::new();
    for (map, scale_anchors) in maps.iter().zip(anchors) {
        let view = map.index_axis(Axis(0), image);
        let (_, grid_h, grid_w) = view.dim();
        let decoded = decode_grid(view, input_shape, scale_anchors, num_classes)?;
        out.extend(
            decoded
                .into_iter()
                .map(|pred| pred.normalized(grid_w as f32, grid_h as f32)),
        );
    }
    Ok(out)
}

/// Decodes all feature maps into one normalized prediction list per image.
///
/// `maps[i]` must use the anchors of mask group `i`; every map must share
/// the batch size. Nothing is decoded if any map fails validation.
pub fn assemble(
    maps: &[ArrayView4<'_, f32>],
    spec: &AnchorSpec,
    input_shape: ImageShape,
    num_classes: usize,
) -> YoloBoxResult<Vec<Vec<Prediction>>> {
    let input_shape = input_shape.validate()?;
    let (batch, anchors) = prepare(maps, spec)?;
    let _span = stage_span!("decode", batch = batch, scales = maps.len()).entered();

    let out = (0..batch)
        .map(|image| assemble_image(maps, &anchors, image, input_shape, num_classes))
        .collect::<YoloBoxResult<Vec<_>>>()?;

    stage_count!("predictions", out.iter().map(Vec::len).sum::<usize>());
    Ok(out)
}

/// Parallel variant of [`assemble`] that decodes batch elements on the
/// rayon pool. Output is identical to the sequential path.
#[cfg(feature = "rayon")]
pub fn assemble_par(
    maps: &[ArrayView4<'_, f32>],
    spec: &AnchorSpec,
    input_shape: ImageShape,
    num_classes: usize,
) -> YoloBoxResult<Vec<Vec<Prediction>>> {
    let input_shape = input_shape.validate()?;
    let (batch, anchors) = prepare(maps, spec)?;
    let _span = stage_span!(
        "decode",
        batch = batch,
        scales = maps.len(),
        parallel = true
    )
    .entered();

    let out = (0..batch)
        .into_par_iter()
        .map(|image| assemble_image(maps, &anchors, image, input_shape, num_classes))
        .collect::<YoloBoxResult<Vec<_>>>()?;

    stage_count!("predictions", out.iter().map(Vec::len).sum::<usize>());
    Ok(out)
}
