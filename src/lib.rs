//! yolobox turns raw outputs of an anchor-based, grid-style object detector
//! (YOLOv3 family) into final bounding boxes in original-image pixels.
//!
//! The pipeline decodes every feature map against its anchor group,
//! filters on `objectness * class_confidence`, runs greedy NMS per class,
//! and undoes letterbox padding. Batch elements are independent; the
//! `rayon` feature processes them in parallel.

pub mod anchor;
pub mod bbox;
mod candidate;
mod decode;
pub mod image;
pub mod letterbox;
pub mod pipeline;
mod trace;
pub mod util;

pub use anchor::{Anchor, AnchorMask, AnchorSpec, ScaledAnchor};
pub use bbox::{iou, CenterBox, CornerBox};
pub use image::ImageShape;
pub use letterbox::{uncorrect_boxes, Letterbox};
pub use pipeline::{suppress_image, DetectionBatch, PostProcessor, PostprocessConfig};
pub use util::{YoloBoxError, YoloBoxResult};

pub use candidate::detection::Detection;
pub use candidate::filter::filter_by_confidence;
pub use candidate::nms::classwise_nms;
#[cfg(feature = "rayon")]
pub use decode::assemble::assemble_par;
pub use decode::assemble::assemble;
pub use decode::grid::{decode_grid, BOX_ATTRS};
pub use decode::Prediction;
