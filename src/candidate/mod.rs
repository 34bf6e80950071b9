//! Candidate selection and pruning.
//!
//! Confidence filtering turns decoded predictions into corner-form
//! detections; class-wise NMS then removes duplicates within each class.

pub(crate) mod detection;
pub(crate) mod filter;
pub(crate) mod nms;
