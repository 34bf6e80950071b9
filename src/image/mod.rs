//! Image and detector-input shapes.

use crate::util::{YoloBoxError, YoloBoxResult};

/// Height and width of an image in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Fails with `InvalidShape` if either dimension is zero.
    pub fn validate(self) -> YoloBoxResult<Self> {
        if self.height == 0 || self.width == 0 {
            return Err(YoloBoxError::InvalidShape {
                height: self.height,
                width: self.width,
            });
        }
        Ok(self)
    }

    pub(crate) fn height_f32(self) -> f32 {
        self.height as f32
    }

    pub(crate) fn width_f32(self) -> f32 {
        self.width as f32
    }
}

impl From<(usize, usize)> for ImageShape {
    fn from((height, width): (usize, usize)) -> Self {
        Self { height, width }
    }
}
