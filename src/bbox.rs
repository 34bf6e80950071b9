//! Axis-aligned box representations.
//!
//! A box is either in center form (`CenterBox`) or corner form
//! (`CornerBox`). Conversions return new values; nothing is rewritten in
//! place.

/// Box given by its center and size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenterBox {
    /// Center x coordinate.
    pub cx: f32,
    /// Center y coordinate.
    pub cy: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

/// Box given by its top-left and bottom-right corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CornerBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

impl CenterBox {
    /// Converts to corner form (`center -/+ size / 2`).
    pub fn to_corners(self) -> CornerBox {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        CornerBox {
            x1: self.cx - half_w,
            y1: self.cy - half_h,
            x2: self.cx + half_w,
            y2: self.cy + half_h,
        }
    }
}

impl CornerBox {
    /// Converts to center form.
    pub fn to_center(self) -> CenterBox {
        CenterBox {
            cx: (self.x1 + self.x2) / 2.0,
            cy: (self.y1 + self.y2) / 2.0,
            w: self.x2 - self.x1,
            h: self.y2 - self.y1,
        }
    }

    /// Returns the box width (negative for inverted boxes).
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Returns the box height (negative for inverted boxes).
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Returns the area, clamped at zero for degenerate boxes.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

/// Intersection over union of two corner boxes.
///
/// Boxes with zero (or negative) area overlap nothing, so the result is 0
/// whenever either box is degenerate or the union vanishes.
pub fn iou(a: &CornerBox, b: &CornerBox) -> f32 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }

    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    let union = area_a + area_b - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}
