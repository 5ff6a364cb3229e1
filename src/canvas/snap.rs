// Grid snapping for drag-moves.
//
// Each axis is rounded to the nearest multiple of the cell size
// (half-way values round away from zero). Pure and idempotent.

use crate::model::Point;

pub const GRID_SIZE: f64 = 8.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridSnapper {
    size: f64,
}

impl Default for GridSnapper {
    fn default() -> Self {
        Self::new(GRID_SIZE)
    }
}

impl GridSnapper {
    /// A non-positive or non-finite size disables snapping.
    pub fn new(size: f64) -> Self {
        Self { size }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn snap(&self, p: Point) -> Point {
        snap_to_grid(p, self.size)
    }
}

pub fn snap_to_grid(p: Point, size: f64) -> Point {
    if !(size.is_finite() && size > 0.0) {
        return p;
    }
    Point {
        x: snap_axis(p.x, size),
        y: snap_axis(p.y, size),
    }
}

fn snap_axis(v: f64, size: f64) -> f64 {
    let snapped = (v / size).round() * size;
    // Normalize -0.0 so equality checks against fresh positions behave.
    if snapped == 0.0 { 0.0 } else { snapped }
}
