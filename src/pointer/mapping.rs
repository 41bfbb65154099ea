use crate::pointer::backend::ScreenSize;
use crate::viewport::ViewportRect;

/// Upper bound of the absolute pointer addressing range on both axes.
pub const ABSOLUTE_MAX: i32 = 65535;

/// Normalized sub-rectangle `[left, right] x [top, bottom]` of the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl NormalizedBounds {
    pub const FULL: NormalizedBounds = NormalizedBounds {
        left: 0.0,
        right: 1.0,
        top: 0.0,
        bottom: 1.0,
    };

    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (clamp_axis(x, self.left, self.right), clamp_axis(y, self.top, self.bottom))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }
}

impl Default for NormalizedBounds {
    fn default() -> Self {
        Self::FULL
    }
}

/// Bounds the pointer is confined to. Without a viewport, the whole screen.
/// An inverted axis collapses to its leading edge.
pub fn viewport_bounds(viewport: Option<ViewportRect>, screen: ScreenSize) -> NormalizedBounds {
    let Some(rect) = viewport else {
        return NormalizedBounds::FULL;
    };
    if !screen.is_valid() {
        return NormalizedBounds::FULL;
    }

    let sw = f64::from(screen.width);
    let sh = f64::from(screen.height);
    let left = f64::from(rect.left) / sw;
    let top = f64::from(rect.top) / sh;
    let right = (f64::from(rect.right()) / sw).max(left);
    let bottom = (f64::from(rect.bottom()) / sh).max(top);

    NormalizedBounds {
        left,
        right,
        top,
        bottom,
    }
}

/// Scale into the absolute addressing range, truncating, then clamp.
pub fn to_absolute(x: f64, y: f64) -> (i32, i32) {
    let scale = f64::from(ABSOLUTE_MAX);
    let ax = (x * scale) as i32;
    let ay = (y * scale) as i32;
    (ax.clamp(0, ABSOLUTE_MAX), ay.clamp(0, ABSOLUTE_MAX))
}

// `f64::clamp` panics on NaN bounds and on min > max; both are excluded by
// construction, but a NaN input still has to land somewhere.
fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.max(min).min(max)
    }
}
