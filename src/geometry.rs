//! Geometric predicates over individual landmarks.
//!
//! All predicates work in the image plane: `y` grows downward, so a tip
//! that is *above* its knuckle on screen has the *smaller* `y`. Depth is
//! deliberately ignored here; the detector's `z` is too noisy to gate
//! finger-state decisions on.

use crate::landmarks::Landmark;

/// Euclidean distance in the image plane (x/y only).
pub fn distance(a: Landmark, b: Landmark) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Tip clearly above its knuckle: `tip.y < mcp.y - margin`.
pub fn is_finger_up(tip: Landmark, mcp: Landmark, margin: f32) -> bool {
    tip.y < mcp.y - margin
}

/// Tip folded back below its middle joint.
pub fn is_finger_curved(tip: Landmark, pip: Landmark) -> bool {
    tip.y > pip.y
}

/// Tip roughly level with its knuckle but displaced horizontally.
pub fn is_finger_sideways(tip: Landmark, mcp: Landmark, y_tol: f32, x_min: f32) -> bool {
    (tip.y - mcp.y).abs() < y_tol && (tip.x - mcp.x).abs() > x_min
}

/// Thumb tip pushed out past the index knuckle on the x axis.
pub fn is_thumb_out(thumb_tip: Landmark, index_mcp: Landmark, margin: f32) -> bool {
    thumb_tip.x > index_mcp.x + margin
}
