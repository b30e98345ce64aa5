//! Hand orientation: a coarse diagnostic label and rotation normalization.
//!
//! When a profile enables `[orientation] normalize`, incoming skeletons
//! are rotated about the wrist until the hand direction vector points
//! canonically up, and the rule cascades run on the normalized copy. The
//! shipped profile leaves this off: the sideways rule rows (G, H) are
//! themselves the horizontal-hand handling, and the stock thresholds
//! were tuned on unrotated coordinates. The coarse Vertical/Horizontal
//! label is always computed for status and frame responses, but nothing
//! downstream branches on it.

use serde::Serialize;

use crate::landmarks::{index, HandSkeleton, Landmark};

/// Direction vectors shorter than this are treated as degenerate.
const MIN_DIRECTION_NORM: f32 = 1e-6;

/// Coarse pointing direction of the hand in the image plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandOrientation {
    Vertical,
    Horizontal,
}

/// Hand direction vector: wrist to the centroid of the four finger
/// knuckles (index, middle, ring, pinky).
pub fn direction(skel: &HandSkeleton) -> (f32, f32) {
    let wrist = skel.wrist();
    let knuckles = [
        skel[index::INDEX_MCP],
        skel[index::MIDDLE_MCP],
        skel[index::RING_MCP],
        skel[index::PINKY_MCP],
    ];
    let cx = knuckles.iter().map(|p| p.x).sum::<f32>() / knuckles.len() as f32;
    let cy = knuckles.iter().map(|p| p.y).sum::<f32>() / knuckles.len() as f32;
    (cx - wrist.x, cy - wrist.y)
}

/// Labels the hand Vertical when the direction vector's y component
/// outweighs its x component by `vertical_bias`. The bias deliberately
/// favors Horizontal so a mid-diagonal hand does not flap between
/// labels frame to frame.
pub fn orientation_label(skel: &HandSkeleton, vertical_bias: f32) -> HandOrientation {
    let (vx, vy) = direction(skel);
    if vy.abs() > vertical_bias * vx.abs() {
        HandOrientation::Vertical
    } else {
        HandOrientation::Horizontal
    }
}

/// Rotates every landmark about the wrist so the hand direction vector
/// points straight up-screen. `z` passes through untouched. A degenerate
/// direction (knuckle centroid on the wrist) returns the skeleton
/// unchanged. Applying this twice yields the same points as applying it
/// once, up to float rounding.
pub fn normalize_rotation(skel: &HandSkeleton) -> HandSkeleton {
    let (vx, vy) = direction(skel);
    let norm = (vx * vx + vy * vy).sqrt();
    if norm < MIN_DIRECTION_NORM {
        return skel.clone();
    }

    // Canonical up is (0, -1) in image coordinates.
    let theta = (-std::f32::consts::FRAC_PI_2) - vy.atan2(vx);
    let (sin_t, cos_t) = theta.sin_cos();
    let wrist = skel.wrist();

    let mut rotated = *skel.points();
    for p in rotated.iter_mut() {
        let dx = p.x - wrist.x;
        let dy = p.y - wrist.y;
        *p = Landmark::new(
            wrist.x + cos_t * dx - sin_t * dy,
            wrist.y + sin_t * dx + cos_t * dy,
            p.z,
        );
    }
    HandSkeleton::from_array(rotated)
}
