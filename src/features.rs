//! Per-frame feature rows for the sequence models.
//!
//! Two layouts exist. The simple path flattens one hand into 63 floats
//! (x,y,z per landmark). The holistic path stacks four body regions into
//! a fixed 543-row frame (face, left hand, pose, right hand — in that
//! order), zero-filling any region the detector did not report, so the
//! downstream model always sees the same shape.

use serde::Deserialize;

use crate::landmarks::{FrameError, HandSkeleton, Landmark, HAND_LANDMARK_COUNT};

pub const HAND_FEATURE_WIDTH: usize = 3 * HAND_LANDMARK_COUNT;

pub const FACE_LANDMARK_COUNT: usize = 468;
pub const POSE_LANDMARK_COUNT: usize = 33;
pub const HOLISTIC_ROWS: usize =
    FACE_LANDMARK_COUNT + HAND_LANDMARK_COUNT + POSE_LANDMARK_COUNT + HAND_LANDMARK_COUNT;
pub const HOLISTIC_FEATURE_WIDTH: usize = 3 * HOLISTIC_ROWS;

/// One hand as a 63-float row: `[x0, y0, z0, x1, y1, z1, ...]`.
pub fn flatten_hand(skel: &HandSkeleton) -> Vec<f32> {
    let mut row = Vec::with_capacity(HAND_FEATURE_WIDTH);
    for p in skel.points() {
        row.extend_from_slice(&[p.x, p.y, p.z]);
    }
    row
}

/// Holistic detector output for one frame. Empty vectors mean the region
/// was not detected that frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionFrame {
    #[serde(default)]
    pub face: Vec<Landmark>,
    #[serde(default)]
    pub left_hand: Vec<Landmark>,
    #[serde(default)]
    pub pose: Vec<Landmark>,
    #[serde(default)]
    pub right_hand: Vec<Landmark>,
}

impl RegionFrame {
    pub fn is_empty(&self) -> bool {
        self.face.is_empty()
            && self.left_hand.is_empty()
            && self.pose.is_empty()
            && self.right_hand.is_empty()
    }

    /// Stacks the four regions into one fixed-width row. A present region
    /// must carry its full landmark count; an absent one contributes
    /// zeros so row offsets never shift.
    pub fn flatten(&self) -> Result<Vec<f32>, FrameError> {
        let mut row = Vec::with_capacity(HOLISTIC_FEATURE_WIDTH);
        push_region(&mut row, "face", &self.face, FACE_LANDMARK_COUNT)?;
        push_region(&mut row, "left_hand", &self.left_hand, HAND_LANDMARK_COUNT)?;
        push_region(&mut row, "pose", &self.pose, POSE_LANDMARK_COUNT)?;
        push_region(&mut row, "right_hand", &self.right_hand, HAND_LANDMARK_COUNT)?;
        Ok(row)
    }
}

fn push_region(
    row: &mut Vec<f32>,
    region: &'static str,
    points: &[Landmark],
    want: usize,
) -> Result<(), FrameError> {
    if points.is_empty() {
        row.extend(std::iter::repeat(0.0).take(3 * want));
        return Ok(());
    }
    if points.len() != want {
        return Err(FrameError::RegionSize {
            region,
            got: points.len(),
            want,
        });
    }
    for p in points {
        row.extend_from_slice(&[p.x, p.y, p.z]);
    }
    Ok(())
}
