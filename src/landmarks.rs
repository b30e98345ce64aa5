//! Hand landmark types and the 21-point skeleton contract.

use serde::Deserialize;
use thiserror::Error;

/// Landmarks per detected hand (MediaPipe hand model).
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Hand landmark indices (MediaPipe hand landmark model convention).
#[allow(dead_code)]
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// A single detected keypoint in normalized image coordinates.
///
/// `x` and `y` are image fractions (y grows downward); `z` is relative
/// depth as reported by the detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Malformed per-frame input from the detector boundary.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("expected {HAND_LANDMARK_COUNT} hand landmarks, got {0}")]
    LandmarkCount(usize),
    #[error("region '{region}' carries {got} landmarks, expected {want}")]
    RegionSize {
        region: &'static str,
        got: usize,
        want: usize,
    },
    #[error("frame carries no features")]
    EmptyFrame,
}

/// One detected hand: exactly 21 landmarks in fixed anatomical order.
///
/// Construction goes through [`HandSkeleton::from_points`], which is the
/// single place the 21-point invariant is enforced; everything downstream
/// may index by the `index` constants without bounds concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSkeleton {
    points: [Landmark; HAND_LANDMARK_COUNT],
}

impl HandSkeleton {
    /// Validates the landmark count and takes a copy of the points.
    pub fn from_points(points: &[Landmark]) -> Result<Self, FrameError> {
        if points.len() != HAND_LANDMARK_COUNT {
            return Err(FrameError::LandmarkCount(points.len()));
        }
        let mut fixed = [Landmark::default(); HAND_LANDMARK_COUNT];
        fixed.copy_from_slice(points);
        Ok(Self { points: fixed })
    }

    pub fn from_array(points: [Landmark; HAND_LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark; HAND_LANDMARK_COUNT] {
        &self.points
    }

    pub fn wrist(&self) -> Landmark {
        self.points[index::WRIST]
    }
}

impl std::ops::Index<usize> for HandSkeleton {
    type Output = Landmark;

    fn index(&self, i: usize) -> &Landmark {
        &self.points[i]
    }
}
