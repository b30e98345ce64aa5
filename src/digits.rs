//! Digit classifier: independent rule table, same machinery and priority
//! discipline as the letter table.
//!
//! The pinch digits (6-9) sit above the plain counts so a thumb touching
//! a folded fingertip is never mistaken for the count it also resembles,
//! and 3 sits above 2 because every 3-shape satisfies the 2-shape gate.

use crate::config::Thresholds;
use crate::landmarks::{HandSkeleton, Landmark};
use crate::pose::{first_match, PoseRule, PoseSnapshot, Symbol};

pub const RULES: &[PoseRule] = &[
    PoseRule { name: "9", eval: nine },
    PoseRule { name: "8", eval: eight },
    PoseRule { name: "7", eval: seven },
    PoseRule { name: "6", eval: six },
    PoseRule { name: "5", eval: five },
    PoseRule { name: "4", eval: four },
    PoseRule { name: "3", eval: three },
    PoseRule { name: "2", eval: two },
    PoseRule { name: "1", eval: one },
    PoseRule { name: "0", eval: zero },
];

/// Classifies one hand into a digit, or `None` when no row matches or the
/// input is not a valid 21-point skeleton.
pub fn classify(points: &[Landmark], t: &Thresholds) -> Option<Symbol> {
    match HandSkeleton::from_points(points) {
        Ok(skel) => classify_skeleton(&skel, t),
        Err(err) => {
            log::debug!("digit classification skipped: {err}");
            None
        }
    }
}

pub fn classify_skeleton(skel: &HandSkeleton, t: &Thresholds) -> Option<Symbol> {
    let snap = PoseSnapshot::capture(skel, t.digit_up_margin, t);
    first_match(RULES, &snap)
}

fn nine(s: &PoseSnapshot) -> Option<Symbol> {
    (s.middle.up && s.ring.up && s.pinky.up && !s.index.up
        && s.thumb_to_index_tip < s.digit_pinch_gap)
        .then_some(Symbol::Digit(9))
}

fn eight(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && s.ring.up && s.pinky.up && !s.middle.up
        && s.thumb_to_middle_tip < s.digit_pinch_gap)
        .then_some(Symbol::Digit(8))
}

fn seven(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && s.middle.up && s.pinky.up && !s.ring.up
        && s.thumb_to_ring_tip < s.digit_pinch_gap)
        .then_some(Symbol::Digit(7))
}

fn six(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && s.middle.up && s.ring.up && !s.pinky.up
        && s.thumb_to_pinky_tip < s.digit_pinch_gap)
        .then_some(Symbol::Digit(6))
}

fn five(s: &PoseSnapshot) -> Option<Symbol> {
    (s.all_fingers_up() && s.thumb_up).then_some(Symbol::Digit(5))
}

fn four(s: &PoseSnapshot) -> Option<Symbol> {
    (s.all_fingers_up() && !s.thumb_up).then_some(Symbol::Digit(4))
}

fn three(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && s.middle.up && s.thumb_up && !s.ring.up && !s.pinky.up)
        .then_some(Symbol::Digit(3))
}

fn two(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && s.middle.up && !s.ring.up && !s.pinky.up).then_some(Symbol::Digit(2))
}

fn one(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && !s.middle.up && !s.ring.up && !s.pinky.up).then_some(Symbol::Digit(1))
}

fn zero(s: &PoseSnapshot) -> Option<Symbol> {
    s.no_finger_up().then_some(Symbol::Digit(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::tests::{fist, lm, raise, FINGERS};
    use crate::landmarks::{index, HAND_LANDMARK_COUNT};

    fn digit(pts: &[Landmark; HAND_LANDMARK_COUNT]) -> Option<u8> {
        match classify(pts, &Thresholds::default()) {
            Some(Symbol::Digit(d)) => Some(d),
            Some(Symbol::Letter(c)) => panic!("digit table produced letter {c}"),
            None => None,
        }
    }

    /// Thumb extended upward, clear of the knuckle margin.
    fn raise_thumb(pts: &mut [Landmark; HAND_LANDMARK_COUNT]) {
        pts[index::THUMB_IP] = lm(0.46, 0.50);
        pts[index::THUMB_TIP] = lm(0.46, 0.40);
    }

    #[test]
    fn wrong_point_count_yields_none() {
        let pts = vec![Landmark::default(); 22];
        assert_eq!(classify(&pts, &Thresholds::default()), None);
    }

    #[test]
    fn three_shadows_two_when_thumb_is_up() {
        let mut pts = fist();
        raise(&mut pts, index::INDEX_MCP);
        raise(&mut pts, index::MIDDLE_MCP);
        raise_thumb(&mut pts);
        // Satisfies the 2-shape gate as well; the 3 row must win.
        assert_eq!(digit(&pts), Some(3));
    }

    #[test]
    fn raised_pair_without_thumb_is_two() {
        let mut pts = fist();
        raise(&mut pts, index::INDEX_MCP);
        raise(&mut pts, index::MIDDLE_MCP);
        assert_eq!(digit(&pts), Some(2));
    }

    #[test]
    fn open_hand_splits_on_thumb() {
        let mut pts = fist();
        for (mcp, _) in FINGERS {
            raise(&mut pts, mcp);
        }
        assert_eq!(digit(&pts), Some(4));
        raise_thumb(&mut pts);
        assert_eq!(digit(&pts), Some(5));
    }

    #[test]
    fn index_pinch_with_three_up_is_nine() {
        let mut pts = fist();
        raise(&mut pts, index::MIDDLE_MCP);
        raise(&mut pts, index::RING_MCP);
        raise(&mut pts, index::PINKY_MCP);
        // Folded index tip (0.44, 0.62) sits 0.036 from the tucked thumb.
        assert_eq!(digit(&pts), Some(9));
    }

    #[test]
    fn middle_pinch_is_eight() {
        let mut pts = fist();
        raise(&mut pts, index::INDEX_MCP);
        raise(&mut pts, index::RING_MCP);
        raise(&mut pts, index::PINKY_MCP);
        assert_eq!(digit(&pts), Some(8));
    }

    #[test]
    fn ring_pinch_is_seven() {
        let mut pts = fist();
        raise(&mut pts, index::INDEX_MCP);
        raise(&mut pts, index::MIDDLE_MCP);
        raise(&mut pts, index::PINKY_MCP);
        pts[index::THUMB_TIP] = lm(0.53, 0.60);
        assert_eq!(digit(&pts), Some(7));
    }

    #[test]
    fn pinky_pinch_is_six() {
        let mut pts = fist();
        raise(&mut pts, index::INDEX_MCP);
        raise(&mut pts, index::MIDDLE_MCP);
        raise(&mut pts, index::RING_MCP);
        pts[index::THUMB_TIP] = lm(0.58, 0.60);
        assert_eq!(digit(&pts), Some(6));
    }

    #[test]
    fn lone_index_is_one_and_fist_is_zero() {
        let mut pts = fist();
        assert_eq!(digit(&pts), Some(0));
        raise(&mut pts, index::INDEX_MCP);
        assert_eq!(digit(&pts), Some(1));
    }

    #[test]
    fn lone_middle_matches_nothing() {
        let mut pts = fist();
        raise(&mut pts, index::MIDDLE_MCP);
        assert_eq!(digit(&pts), None);
    }
}
