//! Letter classifier: an ordered rule table over the predicate snapshot.
//!
//! Table order is load-bearing. Earlier rows encode more specific hand
//! shapes; reordering them changes which symbol wins when a skeleton
//! satisfies several rows (V/K before L, H before G, and so on).

use crate::config::Thresholds;
use crate::landmarks::{HandSkeleton, Landmark};
use crate::pose::{first_match, PoseRule, PoseSnapshot, Symbol};

pub const RULES: &[PoseRule] = &[
    PoseRule { name: "V/K", eval: v_or_k },
    PoseRule { name: "L", eval: l },
    PoseRule { name: "Y", eval: y },
    PoseRule { name: "H", eval: h },
    PoseRule { name: "G", eval: g },
    PoseRule { name: "F", eval: f },
    PoseRule { name: "D", eval: d },
    PoseRule { name: "I", eval: i },
    PoseRule { name: "A/E", eval: a_or_e },
    PoseRule { name: "B/C", eval: b_or_c },
];

/// Classifies one hand into a letter, or `None` when no row matches or
/// the input is not a valid 21-point skeleton. Never panics on malformed
/// input; a bad frame is an expected runtime condition.
pub fn classify(points: &[Landmark], t: &Thresholds) -> Option<Symbol> {
    match HandSkeleton::from_points(points) {
        Ok(skel) => classify_skeleton(&skel, t),
        Err(err) => {
            log::debug!("letter classification skipped: {err}");
            None
        }
    }
}

pub fn classify_skeleton(skel: &HandSkeleton, t: &Thresholds) -> Option<Symbol> {
    let snap = PoseSnapshot::capture(skel, t.letter_up_margin, t);
    first_match(RULES, &snap)
}

fn v_or_k(s: &PoseSnapshot) -> Option<Symbol> {
    if !(s.index.up && s.middle.up && !s.ring.up && !s.pinky.up) {
        return None;
    }
    // K tucks the thumb up against the middle finger's pip; V leaves it
    // away from the raised pair.
    let tucked = s.thumb_up && !s.thumb_out && s.thumb_to_middle_pip < s.k_thumb_gap;
    Some(Symbol::Letter(if tucked { 'K' } else { 'V' }))
}

fn l(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.up && !s.middle.up && !s.ring.up && !s.pinky.up && s.thumb_out)
        .then_some(Symbol::Letter('L'))
}

fn y(s: &PoseSnapshot) -> Option<Symbol> {
    (s.thumb_out && s.pinky.up && !s.index.up && !s.middle.up && !s.ring.up)
        .then_some(Symbol::Letter('Y'))
}

fn h(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.sideways && s.middle.sideways && !s.ring.up && !s.pinky.up)
        .then_some(Symbol::Letter('H'))
}

fn g(s: &PoseSnapshot) -> Option<Symbol> {
    (s.index.sideways && !s.middle.sideways && !s.middle.up && !s.ring.up && !s.pinky.up)
        .then_some(Symbol::Letter('G'))
}

fn f(s: &PoseSnapshot) -> Option<Symbol> {
    (s.middle.up && s.ring.up && s.pinky.up && !s.index.up && s.thumb_to_index_tip < s.f_pinch_gap)
        .then_some(Symbol::Letter('F'))
}

fn d(s: &PoseSnapshot) -> Option<Symbol> {
    let index_only = s.index.up && !s.middle.up && !s.ring.up && !s.pinky.up;
    let thumb_rests_on_folded_tips =
        s.thumb_middle_tip_dy < s.d_thumb_y_gap || s.thumb_ring_tip_dy < s.d_thumb_y_gap;
    (index_only && !s.thumb_out && thumb_rests_on_folded_tips).then_some(Symbol::Letter('D'))
}

fn i(s: &PoseSnapshot) -> Option<Symbol> {
    (s.pinky.up && !s.index.up && !s.middle.up && !s.ring.up).then_some(Symbol::Letter('I'))
}

fn a_or_e(s: &PoseSnapshot) -> Option<Symbol> {
    let closed = s.no_finger_up() && s.fingers().iter().all(|f| !f.sideways);
    if !closed {
        return None;
    }
    Some(Symbol::Letter(if s.thumb_out { 'A' } else { 'E' }))
}

fn b_or_c(s: &PoseSnapshot) -> Option<Symbol> {
    if !s.all_fingers_up() {
        return None;
    }
    if s.curved_count() == 0 && !s.thumb_out {
        Some(Symbol::Letter('B'))
    } else if s.curved_count() >= 3 {
        Some(Symbol::Letter('C'))
    } else {
        None
    }
}
