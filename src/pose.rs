//! Per-frame predicate snapshot and the rule-table machinery shared by
//! the alphabet and digit classifiers.
//!
//! A [`PoseSnapshot`] is computed once per skeleton and carries every
//! boolean and distance the rule tables look at, so rule evaluation is
//! pure table-walking with no landmark access. Rule order inside a table
//! is the tie-break: the first rule returning a symbol wins.

use std::fmt;

use crate::config::Thresholds;
use crate::geometry::{distance, is_finger_curved, is_finger_sideways, is_finger_up, is_thumb_out};
use crate::landmarks::{index, HandSkeleton};

/// A classified hand configuration: one uppercase letter or one digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Letter(char),
    Digit(u8),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Letter(c) => write!(f, "{c}"),
            Symbol::Digit(d) => write!(f, "{d}"),
        }
    }
}

/// Extension state of one finger, relative to its own joints.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerFlags {
    pub up: bool,
    pub curved: bool,
    pub sideways: bool,
}

impl FingerFlags {
    fn capture(skel: &HandSkeleton, mcp: usize, up_margin: f32, t: &Thresholds) -> Self {
        // Joints sit at fixed offsets from the knuckle: pip = mcp+1,
        // tip = mcp+3.
        let tip = skel[mcp + 3];
        let pip = skel[mcp + 1];
        let knuckle = skel[mcp];
        Self {
            up: is_finger_up(tip, knuckle, up_margin),
            curved: is_finger_curved(tip, pip),
            sideways: is_finger_sideways(tip, knuckle, t.sideways_y_tol, t.sideways_x_min),
        }
    }
}

/// Everything the rule tables discriminate on, computed once per frame.
#[derive(Debug, Clone, Copy)]
pub struct PoseSnapshot {
    pub index: FingerFlags,
    pub middle: FingerFlags,
    pub ring: FingerFlags,
    pub pinky: FingerFlags,
    /// Thumb pushed out past the index knuckle.
    pub thumb_out: bool,
    /// Thumb tip above the thumb knuckle by the same margin as the fingers.
    pub thumb_up: bool,
    pub thumb_to_middle_pip: f32,
    pub thumb_to_index_tip: f32,
    pub thumb_to_middle_tip: f32,
    pub thumb_to_ring_tip: f32,
    pub thumb_to_pinky_tip: f32,
    pub thumb_middle_tip_dy: f32,
    pub thumb_ring_tip_dy: f32,
    // Gap thresholds travel with the snapshot so rule functions stay
    // plain fn pointers.
    pub k_thumb_gap: f32,
    pub f_pinch_gap: f32,
    pub d_thumb_y_gap: f32,
    pub digit_pinch_gap: f32,
}

impl PoseSnapshot {
    /// Derives the snapshot. `up_margin` differs between the alphabet and
    /// digit tables, so it is passed separately from the shared thresholds.
    pub fn capture(skel: &HandSkeleton, up_margin: f32, t: &Thresholds) -> Self {
        let thumb = skel[index::THUMB_TIP];
        let snap = Self {
            index: FingerFlags::capture(skel, index::INDEX_MCP, up_margin, t),
            middle: FingerFlags::capture(skel, index::MIDDLE_MCP, up_margin, t),
            ring: FingerFlags::capture(skel, index::RING_MCP, up_margin, t),
            pinky: FingerFlags::capture(skel, index::PINKY_MCP, up_margin, t),
            thumb_out: is_thumb_out(thumb, skel[index::INDEX_MCP], t.thumb_out_margin),
            thumb_up: is_finger_up(thumb, skel[index::THUMB_MCP], up_margin),
            thumb_to_middle_pip: distance(thumb, skel[index::MIDDLE_PIP]),
            thumb_to_index_tip: distance(thumb, skel[index::INDEX_TIP]),
            thumb_to_middle_tip: distance(thumb, skel[index::MIDDLE_TIP]),
            thumb_to_ring_tip: distance(thumb, skel[index::RING_TIP]),
            thumb_to_pinky_tip: distance(thumb, skel[index::PINKY_TIP]),
            thumb_middle_tip_dy: (thumb.y - skel[index::MIDDLE_TIP].y).abs(),
            thumb_ring_tip_dy: (thumb.y - skel[index::RING_TIP].y).abs(),
            k_thumb_gap: t.k_thumb_gap,
            f_pinch_gap: t.f_pinch_gap,
            d_thumb_y_gap: t.d_thumb_y_gap,
            digit_pinch_gap: t.digit_pinch_gap,
        };
        log::trace!("predicate snapshot: {snap:?}");
        snap
    }

    pub fn fingers(&self) -> [FingerFlags; 4] {
        [self.index, self.middle, self.ring, self.pinky]
    }

    pub fn all_fingers_up(&self) -> bool {
        self.fingers().iter().all(|f| f.up)
    }

    pub fn no_finger_up(&self) -> bool {
        self.fingers().iter().all(|f| !f.up)
    }

    pub fn curved_count(&self) -> usize {
        self.fingers().iter().filter(|f| f.curved).count()
    }
}

/// One row of a classifier table. Rows are evaluated top to bottom and
/// the first one producing a symbol wins, so a row's position encodes
/// its priority over everything below it.
pub struct PoseRule {
    pub name: &'static str,
    pub eval: fn(&PoseSnapshot) -> Option<Symbol>,
}

/// Walks a rule table in order, returning the first match.
pub fn first_match(rules: &[PoseRule], snap: &PoseSnapshot) -> Option<Symbol> {
    for rule in rules {
        if let Some(sym) = (rule.eval)(snap) {
            log::trace!("rule '{}' matched: {sym}", rule.name);
            return Some(sym);
        }
    }
    log::trace!("no rule matched");
    None
}
