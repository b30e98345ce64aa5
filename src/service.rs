//! The recognizer service: one instance owns every piece of runtime
//! state (active profile, session registry, smoothing buffer, optional
//! sequence model) and exposes the operations the IPC layer dispatches
//! to. All methods take `&self` and are safe to call from concurrent
//! client threads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::Profile;
use crate::landmarks::{HandSkeleton, Landmark};
use crate::orientation::{normalize_rotation, orientation_label, HandOrientation};
use crate::pose::Symbol;
use crate::sequence::{self, Prediction, SequenceModel};
use crate::session::{FrameRow, SessionRegistry};
use crate::smoothing::PredictionSmoother;
use crate::{alphabet, digits};

/// Which rule table a static classification runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMode {
    Letters,
    Digits,
}

impl SymbolMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "letters" => Some(Self::Letters),
            "digits" => Some(Self::Digits),
            _ => None,
        }
    }
}

/// Static classification of one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandReading {
    pub symbol: Option<String>,
    pub orientation: Option<HandOrientation>,
}

/// Outcome of a sequence-path operation for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    /// Buffered frames after the operation (zero right after a
    /// consume-and-reset drain).
    pub len: usize,
    pub model_loaded: bool,
    /// Present only when a sequence was actually handed to the model.
    pub prediction: Option<Prediction>,
}

pub struct Recognizer {
    profile: Arc<Mutex<Profile>>,
    sessions: SessionRegistry,
    smoother: Mutex<PredictionSmoother>,
    model: Option<Box<dyn SequenceModel>>,
}

impl Recognizer {
    pub fn new(profile: Profile) -> Self {
        let smoother = PredictionSmoother::new(
            profile.smoothing.window,
            profile.smoothing.min_confidence,
        );
        Self {
            profile: Arc::new(Mutex::new(profile)),
            sessions: SessionRegistry::new(),
            smoother: Mutex::new(smoother),
            model: None,
        }
    }

    /// Attaches the sequence-model collaborator. Without one, the
    /// sequence path still buffers frames and reports the model missing.
    pub fn with_model(mut self, model: Box<dyn SequenceModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn profile(&self) -> Profile {
        self.profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps the active profile. Running sessions keep the capacity
    /// policy they were created with; the smoothing window is rebuilt.
    pub fn update_profile(&self, new_profile: Profile) {
        {
            let mut s = self.smoother.lock().unwrap_or_else(PoisonError::into_inner);
            *s = PredictionSmoother::new(
                new_profile.smoothing.window,
                new_profile.smoothing.min_confidence,
            );
        }
        let mut p = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        *p = new_profile;
    }

    /// Classifies one hand against the chosen rule table. Invalid
    /// skeletons (wrong point count) yield an empty reading, never an
    /// error.
    pub fn classify_hand(&self, points: &[Landmark], mode: SymbolMode) -> HandReading {
        let profile = self.profile();
        let skel = match HandSkeleton::from_points(points) {
            Ok(skel) => skel,
            Err(err) => {
                log::debug!("frame rejected: {err}");
                return HandReading {
                    symbol: None,
                    orientation: None,
                };
            }
        };

        let label = orientation_label(&skel, profile.thresholds.vertical_bias);
        let skel = if profile.orientation.normalize {
            normalize_rotation(&skel)
        } else {
            skel
        };

        let symbol = match mode {
            SymbolMode::Letters => alphabet::classify_skeleton(&skel, &profile.thresholds),
            SymbolMode::Digits => digits::classify_skeleton(&skel, &profile.thresholds),
        };
        HandReading {
            symbol: symbol.as_ref().map(Symbol::to_string),
            orientation: Some(label),
        }
    }

    /// Classifies every hand in a frame, output order matching input.
    pub fn classify_hands(&self, hands: &[Vec<Landmark>], mode: SymbolMode) -> Vec<HandReading> {
        hands.iter().map(|h| self.classify_hand(h, mode)).collect()
    }

    /// Appends one feature row to a session and, when the capacity
    /// policy exposes a sequence, runs the model over it. Model failures
    /// are logged and reported as "no prediction"; the frame stays
    /// buffered either way.
    pub fn append_frame(&self, session: &str, row: FrameRow) -> SequenceReport {
        let seq_cfg = self.profile().sequence;
        let outcome = self
            .sessions
            .append(session, seq_cfg.capacity_policy(), row);

        let mut report = SequenceReport {
            len: outcome.len,
            model_loaded: self.model.is_some(),
            prediction: None,
        };
        if let Some(ready) = outcome.ready {
            report.prediction = self.run_model(&ready, seq_cfg.min_confidence);
        }
        report
    }

    /// On-demand prediction over a session's current buffer. An unknown
    /// or empty session reports no prediction without touching the model.
    pub fn predict_session(&self, session: &str) -> SequenceReport {
        let seq_cfg = self.profile().sequence;
        let frames = self.sessions.snapshot(session).unwrap_or_default();
        let mut report = SequenceReport {
            len: frames.len(),
            model_loaded: self.model.is_some(),
            prediction: None,
        };
        if !frames.is_empty() {
            report.prediction = self.run_model(&frames, seq_cfg.min_confidence);
        }
        report
    }

    fn run_model(&self, frames: &[FrameRow], min_confidence: f32) -> Option<Prediction> {
        let model = self.model.as_ref()?;
        match sequence::predict(model.as_ref(), frames, min_confidence) {
            Ok(prediction) => Some(prediction),
            Err(err) => {
                log::error!("sequence model failed: {err}");
                None
            }
        }
    }

    pub fn session_len(&self, session: &str) -> usize {
        self.sessions.frame_count(session)
    }

    pub fn reset_session(&self, session: &str) -> bool {
        self.sessions.reset(session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    /// Drops sessions idle past the profile's timeout. Called from the
    /// daemon's housekeeping tick.
    pub fn sweep_idle_sessions(&self) -> usize {
        let timeout = Duration::from_secs(self.profile().session.idle_timeout_s);
        self.sessions.evict_idle(timeout)
    }

    /// Pushes one per-class distribution into the smoothing window and
    /// returns the smoothed verdict plus the window fill.
    pub fn smooth(&self, distribution: HashMap<String, f32>) -> (Option<String>, f32, usize) {
        let mut s = self.smoother.lock().unwrap_or_else(PoisonError::into_inner);
        s.push(distribution);
        let (label, confidence) = s.top();
        (label, confidence, s.len())
    }

    pub fn smoother_fill(&self) -> (usize, usize) {
        let s = self.smoother.lock().unwrap_or_else(PoisonError::into_inner);
        (s.len(), s.window())
    }

    pub fn reset_smoother(&self) {
        self.smoother
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::tests::{fist, raise};
    use crate::landmarks::index;
    use anyhow::Result;

    struct StubModel {
        labels: Vec<String>,
        scores: Vec<f32>,
    }

    impl StubModel {
        fn boxed(pairs: &[(&str, f32)]) -> Box<dyn SequenceModel> {
            Box::new(Self {
                labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
                scores: pairs.iter().map(|(_, s)| *s).collect(),
            })
        }
    }

    impl SequenceModel for StubModel {
        fn seq_len(&self) -> usize {
            30
        }
        fn feature_width(&self) -> usize {
            63
        }
        fn labels(&self) -> &[String] {
            &self.labels
        }
        fn score(&self, _: &[FrameRow]) -> Result<Vec<f32>> {
            Ok(self.scores.clone())
        }
    }

    struct UnreachableModel;

    impl SequenceModel for UnreachableModel {
        fn seq_len(&self) -> usize {
            30
        }
        fn feature_width(&self) -> usize {
            63
        }
        fn labels(&self) -> &[String] {
            static NONE: Vec<String> = Vec::new();
            &NONE
        }
        fn score(&self, _: &[FrameRow]) -> Result<Vec<f32>> {
            panic!("model must not run for an empty session");
        }
    }

    fn v_hand() -> Vec<Landmark> {
        let mut pts = fist();
        raise(&mut pts, index::INDEX_MCP);
        raise(&mut pts, index::MIDDLE_MCP);
        pts.to_vec()
    }

    /// Rotates every point about the wrist, undoing nothing: simulates a
    /// camera seeing the same hand tilted.
    fn tilt(points: &[Landmark], radians: f32) -> Vec<Landmark> {
        let wrist = points[index::WRIST];
        let (sin_t, cos_t) = radians.sin_cos();
        points
            .iter()
            .map(|p| {
                let dx = p.x - wrist.x;
                let dy = p.y - wrist.y;
                Landmark::new(
                    wrist.x + cos_t * dx - sin_t * dy,
                    wrist.y + sin_t * dx + cos_t * dy,
                    p.z,
                )
            })
            .collect()
    }

    #[test]
    fn classifies_letters_and_digits_by_mode() {
        let svc = Recognizer::new(Profile::default());
        let hand = v_hand();
        let letters = svc.classify_hand(&hand, SymbolMode::Letters);
        assert_eq!(letters.symbol.as_deref(), Some("V"));
        let digits = svc.classify_hand(&hand, SymbolMode::Digits);
        assert_eq!(digits.symbol.as_deref(), Some("2"));
        assert_eq!(letters.orientation, Some(HandOrientation::Vertical));
    }

    #[test]
    fn invalid_hand_reads_as_nothing() {
        let svc = Recognizer::new(Profile::default());
        let reading = svc.classify_hand(&[Landmark::default(); 20], SymbolMode::Letters);
        assert_eq!(reading.symbol, None);
        assert_eq!(reading.orientation, None);
    }

    #[test]
    fn normalization_recovers_a_tilted_hand() {
        // Near-horizontal V: 1.45 rad is ~83 degrees of camera tilt.
        let tilted = tilt(&v_hand(), 1.45);

        let mut profile = Profile::default();
        profile.orientation.normalize = true;
        let svc = Recognizer::new(profile);
        let reading = svc.classify_hand(&tilted, SymbolMode::Letters);
        assert_eq!(reading.symbol.as_deref(), Some("V"));

        // Without normalization the raised pair sits level with its
        // knuckles, so the sideways rows read it as H instead.
        let raw = Recognizer::new(Profile::default());
        let reading = raw.classify_hand(&tilted, SymbolMode::Letters);
        assert_eq!(reading.symbol.as_deref(), Some("H"));
    }

    #[test]
    fn hands_keep_input_order() {
        let svc = Recognizer::new(Profile::default());
        let readings = svc.classify_hands(
            &[v_hand(), fist().to_vec()],
            SymbolMode::Letters,
        );
        assert_eq!(readings[0].symbol.as_deref(), Some("V"));
        assert_eq!(readings[1].symbol.as_deref(), Some("E"));
    }

    #[test]
    fn sliding_session_predicts_once_warm() {
        let svc =
            Recognizer::new(Profile::default()).with_model(StubModel::boxed(&[("hello", 0.9)]));
        let row = vec![0.0; 63];
        for i in 1..20 {
            let report = svc.append_frame("cam-1", row.clone());
            assert_eq!(report.len, i);
            assert_eq!(report.prediction, None, "not warm at {i} frames");
        }
        let report = svc.append_frame("cam-1", row);
        assert_eq!(report.len, 20);
        let p = report.prediction.unwrap();
        assert_eq!(p.label.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_model_still_buffers_frames() {
        let svc = Recognizer::new(Profile::default());
        for _ in 0..25 {
            let report = svc.append_frame("cam-1", vec![0.0; 63]);
            assert!(!report.model_loaded);
            assert_eq!(report.prediction, None);
        }
        assert_eq!(svc.session_len("cam-1"), 25);
    }

    #[test]
    fn empty_session_never_reaches_the_model() {
        let svc = Recognizer::new(Profile::default()).with_model(Box::new(UnreachableModel));
        let report = svc.predict_session("ghost");
        assert_eq!(report.len, 0);
        assert_eq!(report.prediction, None);
    }

    #[test]
    fn update_profile_survives_a_poisoned_lock() {
        let svc = Recognizer::new(Profile::default());
        let poisoner = svc.profile.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poisoning the profile lock");
        })
        .join();

        let mut profile = Profile::default();
        profile.smoothing.window = 7;
        svc.update_profile(profile);
        assert_eq!(svc.profile().smoothing.window, 7);
        assert_eq!(svc.smoother_fill(), (0, 7));
    }

    #[test]
    fn reset_forgets_a_session() {
        let svc = Recognizer::new(Profile::default());
        svc.append_frame("cam-1", vec![0.0; 63]);
        assert!(svc.reset_session("cam-1"));
        assert_eq!(svc.session_len("cam-1"), 0);
        assert!(!svc.reset_session("cam-1"));
    }

    #[test]
    fn smoothing_round_trip() {
        let svc = Recognizer::new(Profile::default());
        let mut verdict = (None, 0.0, 0);
        for conf in [0.1, 0.2, 0.3, 0.4, 0.5] {
            let dist: HashMap<String, f32> = [("A".to_string(), conf)].into_iter().collect();
            verdict = svc.smooth(dist);
        }
        let (label, conf, fill) = verdict;
        assert_eq!(label.as_deref(), Some("A"));
        assert!((conf - 0.3).abs() < 1e-6);
        assert_eq!(fill, 5);
        svc.reset_smoother();
        assert_eq!(svc.smoother_fill(), (0, 5));
    }
}
