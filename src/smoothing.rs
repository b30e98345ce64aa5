//! Temporal smoothing of per-class probability distributions.
//!
//! A continuous classifier re-scores every frame, and single-frame noise
//! makes the top label flap. Averaging the last few distributions before
//! picking a winner trades a few frames of latency for a stable readout.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

pub struct PredictionSmoother {
    window: usize,
    min_confidence: f32,
    buffer: VecDeque<HashMap<String, f32>>,
}

impl PredictionSmoother {
    pub fn new(window: usize, min_confidence: f32) -> Self {
        Self {
            window: window.max(1),
            min_confidence,
            buffer: VecDeque::with_capacity(window.max(1)),
        }
    }

    /// Appends one distribution, evicting the oldest at capacity.
    pub fn push(&mut self, distribution: HashMap<String, f32>) {
        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back(distribution);
    }

    /// Per-class mean over the buffered window. The key set is taken from
    /// the newest distribution; pushes are expected to share one key set,
    /// and an entry missing a key contributes zero to that key's mean.
    pub fn average(&self) -> HashMap<String, f32> {
        let Some(newest) = self.buffer.back() else {
            return HashMap::new();
        };
        let n = self.buffer.len() as f32;
        newest
            .keys()
            .map(|label| {
                let sum: f32 = self
                    .buffer
                    .iter()
                    .map(|dist| dist.get(label).copied().unwrap_or(0.0))
                    .sum();
                (label.clone(), sum / n)
            })
            .collect()
    }

    /// Highest-confidence label of the averaged window, withheld below
    /// the confidence floor. The confidence is reported either way so
    /// callers can see how close a rejected read was.
    pub fn top(&self) -> (Option<String>, f32) {
        let averaged = self.average();
        let best = averaged
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        match best {
            Some((label, conf)) if conf >= self.min_confidence => (Some(label), conf),
            Some((_, conf)) => (None, conf),
            None => (None, 0.0),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn average_is_per_class_mean() {
        let mut s = PredictionSmoother::new(5, 0.35);
        for conf in [0.1, 0.2, 0.3, 0.4, 0.5] {
            s.push(dist(&[("A", conf), ("B", 0.05)]));
        }
        let avg = s.average();
        assert!((avg["A"] - 0.3).abs() < 1e-6);
        assert!((avg["B"] - 0.05).abs() < 1e-6);
        // Averaged top sits below the 0.35 floor: label withheld, the
        // near-miss confidence still reported.
        let (label, conf) = s.top();
        assert_eq!(label, None);
        assert!((conf - 0.3).abs() < 1e-6);
    }

    #[test]
    fn top_passes_once_floor_is_met() {
        let mut s = PredictionSmoother::new(5, 0.3);
        for conf in [0.1, 0.2, 0.3, 0.4, 0.5] {
            s.push(dist(&[("A", conf), ("B", 0.05)]));
        }
        assert_eq!(s.top(), (Some("A".to_string()), 0.3));
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let mut s = PredictionSmoother::new(5, 0.0);
        // This early outlier must fall out of the window.
        s.push(dist(&[("A", 1.0)]));
        for conf in [0.1, 0.2, 0.3, 0.4, 0.5] {
            s.push(dist(&[("A", conf)]));
        }
        assert_eq!(s.len(), 5);
        assert!((s.average()["A"] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn empty_and_reset_states_report_nothing() {
        let mut s = PredictionSmoother::new(5, 0.3);
        assert_eq!(s.top(), (None, 0.0));
        s.push(dist(&[("A", 0.9)]));
        assert!(!s.is_empty());
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.top(), (None, 0.0));
    }
}
