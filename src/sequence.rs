//! Sequence-model boundary: shape fitting, scoring, and the acceptance
//! threshold.
//!
//! The model itself is a collaborator behind [`SequenceModel`]; this
//! module owns everything around the call. Buffered frames rarely match
//! the model's input shape exactly, so the tail of the buffer is fitted
//! to `seq_len` rows (padding by repeating the final frame) and every
//! row to `feature_width` floats before scoring.

use anyhow::{Result, anyhow};
use std::cmp::Ordering;

use crate::session::FrameRow;

/// A learned classifier over fixed-shape frame sequences.
pub trait SequenceModel: Send + Sync {
    /// Rows per scored sequence.
    fn seq_len(&self) -> usize;
    /// Floats per row.
    fn feature_width(&self) -> usize;
    /// Class labels, index-aligned with [`SequenceModel::score`] output.
    fn labels(&self) -> &[String];
    /// Scores one sequence of exactly `seq_len` x `feature_width`.
    fn score(&self, sequence: &[FrameRow]) -> Result<Vec<f32>>;
}

/// Model verdict for one sequence. `label` is withheld below the
/// acceptance threshold; `confidence` carries the top score either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: Option<String>,
    pub confidence: f32,
}

impl Prediction {
    pub fn none() -> Self {
        Self {
            label: None,
            confidence: 0.0,
        }
    }
}

/// Fits buffered frames to the model's input shape: keeps the most
/// recent `seq_len` rows, repeats the final row to fill a short buffer,
/// and zero-pads or truncates each row to `width`. Returns `None` when
/// there is nothing to fit.
pub fn prepare_sequence(frames: &[FrameRow], seq_len: usize, width: usize) -> Option<Vec<FrameRow>> {
    if frames.is_empty() || seq_len == 0 {
        return None;
    }
    let start = frames.len().saturating_sub(seq_len);
    let mut seq: Vec<FrameRow> = frames[start..].iter().map(|r| fit_width(r, width)).collect();
    let pad = seq.last()?.clone();
    while seq.len() < seq_len {
        seq.push(pad.clone());
    }
    Some(seq)
}

fn fit_width(row: &[f32], width: usize) -> FrameRow {
    let mut out = row.to_vec();
    out.truncate(width);
    out.resize(width, 0.0);
    out
}

/// Runs the model over the buffered frames and applies the acceptance
/// threshold to the argmax score.
pub fn predict(
    model: &dyn SequenceModel,
    frames: &[FrameRow],
    min_confidence: f32,
) -> Result<Prediction> {
    let Some(seq) = prepare_sequence(frames, model.seq_len(), model.feature_width()) else {
        return Ok(Prediction::none());
    };
    let scores = model.score(&seq)?;
    let labels = model.labels();
    if scores.len() != labels.len() {
        return Err(anyhow!(
            "model returned {} scores for {} labels",
            scores.len(),
            labels.len()
        ));
    }

    let best = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal));
    let Some((idx, &confidence)) = best else {
        return Ok(Prediction::none());
    };

    if confidence >= min_confidence {
        log::debug!("sequence model: '{}' at {confidence:.3}", labels[idx]);
        Ok(Prediction {
            label: Some(labels[idx].clone()),
            confidence,
        })
    } else {
        log::debug!(
            "sequence model: top '{}' at {confidence:.3} below floor {min_confidence}",
            labels[idx]
        );
        Ok(Prediction {
            label: None,
            confidence,
        })
    }
}
