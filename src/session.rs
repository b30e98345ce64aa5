//! Session-scoped frame buffers.
//!
//! Every streaming client gets an isolated, ordered buffer of feature
//! rows keyed by an opaque session id. The registry owns all buffers and
//! hands out per-session locks, so two clients never contend beyond the
//! brief map lookup and two frames of one session never interleave with
//! another's. Frame order within a session is the caller's contract:
//! rows are appended in arrival order and never reordered here.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One frame of model features (63 floats for a single hand, 1629 for a
/// holistic frame).
pub type FrameRow = Vec<f32>;

/// What a buffer does when frames keep arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityPolicy {
    /// Keep the newest `max_len` rows, dropping from the front. Once
    /// `min_len` rows are present, every append exposes the current
    /// window, so the model can re-score on a rolling basis.
    SlidingWindow { max_len: usize, min_len: usize },
    /// Grow to exactly `seq_len` rows, expose them once, drain to empty.
    /// The model fires once per `seq_len` frames, never in between.
    ConsumeAndReset { seq_len: usize },
}

/// Result of one append: the buffer length afterwards (zero right after
/// a consume-and-reset drain) and, when the policy says the model may
/// run, the sequence to hand it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    pub len: usize,
    pub ready: Option<Vec<FrameRow>>,
}

#[derive(Debug)]
pub struct SessionBuffer {
    policy: CapacityPolicy,
    frames: VecDeque<FrameRow>,
    last_seen: Instant,
}

impl SessionBuffer {
    fn new(policy: CapacityPolicy) -> Self {
        Self {
            policy,
            frames: VecDeque::new(),
            last_seen: Instant::now(),
        }
    }

    fn append(&mut self, row: FrameRow) -> AppendOutcome {
        self.last_seen = Instant::now();
        self.frames.push_back(row);
        match self.policy {
            CapacityPolicy::SlidingWindow { max_len, min_len } => {
                while self.frames.len() > max_len {
                    self.frames.pop_front();
                }
                let ready =
                    (self.frames.len() >= min_len).then(|| self.frames.iter().cloned().collect());
                AppendOutcome {
                    len: self.frames.len(),
                    ready,
                }
            }
            CapacityPolicy::ConsumeAndReset { seq_len } => {
                if self.frames.len() >= seq_len {
                    let sequence: Vec<FrameRow> = self.frames.drain(..).collect();
                    AppendOutcome {
                        len: 0,
                        ready: Some(sequence),
                    }
                } else {
                    AppendOutcome {
                        len: self.frames.len(),
                        ready: None,
                    }
                }
            }
        }
    }

    fn snapshot(&self) -> Vec<FrameRow> {
        self.frames.iter().cloned().collect()
    }
}

/// Owns every live session buffer. One instance per daemon.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionBuffer>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the session's buffer, creating it under `policy` on first
    /// sight. The policy is fixed for the buffer's lifetime; a profile
    /// switch applies to sessions created afterwards.
    fn get_or_create(&self, id: &str, policy: CapacityPolicy) -> Arc<Mutex<SessionBuffer>> {
        let mut map = self.map();
        map.entry(id.to_string())
            .or_insert_with(|| {
                log::debug!("new session '{id}' ({policy:?})");
                Arc::new(Mutex::new(SessionBuffer::new(policy)))
            })
            .clone()
    }

    pub fn append(&self, id: &str, policy: CapacityPolicy, row: FrameRow) -> AppendOutcome {
        let buf = self.get_or_create(id, policy);
        let mut buf = buf.lock().unwrap_or_else(PoisonError::into_inner);
        buf.append(row)
    }

    /// Buffered frame count; zero for a session never seen.
    pub fn frame_count(&self, id: &str) -> usize {
        let buf = {
            let map = self.map();
            map.get(id).cloned()
        };
        buf.map(|b| b.lock().unwrap_or_else(PoisonError::into_inner).frames.len())
            .unwrap_or(0)
    }

    /// Current buffer contents in arrival order, if the session exists.
    pub fn snapshot(&self, id: &str) -> Option<Vec<FrameRow>> {
        let buf = {
            let map = self.map();
            map.get(id).cloned()
        };
        buf.map(|b| b.lock().unwrap_or_else(PoisonError::into_inner).snapshot())
    }

    /// Drops the session entirely. The next frame for this id starts a
    /// fresh buffer, so any stateful per-session collaborator is rebuilt
    /// rather than fed a spliced timeline. Returns whether it existed.
    pub fn reset(&self, id: &str) -> bool {
        let existed = self.map().remove(id).is_some();
        if existed {
            log::debug!("session '{id}' reset");
        }
        existed
    }

    /// Removes sessions with no append for `max_idle`. Buffers locked by
    /// an in-flight request are considered active and skipped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|id, buf| {
            let keep = match buf.try_lock() {
                Ok(b) => b.last_seen.elapsed() <= max_idle,
                Err(_) => true,
            };
            if !keep {
                log::info!("evicting idle session '{id}'");
            }
            keep
        });
        before - map.len()
    }

    pub fn session_count(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<SessionBuffer>>>> {
        // A poisoned map still holds valid buffers; recover it.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
