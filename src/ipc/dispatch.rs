//! Recognition-op routing: typed request parsing, service calls, JSON
//! response envelopes.
//!
//! Only transport-level problems (missing fields, malformed landmark
//! arrays in the sequence path) become `ok:false` responses. A hand that
//! merely fails to match any rule classifies as `null` inside an `ok`
//! response.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::features::{self, RegionFrame};
use crate::landmarks::{HandSkeleton, Landmark};
use crate::service::{Recognizer, SequenceReport, SymbolMode};

/// Sentinel session id for callers that do not supply one. Concurrent
/// clients sharing it will interleave frames in one buffer; anything
/// serving more than one client must pass real per-client ids.
pub const DEFAULT_SESSION: &str = "default";

fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

#[derive(Deserialize)]
struct FrameRequest {
    #[serde(default)]
    mode: Option<String>,
    hands: Vec<Vec<Landmark>>,
}

#[derive(Deserialize)]
struct SequenceRequest {
    #[serde(default = "default_session")]
    session: String,
    /// One hand, 21 landmarks, flattened to a 63-float row.
    #[serde(default)]
    landmarks: Option<Vec<Landmark>>,
    /// Holistic alternative: four body regions, zero-filled when absent.
    #[serde(default)]
    regions: Option<RegionFrame>,
}

#[derive(Deserialize)]
struct SessionRequest {
    #[serde(default = "default_session")]
    session: String,
}

#[derive(Deserialize)]
struct SmoothRequest {
    distribution: HashMap<String, f32>,
}

pub fn ok(data: Value) -> Value {
    json!({"ok": true, "data": data})
}

pub fn fail(msg: impl fmt::Display) -> Value {
    json!({"ok": false, "error": msg.to_string()})
}

/// Routes one recognition op. Returns `None` for ops this layer does not
/// know, so the server can fall through to its admin handling.
pub fn handle_op(op: &str, req: &Value, svc: &Recognizer) -> Option<Value> {
    match op {
        "frame" => Some(frame(req, svc)),
        "sequence" => Some(sequence(req, svc)),
        "predict" => Some(predict(req, svc)),
        "reset" => Some(reset(req, svc)),
        "smooth" => Some(smooth(req, svc)),
        "smooth-reset" => {
            svc.reset_smoother();
            Some(ok(json!({"cleared": true})))
        }
        _ => None,
    }
}

fn frame(req: &Value, svc: &Recognizer) -> Value {
    let req: FrameRequest = match serde_json::from_value(req.clone()) {
        Ok(r) => r,
        Err(e) => return fail(format!("bad frame request: {e}")),
    };
    let mode = match req.mode.as_deref() {
        None => SymbolMode::Letters,
        Some(m) => match SymbolMode::parse(m) {
            Some(mode) => mode,
            None => return fail(format!("unknown mode '{m}' (letters|digits)")),
        },
    };

    let readings = svc.classify_hands(&req.hands, mode);
    let symbols: Vec<Value> = readings
        .iter()
        .map(|r| r.symbol.as_deref().map_or(Value::Null, Value::from))
        .collect();
    let orientation = readings.first().and_then(|r| r.orientation);
    ok(json!({"symbols": symbols, "orientation": orientation}))
}

fn sequence(req: &Value, svc: &Recognizer) -> Value {
    let req: SequenceRequest = match serde_json::from_value(req.clone()) {
        Ok(r) => r,
        Err(e) => return fail(format!("bad sequence request: {e}")),
    };

    let row = if let Some(points) = &req.landmarks {
        match HandSkeleton::from_points(points) {
            Ok(skel) => features::flatten_hand(&skel),
            Err(e) => return fail(e),
        }
    } else if let Some(regions) = &req.regions {
        if regions.is_empty() {
            return fail("regions carry no landmarks");
        }
        match regions.flatten() {
            Ok(row) => row,
            Err(e) => return fail(e),
        }
    } else {
        return fail("sequence request needs 'landmarks' or 'regions'");
    };

    report(svc.append_frame(&req.session, row))
}

fn predict(req: &Value, svc: &Recognizer) -> Value {
    let req: SessionRequest = match serde_json::from_value(req.clone()) {
        Ok(r) => r,
        Err(e) => return fail(format!("bad predict request: {e}")),
    };
    report(svc.predict_session(&req.session))
}

fn reset(req: &Value, svc: &Recognizer) -> Value {
    let req: SessionRequest = match serde_json::from_value(req.clone()) {
        Ok(r) => r,
        Err(e) => return fail(format!("bad reset request: {e}")),
    };
    let existed = svc.reset_session(&req.session);
    ok(json!({"existed": existed}))
}

fn smooth(req: &Value, svc: &Recognizer) -> Value {
    let req: SmoothRequest = match serde_json::from_value(req.clone()) {
        Ok(r) => r,
        Err(e) => return fail(format!("bad smooth request: {e}")),
    };
    let (label, confidence, fill) = svc.smooth(req.distribution);
    ok(json!({"label": label, "confidence": confidence, "window_fill": fill}))
}

fn report(r: SequenceReport) -> Value {
    let (label, confidence) = match &r.prediction {
        Some(p) => (p.label.clone(), p.confidence),
        None => (None, 0.0),
    };
    ok(json!({
        "label": label,
        "confidence": confidence,
        "frames": r.len,
        "model_loaded": r.model_loaded,
    }))
}
