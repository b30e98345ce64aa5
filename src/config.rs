use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::session::CapacityPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// Geometric rule thresholds, all in normalized image-fraction units.
/// These are empirical constants tuned against the detector's coordinate
/// convention (y grows downward); change them only with labeled clips to
/// re-verify against.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    pub letter_up_margin: f32,
    pub digit_up_margin: f32,
    pub sideways_y_tol: f32,
    pub sideways_x_min: f32,
    pub thumb_out_margin: f32,
    pub k_thumb_gap: f32,
    pub f_pinch_gap: f32,
    pub d_thumb_y_gap: f32,
    pub digit_pinch_gap: f32,
    /// |vy| must exceed this multiple of |vx| before a hand is labeled
    /// vertical.
    pub vertical_bias: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            letter_up_margin: 0.05,
            digit_up_margin: 0.08,
            sideways_y_tol: 0.05,
            sideways_x_min: 0.08,
            thumb_out_margin: 0.05,
            k_thumb_gap: 0.06,
            f_pinch_gap: 0.05,
            d_thumb_y_gap: 0.07,
            digit_pinch_gap: 0.06,
            vertical_bias: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Orientation {
    /// Rotate skeletons upright about the wrist before the rule tables
    /// run. Off by default: the sideways rows (G, H) are themselves the
    /// horizontal-hand handling, and the stock thresholds were tuned on
    /// unrotated coordinates.
    #[serde(default)]
    pub normalize: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Smoothing {
    pub window: usize,
    pub min_confidence: f32,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            window: 5,
            min_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Sliding,
    Consume,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sequence {
    pub policy: PolicyKind,
    /// Sliding mode: retained frames.
    pub window_len: usize,
    /// Sliding mode: frames required before the model may run.
    pub min_len: usize,
    /// Consume mode: exact sequence length handed to the model.
    pub seq_len: usize,
    pub min_confidence: f32,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Sliding,
            window_len: 30,
            min_len: 20,
            seq_len: 30,
            min_confidence: 0.6,
        }
    }
}

impl Sequence {
    pub fn capacity_policy(&self) -> CapacityPolicy {
        match self.policy {
            PolicyKind::Sliding => CapacityPolicy::SlidingWindow {
                max_len: self.window_len,
                min_len: self.min_len,
            },
            PolicyKind::Consume => CapacityPolicy::ConsumeAndReset {
                seq_len: self.seq_len,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sessions {
    pub idle_timeout_s: u64,
    pub sweep_interval_s: u64,
}

impl Default for Sessions {
    fn default() -> Self {
        Self {
            idle_timeout_s: 300,
            sweep_interval_s: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    pub thresholds: Thresholds,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub smoothing: Smoothing,
    #[serde(default)]
    pub sequence: Sequence,
    #[serde(default)]
    pub session: Sessions,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            meta: Meta {
                name: Some("default".into()),
            },
            thresholds: Thresholds::default(),
            orientation: Orientation::default(),
            smoothing: Smoothing::default(),
            sequence: Sequence::default(),
            session: Sessions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> PathBuf {
    let home = UserDirs::new().unwrap().home_dir().to_path_buf();
    home.join(".config").join("signctl")
}

fn profiles_dir() -> PathBuf {
    config_dir().join("profiles")
}

fn active_ptr_path() -> PathBuf {
    config_dir().join("active")
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DaemonConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir();
        let profdir = profiles_dir();
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = active_ptr_path();
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = Self::load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = Self::load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.reload()?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                if let Some(ext) = e.path().extension() {
                    if ext == "toml" {
                        if let Some(stem) = e.path().file_stem().and_then(|s| s.to_str()) {
                            v.push(stem.to_string());
                        }
                    }
                }
            }
        }
        v.sort();
        v
    }

    fn load_profile(profiles_dir: &Path, name: &str) -> Result<Profile> {
        let path = profiles_dir.join(format!("{name}.toml"));
        let txt = fs::read_to_string(&path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        let profile: Profile =
            toml::from_str(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let socket = crate::ipc::runtime::socket_path();
        serde_json::json!({
            "user": whoami::username(),
            "socket": socket,
            "socket_present": socket.exists(),
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "profiles": self.list_profiles(),
            "hints": {
                "start_daemon": "signctl start",
                "classify_locally": "signctl classify letters hand.json"
            }
        })
    }
}

fn validate_profile(p: &Profile) -> Result<()> {
    let t = &p.thresholds;
    let margins = [
        ("letter_up_margin", t.letter_up_margin),
        ("digit_up_margin", t.digit_up_margin),
        ("sideways_y_tol", t.sideways_y_tol),
        ("sideways_x_min", t.sideways_x_min),
        ("thumb_out_margin", t.thumb_out_margin),
        ("k_thumb_gap", t.k_thumb_gap),
        ("f_pinch_gap", t.f_pinch_gap),
        ("d_thumb_y_gap", t.d_thumb_y_gap),
        ("digit_pinch_gap", t.digit_pinch_gap),
    ];
    for (name, v) in margins {
        // Open interval: a zero margin makes the up/sideways predicates
        // fire on equality noise.
        if v <= 0.0 || v >= 1.0 {
            return Err(anyhow!(
                "thresholds.{name} must be in (0,1) normalized units"
            ));
        }
    }
    if t.vertical_bias < 1.0 || !t.vertical_bias.is_finite() {
        return Err(anyhow!("thresholds.vertical_bias must be >= 1.0"));
    }

    if p.smoothing.window == 0 {
        return Err(anyhow!("smoothing.window must be at least 1"));
    }
    if !(0.0..=1.0).contains(&p.smoothing.min_confidence) {
        return Err(anyhow!("smoothing.min_confidence must be in [0,1]"));
    }

    let s = &p.sequence;
    if s.seq_len == 0 || s.window_len == 0 || s.min_len == 0 {
        return Err(anyhow!("sequence lengths must be positive"));
    }
    if s.min_len > s.window_len {
        return Err(anyhow!(
            "sequence.min_len ({}) exceeds sequence.window_len ({})",
            s.min_len,
            s.window_len
        ));
    }
    if !(0.0..=1.0).contains(&s.min_confidence) {
        return Err(anyhow!("sequence.min_confidence must be in [0,1]"));
    }

    if p.session.sweep_interval_s == 0 || p.session.idle_timeout_s == 0 {
        return Err(anyhow!("session timeouts must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_default_profile_parses_and_validates() {
        let profile: Profile = toml::from_str(default_profile_text()).unwrap();
        validate_profile(&profile).unwrap();
        assert_eq!(profile.meta.name.as_deref(), Some("default"));
        assert!((profile.thresholds.k_thumb_gap - 0.06).abs() < 1e-6);
        assert_eq!(profile.sequence.policy, PolicyKind::Sliding);
        assert!(!profile.orientation.normalize);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut p = Profile::default();
        p.thresholds.letter_up_margin = 1.2;
        assert!(validate_profile(&p).is_err());

        // Interval bounds are exclusive.
        let mut p = Profile::default();
        p.thresholds.sideways_y_tol = 0.0;
        assert!(validate_profile(&p).is_err());

        let mut p = Profile::default();
        p.thresholds.vertical_bias = 0.5;
        assert!(validate_profile(&p).is_err());

        let mut p = Profile::default();
        p.smoothing.window = 0;
        assert!(validate_profile(&p).is_err());

        let mut p = Profile::default();
        p.sequence.min_len = 40;
        assert!(validate_profile(&p).is_err());
    }

    #[test]
    fn policy_maps_onto_buffer_capacity() {
        let mut s = Sequence::default();
        assert!(matches!(
            s.capacity_policy(),
            CapacityPolicy::SlidingWindow {
                max_len: 30,
                min_len: 20
            }
        ));
        s.policy = PolicyKind::Consume;
        s.seq_len = 16;
        assert!(matches!(
            s.capacity_policy(),
            CapacityPolicy::ConsumeAndReset { seq_len: 16 }
        ));
    }
}
