use anyhow::Result;
use log::{error, info, warn};
use notify::{RecursiveMode, Watcher};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::{
    fs,
    io::{BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use super::dispatch;
use super::runtime::socket_path;
use crate::config::DaemonConfigState;
use crate::service::Recognizer;

enum CtlMsg {
    Reload,
    Shutdown,
}

fn lock(cfg: &Mutex<DaemonConfigState>) -> MutexGuard<'_, DaemonConfigState> {
    cfg.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reloads the active profile and pushes it into the service. On failure
/// the last good profile stays active in both.
fn apply_reload(cfg: &mut DaemonConfigState, svc: &Recognizer) -> Result<()> {
    cfg.reload()?;
    svc.update_profile(cfg.profile.clone());
    Ok(())
}

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path();
    if sock.exists() {
        let _ = fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let cfg = Arc::new(Mutex::new(DaemonConfigState::load_or_install_default()?));
    let (service, profiles_dir) = {
        let cfg = lock(&cfg);
        info!("daemon: active profile '{}'", cfg.active_name);
        (
            Arc::new(Recognizer::new(cfg.profile.clone())),
            cfg.profiles_dir.clone(),
        )
    };

    let (tx_ctl, rx_ctl) = mpsc::channel::<CtlMsg>();

    // SIGINT/SIGTERM funnel into the same shutdown path as the stop op.
    let tx_sig = tx_ctl.clone();
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("received signal {sig}, shutting down");
            let _ = tx_sig.send(CtlMsg::Shutdown);
        }
    });

    // Hot reload: edits under the profiles dir trigger a Reload message.
    let tx_watch = tx_ctl.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                let _ = tx_watch.send(CtlMsg::Reload);
            }
            Ok(_) => {}
            Err(e) => warn!("profile watch error: {e}"),
        }
    })?;
    if let Err(e) = watcher.watch(&profiles_dir, RecursiveMode::NonRecursive) {
        warn!("profile hot reload disabled: {e}");
    }

    // accept loop
    listener.set_nonblocking(true)?;
    let mut last_sweep = Instant::now();
    loop {
        if let Ok((stream, _)) = listener.accept() {
            let svc = service.clone();
            let tx = tx_ctl.clone();
            let cfg = cfg.clone();
            thread::spawn(move || {
                if let Err(e) = handle_client(stream, cfg, svc, tx) {
                    error!("ipc client error: {e}");
                }
            });
        }

        while let Ok(msg) = rx_ctl.try_recv() {
            match msg {
                CtlMsg::Reload => {
                    let mut cfg = lock(&cfg);
                    match apply_reload(&mut cfg, &service) {
                        Ok(()) => info!("profile '{}' reloaded", cfg.active_name),
                        Err(e) => error!("reload failed, keeping last good profile: {e}"),
                    }
                }
                CtlMsg::Shutdown => {
                    let _ = fs::remove_file(&sock);
                    info!("daemon: stopped");
                    return Ok(());
                }
            }
        }

        // Idle-session sweep bounds buffer growth for clients that never
        // send a reset.
        let sweep_every = Duration::from_secs(lock(&cfg).profile.session.sweep_interval_s);
        if last_sweep.elapsed() >= sweep_every {
            let evicted = service.sweep_idle_sessions();
            if evicted > 0 {
                info!("swept {evicted} idle session(s)");
            }
            last_sweep = Instant::now();
        }

        thread::sleep(Duration::from_millis(5));
    }
}

fn handle_client(
    mut stream: UnixStream,
    cfg: Arc<Mutex<DaemonConfigState>>,
    svc: Arc<Recognizer>,
    tx_ctl: mpsc::Sender<CtlMsg>,
) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let req: serde_json::Value = match serde_json::from_str(&line) {
        Ok(v) => v,
        Err(e) => {
            write!(stream, "{}\n", dispatch::fail(format!("bad request: {e}")))?;
            return Ok(());
        }
    };
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");

    let resp = dispatch::handle_op(op, &req, &svc)
        .unwrap_or_else(|| admin_op(op, &req, &cfg, &svc, &tx_ctl));

    write!(stream, "{}\n", resp)?;
    Ok(())
}

/// Daemon-lifecycle ops. Profile switches and reloads run synchronously
/// on the request path so a failure reaches the client as `ok:false`
/// instead of vanishing into the daemon log.
fn admin_op(
    op: &str,
    req: &serde_json::Value,
    cfg: &Mutex<DaemonConfigState>,
    svc: &Recognizer,
    tx_ctl: &mpsc::Sender<CtlMsg>,
) -> serde_json::Value {
    match op {
        "status" => {
            let cfg = lock(cfg);
            let (fill, window) = svc.smoother_fill();
            dispatch::ok(serde_json::json!({
                "active_profile": cfg.active_name,
                "socket": socket_path(),
                "sessions": svc.session_count(),
                "model_loaded": svc.model_loaded(),
                "smoother": {"fill": fill, "window": window},
            }))
        }
        "reload" => {
            let mut cfg = lock(cfg);
            match apply_reload(&mut cfg, svc) {
                Ok(()) => {
                    info!("profile '{}' reloaded", cfg.active_name);
                    dispatch::ok(serde_json::json!({"active_profile": cfg.active_name}))
                }
                Err(e) => dispatch::fail(format!("reload failed: {e}")),
            }
        }
        "use" => {
            let name = req.get("profile").and_then(|v| v.as_str()).unwrap_or("");
            let mut cfg = lock(cfg);
            match cfg.set_active(name) {
                Ok(()) => {
                    svc.update_profile(cfg.profile.clone());
                    info!("switched active profile to '{}'", cfg.active_name);
                    dispatch::ok(serde_json::json!({"active_profile": cfg.active_name}))
                }
                Err(e) => dispatch::fail(format!("use profile failed: {e}")),
            }
        }
        "list" => {
            let cfg = lock(cfg);
            let list = cfg.list_profiles();
            dispatch::ok(serde_json::json!({"profiles": list, "active": cfg.active_name}))
        }
        "doctor" => dispatch::ok(lock(cfg).doctor_report()),
        "shutdown" => {
            let _ = tx_ctl.send(CtlMsg::Shutdown);
            dispatch::ok(serde_json::json!("shutting down"))
        }
        _ => dispatch::fail(format!("unknown op: {op}")),
    }
}

// client helper
pub fn client_request(req: serde_json::Value) -> Result<serde_json::Value> {
    let sock = socket_path();
    if !sock.exists() {
        return Err(anyhow::anyhow!(
            "signctl daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: serde_json::Value = serde_json::from_str(&resp)?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use serde_json::json;

    /// Config state rooted in a throwaway directory; no profile files
    /// exist until a test writes them.
    fn temp_cfg(tag: &str) -> DaemonConfigState {
        let root = std::env::temp_dir().join(format!("signctl-{tag}-{}", std::process::id()));
        let profiles = root.join("profiles");
        std::fs::create_dir_all(&profiles).unwrap();
        DaemonConfigState {
            active_name: "default".into(),
            profile: Profile::default(),
            config_dir: root.clone(),
            profiles_dir: profiles,
            active_ptr: root.join("active"),
        }
    }

    fn ctl() -> mpsc::Sender<CtlMsg> {
        mpsc::channel().0
    }

    #[test]
    fn use_with_unknown_profile_fails_the_request() {
        let cfg = Mutex::new(temp_cfg("use-unknown"));
        let svc = Recognizer::new(Profile::default());
        let req = json!({"op": "use", "profile": "nonexistent"});
        let resp = admin_op("use", &req, &cfg, &svc, &ctl());
        assert_eq!(resp["ok"], false);
        assert!(resp["error"].as_str().unwrap().contains("nonexistent"));
        assert_eq!(lock(&cfg).active_name, "default", "active profile must not change");
    }

    #[test]
    fn use_applies_a_valid_profile_before_responding() {
        let state = temp_cfg("use-valid");
        let text = include_str!("../../profiles/default.toml").replace("window = 5", "window = 9");
        std::fs::write(state.profiles_dir.join("wide.toml"), text).unwrap();

        let cfg = Mutex::new(state);
        let svc = Recognizer::new(Profile::default());
        let req = json!({"op": "use", "profile": "wide"});
        let resp = admin_op("use", &req, &cfg, &svc, &ctl());
        assert_eq!(resp["ok"], true);
        assert_eq!(resp["data"]["active_profile"], "wide");
        assert_eq!(lock(&cfg).profile.smoothing.window, 9);
        // The service runs the new profile by the time the client hears back.
        assert_eq!(svc.smoother_fill(), (0, 9));
    }

    #[test]
    fn reload_failure_reaches_the_client() {
        // Active profile file missing: reload must fail loudly, not
        // report success.
        let cfg = Mutex::new(temp_cfg("reload-missing"));
        let svc = Recognizer::new(Profile::default());
        let resp = admin_op("reload", &json!({"op": "reload"}), &cfg, &svc, &ctl());
        assert_eq!(resp["ok"], false);
        assert!(resp["error"].as_str().unwrap().contains("reload failed"));
    }

    #[test]
    fn unknown_admin_op_is_rejected() {
        let cfg = Mutex::new(temp_cfg("unknown-op"));
        let svc = Recognizer::new(Profile::default());
        let resp = admin_op("emit", &json!({"op": "emit"}), &cfg, &svc, &ctl());
        assert_eq!(resp["ok"], false);
    }
}
