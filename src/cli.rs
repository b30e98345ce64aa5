use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, fs, process::Command};

use crate::config::DaemonConfigState;
use crate::ipc;
use crate::landmarks::Landmark;
use crate::service::{Recognizer, SymbolMode};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("start") => {
            let exe = std::env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("signctl: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("stop") => {
            let r = ipc::client_request(serde_json::json!({"op":"shutdown"}))?;
            print_response(&r);
            Ok(())
        }

        Some("status") => {
            let r = ipc::client_request(serde_json::json!({"op":"status"}))?;
            print_response(&r);
            Ok(())
        }

        Some("reload") => {
            let r = ipc::client_request(serde_json::json!({"op":"reload"}))?;
            print_response(&r);
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: signctl use <profile_name>"))?;
            let r = ipc::client_request(serde_json::json!({"op":"use","profile":name}))?;
            print_response(&r);
            Ok(())
        }

        Some("list") => {
            let r = ipc::client_request(serde_json::json!({"op":"list"}))?;
            print_response(&r);
            Ok(())
        }

        Some("doctor") => {
            let r = ipc::client_request(serde_json::json!({"op":"doctor"}))?;
            print_response(&r);
            Ok(())
        }

        Some("classify") => {
            // One-shot local classification, no daemon required:
            //   signctl classify letters hand.json
            //   signctl classify digits hand.json
            let mode: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: signctl classify <letters|digits> <landmarks.json>"))?;
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: signctl classify <letters|digits> <landmarks.json>"))?;
            let mode = SymbolMode::parse(&mode)
                .ok_or_else(|| anyhow!("mode must be 'letters' or 'digits'"))?;

            let hands = read_hands(&path)?;
            let cfg = DaemonConfigState::load_or_install_default()?;
            let svc = Recognizer::new(cfg.profile);
            for (i, reading) in svc.classify_hands(&hands, mode).iter().enumerate() {
                let symbol = reading.symbol.as_deref().unwrap_or("-");
                println!("hand {i}: {symbol}");
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

/// Accepts either one hand (`[{x,y,z}; 21]`) or a list of hands.
fn read_hands(path: &str) -> Result<Vec<Vec<Landmark>>> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {path}: {e}"))?;
    if let Ok(hands) = serde_json::from_str::<Vec<Vec<Landmark>>>(&text) {
        return Ok(hands);
    }
    let hand: Vec<Landmark> = serde_json::from_str(&text)
        .map_err(|e| anyhow!("{path} is not a landmark array: {e}"))?;
    Ok(vec![hand])
}

fn print_help() {
    println!(
        r#"signctl — ASL hand-pose recognition daemon

USAGE:
  signctl help [command]                      Show general or command-specific help
  signctl start                               Start the daemon
  signctl stop                                Stop the daemon
  signctl status                              Show daemon state
  signctl reload                              Reload active profile
  signctl use <name>                          Switch active profile
  signctl list                                List profiles
  signctl doctor                              Diagnose paths/socket
  signctl classify <letters|digits> <file>    Classify a landmarks JSON file locally

TIPS:
  - Profiles: ~/.config/signctl/profiles
  - Active profile pointer: ~/.config/signctl/active
  - Daemon socket: ~/.local/run/signctl.sock (line-delimited JSON ops)
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: signctl start\nStarts the background daemon."),
        "stop" => println!("usage: signctl stop\nStops the running daemon."),
        "status" => println!(
            "usage: signctl status\nShows active profile, socket, live sessions, model state."
        ),
        "reload" => println!(
            "usage: signctl reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => {
            println!("usage: signctl use <name>\nSwitches active profile to <name> and reloads.")
        }
        "list" => {
            println!("usage: signctl list\nLists available profiles; shows the active one.")
        }
        "doctor" => println!(
            "usage: signctl doctor\nChecks config/socket paths and reports the runtime user."
        ),
        "classify" => println!(
            "usage: signctl classify <letters|digits> <landmarks.json>\nReads one hand ([{{x,y,z}}; 21]) or a list of hands and prints the\nrecognized symbol per hand, without a running daemon."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
