// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AFD dispatcher daemon (afdd)
//!
//! Background process that owns the transfer queue and dispatches one
//! worker process per outbound (or fetch) transfer.
//!
//! Architecture:
//! - Listener tasks: blocking fifo readers, forwarding commands over a
//!   channel
//! - Engine loop: main task driving `Dispatcher::tick` between commands,
//!   persisting dirty state and bumping the heartbeat each round

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use afd_core::Event;
use afd_daemon::{lifecycle, Config, Startup};
use afd_engine::Command;
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Rotate the log when it crosses this size at startup.
const MAX_LOG_SIZE: u64 = 8 * 1024 * 1024;

/// Give up waiting for workers this long after a shutdown request.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("afdd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("afdd {}", env!("CARGO_PKG_VERSION"));
                println!("AFD dispatcher daemon - schedules outbound file transfers");
                println!();
                println!("USAGE:");
                println!("    afdd");
                println!();
                println!("Reads its work directory from AFD_WORK_DIR and listens on the");
                println!("command fifo below it. Not normally invoked by hand.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: afdd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();
    rotate_log_if_needed(&config.log_path);
    let _log_guard = setup_logging(&config)?;

    info!("starting dispatcher daemon");

    // The startup value carries the instance lock; it must live for the
    // whole run.
    let mut startup = match lifecycle::startup(&config) {
        Ok(s) => s,
        Err(lifecycle::LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("afdd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e.into());
        }
    };
    let Startup {
        ref mut dispatcher,
        ref mut store,
        ref mut heartbeat,
        ..
    } = startup;

    let env = dispatcher.env().clone();
    let (tx, mut rx) = mpsc::channel::<Command>(64);
    let _cmd_listener = afd_daemon::listener::spawn_command_listener(&env, tx.clone());
    let _del_listener = afd_daemon::listener::spawn_delete_listener(&env, tx.clone());
    drop(tx);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let mut sleep = Duration::from_millis(100);
    loop {
        tokio::select! {
            maybe_cmd = rx.recv() => {
                match maybe_cmd {
                    Some(Command::CheckFsa) => {
                        // The compiler rebuilt the layout; reload before
                        // re-anchoring live workers.
                        match store.load_layout() {
                            Ok((hosts, dirs)) => {
                                match dispatcher.reload_areas(hosts, dirs) {
                                    Ok(events) => route_events(&env, &events),
                                    Err(e) => error!(error = %e, "position resync failed"),
                                }
                            }
                            Err(e) => error!(error = %e, "layout reload failed"),
                        }
                    }
                    Some(cmd) => match dispatcher.handle_command(cmd) {
                        Ok(events) => route_events(&env, &events),
                        Err(e) => error!(error = %e, "command failed"),
                    },
                    None => {
                        warn!("all listeners gone, shutting down");
                        dispatcher.begin_shutdown();
                    }
                }
            }
            _ = tokio::time::sleep(sleep) => {}
            _ = sigterm.recv() => {
                info!("SIGTERM received");
                dispatcher.begin_shutdown();
            }
            _ = sigint.recv() => {
                info!("SIGINT received");
                dispatcher.begin_shutdown();
            }
        }

        let (next_sleep, events) = match dispatcher.tick() {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "tick failed");
                (Duration::from_secs(1), Vec::new())
            }
        };
        route_events(&env, &events);
        sleep = next_sleep;

        if let Err(e) = store.save_dirty(&mut dispatcher.state) {
            error!(error = %e, "state persistence failed");
        }
        if let Err(e) = heartbeat.bump() {
            warn!(error = %e, "heartbeat bump failed");
        }

        if dispatcher.drained() {
            break;
        }
    }

    lifecycle::shutdown(dispatcher, store, DRAIN_TIMEOUT).await?;
    Ok(())
}

/// Route engine events to their log streams.
fn route_events(env: &afd_engine::WorkEnv, events: &[Event]) {
    for event in events {
        match event {
            Event::DirErrorStart { alias, dir_id } => {
                append_log_line(
                    &env.receive_log_path(),
                    &format!("<E> {alias} [{dir_id}]: dir error set"),
                );
            }
            Event::DirErrorEnd { alias, dir_id } => {
                append_log_line(
                    &env.receive_log_path(),
                    &format!("<I> {alias} [{dir_id}]: dir error end"),
                );
            }
            Event::HostSwitch {
                alias, from, to, ..
            } => {
                append_log_line(
                    &env.system_log_path(),
                    &format!("<W> {alias}: automatic host switch {from} -> {to}"),
                );
            }
            Event::HostErrorEnd { alias, .. } => {
                append_log_line(
                    &env.system_log_path(),
                    &format!("<I> {alias}: error end"),
                );
            }
            Event::MessageDeleted { msg_name } => {
                append_log_line(
                    &env.system_log_path(),
                    &format!("<I> message {msg_name} deleted"),
                );
            }
            Event::DuplicateHandled {
                file_name,
                job_id,
                deleted,
            } => {
                append_log_line(
                    &env.system_log_path(),
                    &format!("<W> duplicate {file_name} #{job_id} deleted={deleted}"),
                );
            }
        }
    }
}

fn append_log_line(path: &Path, line: &str) {
    let open = std::fs::OpenOptions::new().create(true).append(true).open(path);
    match open {
        Ok(mut f) => {
            if let Err(e) = writeln!(f, "{line}") {
                warn!(error = %e, "log line write failed");
            }
        }
        Err(e) => warn!(error = %e, path = %path.display(), "log stream unavailable"),
    }
}

fn rotate_log_if_needed(path: &Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() > MAX_LOG_SIZE {
            let old = path.with_extension("log.old");
            let _ = std::fs::rename(path, old);
        }
    }
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::EnvFilter;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}
