// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fifo listeners.
//!
//! Two inbound fifos feed the dispatcher: the command fifo and the
//! delete fifo. Each gets a blocking reader task that decodes frames and
//! forwards [`Command`]s over a channel; commands on the command fifo
//! are acknowledged with a single byte on the response fifo.

use crate::protocol::{self, ACKN};
use afd_engine::{Command, WorkEnv};
use nix::sys::stat::Mode;
use std::io::{self, Read as _, Write as _};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Create the daemon's fifos, tolerating ones that already exist.
pub fn make_fifos(env: &WorkEnv) -> io::Result<()> {
    for path in [
        env.cmd_fifo_path(),
        env.resp_fifo_path(),
        env.delete_fifo_path(),
        env.progress_fifo_path(),
    ] {
        match nix::unistd::mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IWGRP) {
            Ok(()) => {}
            Err(nix::errno::Errno::EEXIST) => {}
            Err(e) => return Err(io::Error::from(e)),
        }
    }
    Ok(())
}

/// Spawn the blocking reader for the command fifo.
pub fn spawn_command_listener(
    env: &WorkEnv,
    tx: mpsc::Sender<Command>,
) -> tokio::task::JoinHandle<()> {
    let fifo = env.cmd_fifo_path();
    let resp = env.resp_fifo_path();
    tokio::task::spawn_blocking(move || read_loop(&fifo, Some(&resp), tx))
}

/// Spawn the blocking reader for the delete fifo.
pub fn spawn_delete_listener(
    env: &WorkEnv,
    tx: mpsc::Sender<Command>,
) -> tokio::task::JoinHandle<()> {
    let fifo = env.delete_fifo_path();
    tokio::task::spawn_blocking(move || read_loop(&fifo, None, tx))
}

/// Blocking frame pump: fifo bytes in, commands out.
///
/// The fifo is opened read/write so the descriptor survives writers
/// coming and going instead of seeing EOF after the first one leaves.
fn read_loop(fifo: &Path, resp: Option<&PathBuf>, tx: mpsc::Sender<Command>) {
    eprintln!("DEBUG read_loop opening {}", fifo.display());
    let mut file = match std::fs::OpenOptions::new().read(true).write(true).open(fifo) {
        Ok(f) => { eprintln!("DEBUG read_loop opened"); f },
        Err(e) => {
            warn!(fifo = %fifo.display(), error = %e, "cannot open fifo, listener exiting");
            return;
        }
    };

    let mut pending = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match file.read(&mut chunk) {
            Ok(0) => continue,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(fifo = %fifo.display(), error = %e, "fifo read failed, listener exiting");
                return;
            }
        };
        pending.extend_from_slice(&chunk[..n]);

        for cmd in protocol::decode_commands(&mut pending) {
            debug!(?cmd, "command received");
            if tx.blocking_send(cmd).is_err() {
                // Dispatcher is gone; nothing left to feed.
                return;
            }
            if let Some(resp) = resp {
                acknowledge(resp);
            }
        }
    }
}

fn acknowledge(resp: &Path) {
    match std::fs::OpenOptions::new().read(true).write(true).open(resp) {
        Ok(mut f) => {
            if let Err(e) = f.write_all(&[ACKN]) {
                debug!(error = %e, "acknowledgement write failed");
            }
        }
        Err(e) => debug!(error = %e, "acknowledgement fifo unavailable"),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
