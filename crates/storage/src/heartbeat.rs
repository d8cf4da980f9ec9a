// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon heartbeat file and presence probe.
//!
//! The active file holds the pid table of the process family followed by
//! one heartbeat counter, bumped once per dispatcher tick. A presence
//! probe reads the counter twice across a wait window: movement means
//! alive, stillness means a wedged daemon, a missing file means none.

use std::io::{self, Read as _, Seek, SeekFrom, Write as _};
use std::path::Path;
use std::time::Duration;

/// Size of the pid table preceding the heartbeat counter.
pub const NO_OF_PROCESS: usize = 8;

const HEARTBEAT_OFFSET: u64 = ((NO_OF_PROCESS + 1) * 4) as u64;

/// Result of a presence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Heartbeat moved within the window.
    Alive,
    /// File exists but the counter did not move: distinct from "no daemon".
    Stalled,
    /// No active file at all.
    Missing,
}

/// Writer side of the heartbeat, owned by the daemon.
#[derive(Debug)]
pub struct Heartbeat {
    file: std::fs::File,
    counter: u32,
}

impl Heartbeat {
    /// Create (or reset) the active file with the daemon's pid in slot 0.
    pub fn create(path: &Path, pid: i32) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)?;
        let mut table = [0u8; HEARTBEAT_OFFSET as usize + 4];
        table[0..4].copy_from_slice(&pid.to_le_bytes());
        file.write_all(&table)?;
        file.sync_all()?;
        Ok(Self { file, counter: 0 })
    }

    /// Bump the heartbeat counter; called once per tick.
    pub fn bump(&mut self) -> io::Result<()> {
        self.counter = self.counter.wrapping_add(1);
        self.file.seek(SeekFrom::Start(HEARTBEAT_OFFSET))?;
        self.file.write_all(&self.counter.to_le_bytes())?;
        Ok(())
    }
}

/// Probe for a live daemon by watching the heartbeat across `wait_time`.
pub fn probe(path: &Path, wait_time: Duration) -> io::Result<Presence> {
    let first = match read_heartbeat(path) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Presence::Missing),
        Err(e) => return Err(e),
    };

    // Poll in small steps so a fast heartbeat answers early.
    let step = Duration::from_millis(50).min(wait_time);
    let mut waited = Duration::ZERO;
    while waited < wait_time {
        std::thread::sleep(step);
        waited += step;
        let second = match read_heartbeat(path) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Presence::Missing),
            Err(e) => return Err(e),
        };
        if second != first {
            return Ok(Presence::Alive);
        }
    }
    Ok(Presence::Stalled)
}

fn read_heartbeat(path: &Path) -> io::Result<u32> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(HEARTBEAT_OFFSET))?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
