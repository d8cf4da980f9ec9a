// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.

use afd_engine::WorkEnv;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root work directory (`$AFD_WORK_DIR`).
    pub work_dir: PathBuf,
    /// Path to the daemon log file.
    pub log_path: PathBuf,
    /// Path to the lock/PID file.
    pub lock_path: PathBuf,
    /// Directory holding the protocol worker binaries.
    pub worker_dir: PathBuf,
    /// Global cap on simultaneously running workers.
    pub max_connections: usize,
    /// Window between the stop signal and the hard kill.
    pub grace_window: Duration,
}

impl Config {
    /// Resolve from `$AFD_WORK_DIR` (falling back to `$HOME/.afd`) and
    /// the optional `AFD_MAX_CONNECTIONS` override.
    pub fn load() -> Self {
        let work_dir = std::env::var_os("AFD_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".afd")
            });
        let worker_dir = std::env::var_os("AFD_WORKER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join("sbin"));
        let max_connections = std::env::var("AFD_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        Self {
            log_path: work_dir.join("log").join("afdd.log"),
            lock_path: work_dir.join("fifo").join("afdd.pid"),
            worker_dir,
            max_connections,
            grace_window: Duration::from_secs(2),
            work_dir,
        }
    }

    pub fn work_env(&self) -> WorkEnv {
        WorkEnv::new(&self.work_dir)
    }
}
