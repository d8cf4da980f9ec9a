// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process spawning and progress intake.
//!
//! The dispatcher forks one short-lived worker per transfer. The protocol
//! implementations are external collaborators; this seam launches them,
//! signals them, reaps their exits, and drains the progress frames they
//! write back. A frame is one pipe-delimited line on the progress fifo:
//!
//! ```text
//! <pid>|<connect status code>|<files done>|<bytes done>|<bytes in use>|<file in use>
//! ```

use crate::error_engine::Faulty;
use afd_core::host::ConnectStatus;
use afd_core::{MsgName, Protocol};
use std::fmt;
use std::io::{self, Read as _};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Everything a worker needs to run one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub msg_name: MsgName,
    pub host_alias: String,
    /// Toggle-resolved hostname the worker must connect to.
    pub hostname: String,
    pub job_no: usize,
    pub protocol: Protocol,
    /// Fetch path rather than send path.
    pub retrieve: bool,
    /// Staged payload directory (send jobs).
    pub outgoing: PathBuf,
    pub block_size: u32,
    pub transfer_timeout: u64,
    /// Per-worker rate-limit share, 0 for unlimited.
    pub trl_per_process: u64,
    pub retries: u32,
    /// Connect to the non-primary hostname for this run only.
    pub temp_toggle: bool,
}

impl SpawnRequest {
    /// Worker program name, `sf_*` for send and `gf_*` for fetch.
    pub fn program_name(&self) -> String {
        let prefix = if self.retrieve { "gf" } else { "sf" };
        format!("{prefix}_{}", self.protocol)
    }
}

/// One reaped worker exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapedWorker {
    pub pid: i32,
    pub faulty: Faulty,
    pub exit_code: Option<i32>,
}

/// Parse failure for a progress frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("progress frame has {0} fields, expected 6")]
    FieldCount(usize),
    #[error("bad progress field '{0}'")]
    BadField(String),
}

/// One progress frame from a running worker.
///
/// Workers emit these as the transfer moves: on connect, per file, and
/// when the link goes bad mid-run. The dispatcher folds each frame into
/// the owning job slot so monitors see live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub pid: i32,
    pub connect_status: ConnectStatus,
    pub no_of_files_done: u32,
    pub file_size_done: u64,
    pub file_size_in_use: u64,
    pub file_name_in_use: String,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}",
            self.pid,
            self.connect_status.code(),
            self.no_of_files_done,
            self.file_size_done,
            self.file_size_in_use,
            self.file_name_in_use,
        )
    }
}

impl FromStr for ProgressReport {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(6, '|').collect();
        if parts.len() != 6 {
            return Err(ProgressError::FieldCount(parts.len()));
        }
        let bad = |p: &str| ProgressError::BadField(p.to_string());
        let code: u8 = parts[1].parse().map_err(|_| bad(parts[1]))?;
        Ok(Self {
            pid: parts[0].parse().map_err(|_| bad(parts[0]))?,
            connect_status: ConnectStatus::from_code(code).ok_or_else(|| bad(parts[1]))?,
            no_of_files_done: parts[2].parse().map_err(|_| bad(parts[2]))?,
            file_size_done: parts[3].parse().map_err(|_| bad(parts[3]))?,
            file_size_in_use: parts[4].parse().map_err(|_| bad(parts[4]))?,
            file_name_in_use: parts[5].to_string(),
        })
    }
}

/// Seam between the dispatcher and worker processes.
pub trait TransferSpawner {
    /// Start a worker; returns its pid. Failure is a soft error — the
    /// queue item stays runnable.
    fn spawn(&mut self, req: &SpawnRequest) -> io::Result<i32>;

    /// Ask a worker to stop (interrupt). The grace window before the hard
    /// kill is the dispatcher's business.
    fn signal_stop(&mut self, pid: i32) -> io::Result<()>;

    /// Hard-kill a worker that ignored the stop signal.
    fn kill(&mut self, pid: i32) -> io::Result<()>;

    /// Collect every worker that has exited, without blocking.
    fn reap(&mut self) -> Vec<ReapedWorker>;

    /// Drain the progress frames workers have reported, without blocking.
    fn drain_progress(&mut self) -> Vec<ProgressReport>;
}

/// Production spawner: real child processes under the worker directory,
/// reporting progress on a shared fifo.
#[derive(Debug)]
pub struct ProcessSpawner {
    worker_dir: PathBuf,
    progress_path: PathBuf,
    progress: Option<std::fs::File>,
    pending: Vec<u8>,
}

impl ProcessSpawner {
    /// `worker_dir` holds the protocol worker binaries (`sf_ftp`,
    /// `gf_sftp`, ...); `progress_path` is the fifo they write progress
    /// frames to.
    pub fn new(worker_dir: impl Into<PathBuf>, progress_path: impl Into<PathBuf>) -> Self {
        Self {
            worker_dir: worker_dir.into(),
            progress_path: progress_path.into(),
            progress: None,
            pending: Vec::new(),
        }
    }

    /// Open the progress fifo read/write and non-blocking, once. The
    /// write side keeps the descriptor alive across workers coming and
    /// going; non-blocking keeps the drain from stalling the loop.
    fn ensure_progress_open(&mut self) {
        if self.progress.is_none() {
            use std::os::unix::fs::OpenOptionsExt as _;
            self.progress = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(nix::libc::O_NONBLOCK)
                .open(&self.progress_path)
                .ok();
        }
    }
}

impl TransferSpawner for ProcessSpawner {
    fn spawn(&mut self, req: &SpawnRequest) -> io::Result<i32> {
        let child = std::process::Command::new(self.worker_dir.join(req.program_name()))
            .arg("--msg")
            .arg(req.msg_name.to_string())
            .arg("--host-alias")
            .arg(&req.host_alias)
            .arg("--hostname")
            .arg(&req.hostname)
            .arg("--job-no")
            .arg(req.job_no.to_string())
            .arg("--files-from")
            .arg(&req.outgoing)
            .arg("--block-size")
            .arg(req.block_size.to_string())
            .arg("--timeout")
            .arg(req.transfer_timeout.to_string())
            .arg("--rate-limit")
            .arg(req.trl_per_process.to_string())
            .arg("--progress-fifo")
            .arg(&self.progress_path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        Ok(child.id() as i32)
    }

    fn signal_stop(&mut self, pid: i32) -> io::Result<()> {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::SIGINT)
            .map_err(io::Error::from)
    }

    fn kill(&mut self, pid: i32) -> io::Result<()> {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::SIGKILL)
            .map_err(io::Error::from)
    }

    fn reap(&mut self) -> Vec<ReapedWorker> {
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

        let mut reaped = Vec::new();
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    let faulty = if code == 0 { Faulty::No } else { Faulty::Yes };
                    reaped.push(ReapedWorker {
                        pid: pid.as_raw(),
                        faulty,
                        exit_code: Some(code),
                    });
                }
                Ok(WaitStatus::Signaled(pid, _, _)) => {
                    // Killed from outside; neither success nor a transport
                    // failure for error accounting.
                    reaped.push(ReapedWorker {
                        pid: pid.as_raw(),
                        faulty: Faulty::Neither,
                        exit_code: None,
                    });
                }
                Ok(WaitStatus::StillAlive) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        reaped
    }

    fn drain_progress(&mut self) -> Vec<ProgressReport> {
        self.ensure_progress_open();
        let Some(file) = self.progress.as_mut() else {
            return Vec::new();
        };

        let mut chunk = [0u8; 4096];
        loop {
            match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }

        let mut reports = Vec::new();
        while let Some(nl) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=nl).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<ProgressReport>() {
                Ok(report) => reports.push(report),
                Err(e) => warn!(frame = %line, error = %e, "bad progress frame, dropping"),
            }
        }
        reports
    }
}

/// Scripted spawner for deterministic dispatcher tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct FakeSpawner {
    next_pid: i32,
    /// Every spawn in order, keyed by the pid handed out.
    pub spawned: Vec<(i32, SpawnRequest)>,
    /// Pids currently considered running.
    pub running: Vec<i32>,
    /// Signals delivered, as `(pid, "INT" | "KILL")`.
    pub signals: Vec<(i32, &'static str)>,
    /// When set, the next spawn fails with this error kind.
    pub fail_next_spawn: bool,
    pending: Vec<ReapedWorker>,
    progress: Vec<ProgressReport>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the exit of a specific worker.
    pub fn exit_worker(&mut self, pid: i32, faulty: Faulty) {
        self.running.retain(|&p| p != pid);
        let exit_code = match faulty {
            Faulty::No => Some(0),
            Faulty::Yes => Some(1),
            Faulty::Neither => None,
        };
        self.pending.push(ReapedWorker {
            pid,
            faulty,
            exit_code,
        });
    }

    /// Script the exit of the oldest running worker.
    pub fn exit_next(&mut self, faulty: Faulty) -> Option<i32> {
        let pid = *self.running.first()?;
        self.exit_worker(pid, faulty);
        Some(pid)
    }

    /// Script a progress frame from a running worker.
    pub fn report_progress(&mut self, report: ProgressReport) {
        self.progress.push(report);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TransferSpawner for FakeSpawner {
    fn spawn(&mut self, req: &SpawnRequest) -> io::Result<i32> {
        if self.fail_next_spawn {
            self.fail_next_spawn = false;
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "fork failed"));
        }
        self.next_pid += 1;
        let pid = 1000 + self.next_pid;
        self.spawned.push((pid, req.clone()));
        self.running.push(pid);
        Ok(pid)
    }

    fn signal_stop(&mut self, pid: i32) -> io::Result<()> {
        self.signals.push((pid, "INT"));
        Ok(())
    }

    fn kill(&mut self, pid: i32) -> io::Result<()> {
        self.signals.push((pid, "KILL"));
        self.running.retain(|&p| p != pid);
        self.pending.push(ReapedWorker {
            pid,
            faulty: Faulty::Neither,
            exit_code: None,
        });
        Ok(())
    }

    fn reap(&mut self) -> Vec<ReapedWorker> {
        std::mem::take(&mut self.pending)
    }

    fn drain_progress(&mut self) -> Vec<ProgressReport> {
        std::mem::take(&mut self.progress)
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
