// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplicate-file handling.
//!
//! When a worker detects that a file was already delivered, the
//! configured flag set decides its fate: delete it (with a delete-log
//! record), warn and keep it, or move it into the per-job store.

use crate::env::WorkEnv;
use afd_core::{DirId, Event, JobId, MsgName};
use bitflags::bitflags;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;

bitflags! {
    /// Duplicate-check actions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DupFlags: u32 {
        const DELETE = 1 << 0;
        const WARN   = 1 << 1;
        const STORE  = 1 << 2;
    }
}

/// One delete-log record, written as a single line.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteLogRecord {
    pub file_name: String,
    pub host_alias: String,
    pub size: u64,
    pub job_id: JobId,
    pub dir_id: DirId,
    pub input_time: u64,
    pub split_job_counter: u32,
    pub unique_number: u32,
    pub name_length: u32,
    /// `<prog>><seconds since the file's mtime>`.
    pub proc: String,
}

/// Append-only delete log.
#[derive(Debug, Clone)]
pub struct DeleteLog {
    path: PathBuf,
}

impl DeleteLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, rec: &DeleteLogRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{}|{}|{}|{}|{}|{:x}|{:x}|{:x}|{}|{}",
            rec.file_name,
            rec.host_alias,
            rec.size,
            rec.job_id,
            rec.dir_id,
            rec.input_time,
            rec.split_job_counter,
            rec.unique_number,
            rec.name_length,
            rec.proc,
        )
    }
}

/// Context for one duplicate decision.
#[derive(Debug, Clone)]
pub struct DupContext<'a> {
    pub host_alias: &'a str,
    pub job_id: JobId,
    pub dir_id: DirId,
    pub msg_name: MsgName,
}

/// Apply the configured duplicate action to `file`.
///
/// Returns the emitted event, if the file was acted upon.
pub fn handle_duplicate(
    env: &WorkEnv,
    file: &Path,
    ctx: &DupContext<'_>,
    flags: DupFlags,
    now: u64,
    delete_log: &DeleteLog,
) -> io::Result<Option<Event>> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if flags.contains(DupFlags::WARN) {
        warn!(file = %file_name, job_id = %ctx.job_id, "File '{file_name}' is duplicate. #{}", ctx.job_id);
        if !flags.intersects(DupFlags::DELETE | DupFlags::STORE) {
            return Ok(None);
        }
    }

    if flags.contains(DupFlags::STORE) {
        let store = env.store_dir(ctx.job_id);
        match std::fs::create_dir_all(&store) {
            Ok(()) => {
                let target = store.join(&file_name);
                match std::fs::rename(file, &target) {
                    Ok(()) => {
                        return Ok(Some(Event::DuplicateHandled {
                            file_name,
                            job_id: ctx.job_id,
                            deleted: false,
                        }));
                    }
                    Err(e) => {
                        warn!(file = %file_name, error = %e, "store rename failed, deleting instead");
                    }
                }
            }
            Err(e) => {
                // create_dir_all already tolerates an existing directory;
                // anything surfacing here is a real failure (ENOSPC and
                // friends) and the file must not survive it.
                warn!(file = %file_name, error = %e, "store directory unavailable, deleting instead");
            }
        }
        delete_duplicate(file, &file_name, ctx, now, delete_log)?;
        return Ok(Some(Event::DuplicateHandled {
            file_name,
            job_id: ctx.job_id,
            deleted: true,
        }));
    }

    if flags.contains(DupFlags::DELETE) {
        delete_duplicate(file, &file_name, ctx, now, delete_log)?;
        return Ok(Some(Event::DuplicateHandled {
            file_name,
            job_id: ctx.job_id,
            deleted: true,
        }));
    }

    Ok(None)
}

fn delete_duplicate(
    file: &Path,
    file_name: &str,
    ctx: &DupContext<'_>,
    now: u64,
    delete_log: &DeleteLog,
) -> io::Result<()> {
    let meta = std::fs::metadata(file);
    let size = meta.as_ref().map(|m| m.len()).unwrap_or(0);
    let mtime = meta
        .as_ref()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(now);
    let diff_time = now.saturating_sub(mtime);

    delete_log.append(&DeleteLogRecord {
        file_name: file_name.to_string(),
        host_alias: ctx.host_alias.to_string(),
        size,
        job_id: ctx.job_id,
        dir_id: ctx.dir_id,
        input_time: ctx.msg_name.creation_time,
        split_job_counter: ctx.msg_name.split,
        unique_number: ctx.msg_name.unique,
        name_length: file_name.len() as u32,
        proc: format!("dupcheck>{diff_time}"),
    })?;
    match std::fs::remove_file(file) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "dupcheck_tests.rs"]
mod tests;
