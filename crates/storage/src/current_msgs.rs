// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Current-message-list handoff.
//!
//! The configuration compiler rewrites the list of live job IDs and flips
//! the writer flag in the status word while doing so. The dispatcher waits
//! for the flag to clear (bounded), then reads the list under the handoff
//! region lock. Format: `i32 count` followed by `count` u32 IDs.

use crate::lock::{LockDir, LockError, Region};
use crate::map::MapError;
use afd_core::JobId;
use std::io::{self, Read as _, Write as _};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long the dispatcher waits for the compiler to finish writing.
pub const WRITER_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CurrentMsgError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("gave up waiting for the job-ID writer after {0:?}")]
    WriterTimeout(Duration),
    #[error("corrupt current-message list: {0}")]
    Corrupt(String),
}

/// Read the current list of live job IDs.
///
/// `writer_busy` samples the status word's writer flag; the wait is
/// bounded by [`WRITER_WAIT`] and timing out is fatal to the caller.
pub fn read_current_msg_list(
    path: &Path,
    locks: &LockDir,
    mut writer_busy: impl FnMut() -> Result<bool, MapError>,
) -> Result<Vec<JobId>, CurrentMsgError> {
    let deadline = Instant::now() + WRITER_WAIT;
    while writer_busy()? {
        if Instant::now() >= deadline {
            return Err(CurrentMsgError::WriterTimeout(WRITER_WAIT));
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let _guard = locks.lock_region_r(Region::CurrentMsgList)?;
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    let count = i32::from_le_bytes(buf);
    if count < 0 {
        return Err(CurrentMsgError::Corrupt(format!("negative count {count}")));
    }

    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        file.read_exact(&mut buf)?;
        ids.push(JobId::new(u32::from_le_bytes(buf)));
    }
    Ok(ids)
}

/// Write the list; the compiler-side half of the handoff.
pub fn write_current_msg_list(
    path: &Path,
    locks: &LockDir,
    ids: &[JobId],
) -> Result<(), CurrentMsgError> {
    let _guard = locks.lock_region_w(Region::CurrentMsgList)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = Vec::with_capacity(4 + ids.len() * 4);
    out.extend_from_slice(&(ids.len() as i32).to_le_bytes());
    for id in ids {
        out.extend_from_slice(&id.get().to_le_bytes());
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(&out)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "current_msgs_tests.rs"]
mod tests;
