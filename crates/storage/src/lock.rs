// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Region locks over the shared status areas.
//!
//! Every mutation of a shared field happens under a named region. A region
//! maps to its own lock file under the fifo directory, taken with an
//! advisory exclusive (writer) or shared (reader) lock; the kernel drops
//! the lock when a holder dies, so a crashed worker never wedges the
//! dispatcher.
//!
//! Nesting follows one documented order, enforced at runtime per thread:
//! check-sweep, then directory error counters, then host error counters,
//! then total-file counters, then host status. Acquiring out of order is a
//! typed error, not a deadlock.

use fs2::FileExt;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Named lock regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Global FSA self-check sweep.
    CheckFsaEntries,
    /// Per-directory error counter (FRA side).
    DirErrorCounter(usize),
    /// Per-host error counter and toggle mutations.
    ErrorCounter(usize),
    /// Per-host total file counter and size.
    TotalFileCounter(usize),
    /// Per-host status bits.
    HostStatus(usize),
    /// Offset 0 of the current-message-list file during handoff.
    CurrentMsgList,
}

impl Region {
    /// Rank in the documented nesting order; a lock may only be taken
    /// while every held lock has a strictly lower rank.
    fn rank(self) -> u8 {
        match self {
            Region::CheckFsaEntries => 0,
            Region::DirErrorCounter(_) => 1,
            Region::ErrorCounter(_) => 2,
            Region::TotalFileCounter(_) => 3,
            Region::HostStatus(_) => 4,
            Region::CurrentMsgList => 5,
        }
    }

    fn file_name(self) -> String {
        match self {
            Region::CheckFsaEntries => ".lock_check_fsa".to_string(),
            Region::DirErrorCounter(i) => format!(".lock_dir_ec.{i}"),
            Region::ErrorCounter(i) => format!(".lock_ec.{i}"),
            Region::TotalFileCounter(i) => format!(".lock_tfc.{i}"),
            Region::HostStatus(i) => format!(".lock_hs.{i}"),
            Region::CurrentMsgList => ".lock_current_msgs".to_string(),
        }
    }

    fn describe(self) -> String {
        format!("{self:?}")
    }
}

/// Errors from the lock layer.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("lock order violation: acquiring {acquiring} while holding {held}")]
    OrderViolation { acquiring: String, held: String },
}

thread_local! {
    static HELD_RANKS: RefCell<Vec<(u8, &'static str)>> = const { RefCell::new(Vec::new()) };
}

/// Factory for region guards, bound to one lock directory.
#[derive(Debug, Clone)]
pub struct LockDir {
    dir: PathBuf,
}

impl LockDir {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Take the writer lock on a region, blocking until granted.
    pub fn lock_region_w(&self, region: Region) -> Result<RegionGuard, LockError> {
        self.lock(region, true)
    }

    /// Take a reader lock on a region, blocking until granted.
    pub fn lock_region_r(&self, region: Region) -> Result<RegionGuard, LockError> {
        self.lock(region, false)
    }

    fn lock(&self, region: Region, exclusive: bool) -> Result<RegionGuard, LockError> {
        let rank = region.rank();
        let held = HELD_RANKS.with(|stack| {
            stack
                .borrow()
                .last()
                .filter(|(top, _)| *top >= rank)
                .map(|(_, name)| *name)
        });
        if let Some(held) = held {
            return Err(LockError::OrderViolation {
                acquiring: region.describe(),
                held: held.to_string(),
            });
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.dir.join(region.file_name()))?;
        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }

        let name: &'static str = region_name(region);
        HELD_RANKS.with(|stack| stack.borrow_mut().push((rank, name)));
        Ok(RegionGuard { file, rank })
    }
}

fn region_name(region: Region) -> &'static str {
    match region {
        Region::CheckFsaEntries => "CheckFsaEntries",
        Region::DirErrorCounter(_) => "DirErrorCounter",
        Region::ErrorCounter(_) => "ErrorCounter",
        Region::TotalFileCounter(_) => "TotalFileCounter",
        Region::HostStatus(_) => "HostStatus",
        Region::CurrentMsgList => "CurrentMsgList",
    }
}

/// Held region lock; releases on drop.
#[derive(Debug)]
pub struct RegionGuard {
    file: File,
    rank: u8,
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        HELD_RANKS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|(rank, _)| *rank == self.rank) {
                stack.remove(pos);
            }
        });
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
