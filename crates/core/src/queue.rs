// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue-buffer item: one scheduled unit of work.

use crate::msg_name::MsgName;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Queue file grows in buckets of this many slots.
pub const MSG_QUE_BUF_SIZE: usize = 1000;

bitflags! {
    /// Queue-item markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct QueueFlags: u32 {
        /// Pull-style job; `pos` indexes the FRA instead of the MDB.
        const FETCH_JOB        = 1 << 0;
        const RESEND_JOB       = 1 << 1;
        const HELPER_JOB       = 1 << 2;
        const QUEUED_FOR_BURST = 1 << 3;
    }
}

/// A scheduled unit of work, ordered by `(priority, msg_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub msg_name: MsgName,
    /// Single sort key folding creation time and insert sequence.
    pub msg_number: u64,
    pub creation_time: u64,
    /// Lower sorts first; '0' is the most urgent.
    pub priority: u8,
    /// Index into the MDB, or into the FRA for fetch jobs.
    pub pos: u32,
    pub special_flag: QueueFlags,
    /// Owning worker pid; 0 while the item is runnable.
    pub pid: i32,
    pub files_to_send: u32,
    pub file_size_to_send: u64,
    pub retries: u32,
    /// Index into the connection table while running, else -1.
    pub connect_pos: i32,
}

impl QueueItem {
    /// Fold creation time and an insert sequence into the sort key.
    ///
    /// Time occupies the high bits, so two items made in different seconds
    /// order by age and same-second items order by sequence.
    pub fn msg_number(creation_time: u64, sequence: u16) -> u64 {
        (creation_time << 16) | u64::from(sequence)
    }

    pub fn new(msg_name: MsgName, creation_time: u64, sequence: u16, priority: u8) -> Self {
        Self {
            msg_name,
            msg_number: Self::msg_number(creation_time, sequence),
            creation_time,
            priority,
            pos: 0,
            special_flag: QueueFlags::empty(),
            pid: 0,
            files_to_send: 0,
            file_size_to_send: 0,
            retries: 0,
            connect_pos: -1,
        }
    }

    pub fn is_fetch(&self) -> bool {
        self.special_flag.contains(QueueFlags::FETCH_JOB)
    }

    pub fn is_running(&self) -> bool {
        self.pid > 0
    }

    /// Composite ordering key.
    pub fn sort_key(&self) -> (u8, u64) {
        (self.priority, self.msg_number)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
