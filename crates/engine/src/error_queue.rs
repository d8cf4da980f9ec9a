// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error queue: messages waiting out a retry interval.
//!
//! Held in memory and rebuilt from the FSA error counters on restart;
//! only the per-host `ERROR_QUEUE_SET` status bit is persisted.

use afd_core::{HostId, MsgName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub msg_name: MsgName,
    pub host_id: HostId,
    pub next_retry: u64,
}

/// Retriable-entry set, one entry per delayed message.
#[derive(Debug, Default)]
pub struct ErrorQueue {
    entries: Vec<ErrorEntry>,
}

impl ErrorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh the entry for a message.
    pub fn add(&mut self, msg_name: MsgName, host_id: HostId, next_retry: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.msg_name == msg_name) {
            entry.host_id = host_id;
            entry.next_retry = next_retry;
        } else {
            self.entries.push(ErrorEntry {
                msg_name,
                host_id,
                next_retry,
            });
        }
    }

    pub fn remove(&mut self, msg_name: &MsgName) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.msg_name != msg_name);
        self.entries.len() != before
    }

    pub fn contains(&self, msg_name: &MsgName) -> bool {
        self.entries.iter().any(|e| &e.msg_name == msg_name)
    }

    /// Whether the host still has entries that will become runnable.
    pub fn has_retriable(&self, host_id: HostId, now: u64) -> bool {
        self.entries
            .iter()
            .any(|e| e.host_id == host_id && e.next_retry >= now)
    }

    /// Whether the host has any entries at all.
    pub fn has_entries(&self, host_id: HostId) -> bool {
        self.entries.iter().any(|e| e.host_id == host_id)
    }

    /// Earliest retry expiry across all entries.
    pub fn next_expiry(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.next_retry).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "error_queue_tests.rs"]
mod tests;
